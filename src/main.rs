//! xmeta-console CLI entry point.
//!
//! Parses command-line arguments and dispatches to the appropriate command handler.

use clap::Parser;
use xmeta::cli::{Cli, Commands};
use xmeta::commands::{
    config_command, exec_command, monitor_command, resolve_run, resolve_runs, runs_command,
    trace_command, tree_command, watch_command,
};
use xmeta::completion::print_completion_script;
use xmeta::config::{load_config, Config};
use xmeta::dispatch::ProcessRunner;
use xmeta::logging::{self, LogOptions};
use xmeta::output::print_error;
use xmeta::Result;

fn main() {
    let cli = Cli::parse();

    // Completions work without a config file or a run directory.
    if let Some(Commands::Completions { shell }) = &cli.command {
        print_completion_script(*shell);
        return;
    }

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            print_error(&e.to_string());
            std::process::exit(1);
        }
    };

    let guard = logging::init(LogOptions {
        default_level: &config.log_level,
        verbose: cli.verbose,
        tui_mode: Commands::is_interactive(cli.command.as_ref()),
    });

    let result = run(cli, config);

    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }
    drop(guard);

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: Config) -> Result<()> {
    let run_arg = cli.run.as_deref();

    match cli.command {
        None | Some(Commands::Monitor) => monitor_command(config, resolve_runs(run_arg)?),
        Some(Commands::Tree { json }) => tree_command(&resolve_run(run_arg)?, json),
        Some(Commands::Trace {
            target, up, json, ..
        }) => trace_command(
            &resolve_run(run_arg)?,
            &target,
            Commands::trace_direction(up),
            json,
        ),
        Some(Commands::Runs { json }) => runs_command(&resolve_runs(run_arg)?, json),
        Some(Commands::Watch) => watch_command(resolve_run(run_arg)?),
        Some(Commands::Exec { action, targets }) => {
            exec_command(&ProcessRunner, resolve_run(run_arg)?, action, &targets)
        }
        Some(Commands::Config) => config_command(&config),
        // Handled before logging is set up
        Some(Commands::Completions { .. }) => Ok(()),
    }
}

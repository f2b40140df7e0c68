//! Command-line definition, shared by the binary and completion generation.

use crate::completion::ShellType;
use crate::dispatch::Action;
use crate::trace::TraceDirection;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "xmeta-console")]
#[command(
    version,
    about = "Terminal dashboard for monitoring and driving XMeta flow targets",
    after_help = "EXAMPLES:
    # Open the dashboard for the run in the current directory
    xmeta-console

    # Print the target tree of another run as JSON
    xmeta-console --run ../run2 tree --json

    # What does `route` depend on?
    xmeta-console trace route --up

    # Skip two targets without opening the dashboard
    xmeta-console exec skip syn place"
)]
pub struct Cli {
    /// Run directory to bind to (defaults to the current directory)
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub run: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Open the terminal dashboard (default)
    Monitor,

    /// Print the target tree of the run once
    Tree {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the upstream or downstream trace of a target
    Trace {
        /// Target to trace
        target: String,

        /// Trace what the target depends on
        #[arg(long, conflicts_with = "down", required_unless_present = "down")]
        up: bool,

        /// Trace what depends on the target
        #[arg(long)]
        down: bool,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List discovered run directories with their latest status mark
    Runs {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print status transitions as they happen until Ctrl+C
    Watch,

    /// Run one flow action on targets
    #[command(after_help = "ACTIONS:
    run, run-all, stop, skip, unskip, invalid")]
    Exec {
        /// Action to run
        action: Action,

        /// Targets to act on (ignored by run-all)
        targets: Vec<String>,
    },

    /// Show the effective configuration
    Config,

    /// Output shell completion script to stdout
    #[command(hide = true)]
    Completions {
        /// Shell type to generate completions for (bash, zsh, or fish)
        shell: ShellType,
    },
}

impl Commands {
    /// Whether the command takes over the terminal.
    pub fn is_interactive(command: Option<&Commands>) -> bool {
        matches!(command, None | Some(Commands::Monitor))
    }

    /// Direction of a `trace` command.
    pub fn trace_direction(up: bool) -> TraceDirection {
        if up {
            TraceDirection::Up
        } else {
            TraceDirection::Down
        }
    }
}

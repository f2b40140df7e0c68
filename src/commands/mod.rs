//! CLI command handlers.
//!
//! - [`monitor`] - terminal dashboard
//! - [`tree`] - print the target tree once
//! - [`trace`] - print a dependency trace
//! - [`runs`] - latest mark of every discovered run
//! - [`watch`] - print status transitions until Ctrl+C
//! - [`exec`] - run one flow action
//! - [`config`] - show the effective configuration

mod config;
mod exec;
mod monitor;
mod runs;
mod trace;
mod tree;
mod watch;

pub use config::config_command;
pub use exec::exec_command;
pub use monitor::monitor_command;
pub use runs::runs_command;
pub use trace::trace_command;
pub use tree::tree_command;
pub use watch::watch_command;

use crate::error::Result;
use crate::run_dir::{self, RunDirectory};
use std::path::Path;

/// Run directories selectable from `--run DIR` or the working directory.
/// The bound run always comes first.
pub fn resolve_runs(run: Option<&Path>) -> Result<Vec<RunDirectory>> {
    match run {
        Some(path) => {
            let run = RunDirectory::open(path)?;
            run_dir::discover_runs(run.root())
        }
        None => run_dir::discover_from_current_dir(),
    }
}

/// The single run a non-interactive command binds to.
pub fn resolve_run(run: Option<&Path>) -> Result<RunDirectory> {
    match run {
        Some(path) => RunDirectory::open(path),
        None => Ok(RunDirectory::new(std::env::current_dir()?)),
    }
}

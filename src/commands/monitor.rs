//! Monitor command handler.

use crate::config::Config;
use crate::error::Result;
use crate::monitor::run_monitor;
use crate::run_dir::RunDirectory;

/// Launch the dashboard on the first of `runs`.
pub fn monitor_command(config: Config, runs: Vec<RunDirectory>) -> Result<()> {
    tracing::info!(runs = runs.len(), "starting dashboard");
    run_monitor(config, runs)
}

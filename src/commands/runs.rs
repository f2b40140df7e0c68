//! Runs command handler.

use crate::error::Result;
use crate::output::print_run_summaries;
use crate::run_dir::{RunDirectory, RunSummary};

/// Print the latest status mark of every run.
pub fn runs_command(runs: &[RunDirectory], json: bool) -> Result<()> {
    let summaries: Vec<RunSummary> = runs.iter().map(RunDirectory::latest_mark).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print_run_summaries(&summaries);
    }
    Ok(())
}

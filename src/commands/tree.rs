//! Tree command handler.

use crate::config::console_title;
use crate::error::Result;
use crate::forest;
use crate::output::{print_forest, print_header};
use crate::run_dir::RunDirectory;

/// Build the forest of `run` once and print it.
pub fn tree_command(run: &RunDirectory, json: bool) -> Result<()> {
    let forest = forest::build(run);

    if json {
        println!("{}", serde_json::to_string_pretty(&forest)?);
        return Ok(());
    }

    print_header(&console_title());
    println!("{}", run.root().display());
    print_forest(&forest);
    Ok(())
}

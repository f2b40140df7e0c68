//! Trace command handler.

use crate::error::Result;
use crate::output::{print_forest, GRAY, RESET};
use crate::run_dir::RunDirectory;
use crate::trace::{self, TraceDirection};

pub fn trace_command(
    run: &RunDirectory,
    target: &str,
    direction: TraceDirection,
    json: bool,
) -> Result<()> {
    let deps = run.dependencies()?;

    let Some(forest) = trace::trace(&deps, run, target, direction) else {
        println!("{GRAY}No {} trace for {}{RESET}", direction.label(), target);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&forest)?);
    } else {
        println!("{} {}", direction.arrow(), target);
        print_forest(&forest);
    }
    Ok(())
}

//! Watch command handler.
//!
//! Prints the tree once, then every status transition until Ctrl+C.

use crate::error::Result;
use crate::output::{print_forest, print_updates, GRAY, RESET};
use crate::reconcile::POLL_INTERVAL;
use crate::run_dir::RunDirectory;
use crate::signal::Interrupt;
use crate::tree_view::TreeView;
use std::time::{Duration, Instant};

/// How often the shutdown flag is checked between ticks.
const SHUTDOWN_CHECK: Duration = Duration::from_millis(100);

pub fn watch_command(run: RunDirectory) -> Result<()> {
    let interrupt = Interrupt::install()?;
    let mut view = TreeView::active(run, None);

    print_forest(view.forest());
    println!("{GRAY}Watching {} (Ctrl+C to stop){RESET}", view.run().root().display());

    let mut last_tick = Instant::now();
    while !interrupt.requested() {
        std::thread::sleep(SHUTDOWN_CHECK);
        if last_tick.elapsed() < POLL_INTERVAL {
            continue;
        }
        last_tick = Instant::now();
        print_updates(&view.tick());
    }

    tracing::info!("watch stopped");
    Ok(())
}

//! Poll-tick reconciliation of a rendered forest against the status directory.
//!
//! Only rows whose status actually changed are touched. Row membership never
//! changes here; adding or removing targets is a rebuild.

use crate::forest::{Forest, Target};
use crate::run_dir::RunDirectory;
use crate::status::TargetStatus;
use std::time::Duration;

/// Period between reconciliation ticks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// One in-place row change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    pub target: String,
    pub from: TargetStatus,
    pub to: TargetStatus,
    /// Whether the start/end columns were re-read.
    pub timestamps_refreshed: bool,
}

/// Re-probe every target of the forest against its bound run directory.
pub fn tick(forest: &mut Forest, run: &RunDirectory) -> Vec<RowUpdate> {
    forest
        .targets_mut()
        .filter_map(|target| reconcile_target(target, run))
        .collect()
}

/// Re-probe only the named targets. Names not in the forest are ignored.
pub fn refresh_targets(forest: &mut Forest, run: &RunDirectory, names: &[String]) -> Vec<RowUpdate> {
    let mut updates = Vec::new();
    for name in names {
        if let Some(target) = forest.target_mut(name) {
            updates.extend(reconcile_target(target, run));
        }
    }
    updates
}

fn reconcile_target(target: &mut Target, run: &RunDirectory) -> Option<RowUpdate> {
    let mut probed = run.probe_status(&target.name);

    // A sentinel being rewritten can vanish for a moment; keep what is shown
    // while the record is still there.
    if probed.is_none() && !target.status.is_none() && run.has_residual_record(&target.name) {
        probed = target.status;
    }

    if probed == target.status {
        return None;
    }

    let from = target.status;
    target.status = probed;

    let timestamps_refreshed = !probed.is_none();
    if timestamps_refreshed {
        let ts = run.probe_timestamps(&target.name);
        target.start_time = ts.start;
        target.end_time = ts.end;
    }

    tracing::debug!(
        run = %run.name(),
        target_name = %target.name,
        from = %from,
        to = %probed,
        "status changed"
    );

    Some(RowUpdate {
        target: target.name.clone(),
        from,
        to: probed,
        timestamps_refreshed,
    })
}

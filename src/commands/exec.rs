//! Exec command handler.

use crate::dispatch::{self, Action, CommandRunner};
use crate::error::{Result, XMetaError};
use crate::output::{print_dispatch, print_warning};
use crate::run_dir::RunDirectory;
use crate::tree_view::TreeView;

/// Run `action` on `targets` in `run` and print what changed.
pub fn exec_command(
    runner: &dyn CommandRunner,
    run: RunDirectory,
    action: Action,
    targets: &[String],
) -> Result<()> {
    if action.takes_targets() && targets.is_empty() {
        return Err(XMetaError::Usage(format!(
            "{} needs at least one target",
            action
        )));
    }

    let mut view = TreeView::active(run, None);
    for target in targets {
        if view.forest().target(target).is_none() {
            print_warning(&format!("{} is not an active target", target));
        }
    }

    if let Some(report) = dispatch::dispatch(runner, action, targets, &mut view) {
        print_dispatch(&report);
    }
    Ok(())
}

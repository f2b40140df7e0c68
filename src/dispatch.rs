//! Flow-control actions.
//!
//! Each action maps to one XMeta command run inside the view's run
//! directory with the target names appended. The command's exit code is
//! logged but never acted on: the sentinel files are the source of truth,
//! so the affected rows are re-probed as soon as the command returns.

use crate::error::{Result, XMetaError};
use crate::reconcile::RowUpdate;
use crate::tree_view::TreeView;
use std::fmt;
use std::path::Path;
use std::process::Command;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Run,
    RunAll,
    Stop,
    Skip,
    Unskip,
    Invalid,
}

impl Action {
    pub fn all() -> &'static [Action] {
        &[
            Action::Run,
            Action::RunAll,
            Action::Stop,
            Action::Skip,
            Action::Unskip,
            Action::Invalid,
        ]
    }

    /// Executable and fixed arguments.
    pub fn command(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            Action::Run => ("XMeta_run", &[]),
            Action::RunAll => ("XMeta_run", &["all"]),
            Action::Stop => ("XMeta_stop", &[]),
            Action::Skip => ("XMeta_skip", &[]),
            Action::Unskip => ("XMeta_unskip", &[]),
            Action::Invalid => ("XMeta_invalid", &[]),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Run => "run",
            Action::RunAll => "run-all",
            Action::Stop => "stop",
            Action::Skip => "skip",
            Action::Unskip => "unskip",
            Action::Invalid => "invalid",
        }
    }

    /// Whether the selected targets are appended to the command.
    pub fn takes_targets(&self) -> bool {
        !matches!(self, Action::RunAll)
    }

    /// Whether the action can change which targets the descriptor lists.
    pub fn changes_membership(&self) -> bool {
        matches!(self, Action::Skip | Action::Unskip)
    }

    /// Full argument list for the given targets.
    pub fn args(&self, targets: &[String]) -> Vec<String> {
        let (_, fixed) = self.command();
        let mut args: Vec<String> = fixed.iter().map(|s| s.to_string()).collect();
        if self.takes_targets() {
            args.extend(targets.iter().cloned());
        }
        args
    }

    /// Command line as shown to the user.
    pub fn command_line(&self, targets: &[String]) -> String {
        let (program, _) = self.command();
        std::iter::once(program.to_string())
            .chain(self.args(targets))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Action::all()
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Action::all().iter().map(|a| a.name()).collect();
                format!("unknown action '{}', expected one of: {}", s, valid.join(", "))
            })
    }
}

/// How an external command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs an external command to completion.
pub trait CommandRunner {
    fn run(&self, cwd: &Path, program: &str, args: &[String]) -> Result<CommandOutcome>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, cwd: &Path, program: &str, args: &[String]) -> Result<CommandOutcome> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| XMetaError::ExternalProcess(format!("{}: {}", program, e)))?;

        Ok(CommandOutcome {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// What a dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub action: Action,
    pub command_line: String,
    /// `None` when the command could not be started.
    pub outcome: Option<CommandOutcome>,
    pub updates: Vec<RowUpdate>,
    pub rebuilt: bool,
}

impl DispatchReport {
    /// One-line summary for status bars.
    pub fn summary(&self) -> String {
        let result = match &self.outcome {
            Some(o) if o.success() => "done".to_string(),
            Some(o) => match o.exit_code {
                Some(code) => format!("exited with {}", code),
                None => "terminated by signal".to_string(),
            },
            None => "could not be started".to_string(),
        };
        format!("{}: {} ({} updated)", self.command_line, result, self.updates.len())
    }
}

/// Run `action` for `targets` in the view's run directory, then bring the
/// affected rows up to date.
///
/// Returns `None` when the action needs targets and none were given.
pub fn dispatch<R: CommandRunner + ?Sized>(
    runner: &R,
    action: Action,
    targets: &[String],
    view: &mut TreeView,
) -> Option<DispatchReport> {
    if action.takes_targets() && targets.is_empty() {
        return None;
    }

    let (program, _) = action.command();
    let args = action.args(targets);
    let command_line = action.command_line(targets);
    tracing::info!(run = %view.run().root().display(), command = %command_line, "dispatching");

    let outcome = match runner.run(view.run().root(), program, &args) {
        Ok(outcome) => {
            if !outcome.success() {
                tracing::warn!(
                    command = %command_line,
                    exit_code = ?outcome.exit_code,
                    stderr = %outcome.stderr,
                    "flow command reported failure"
                );
            }
            Some(outcome)
        }
        Err(e) => {
            tracing::error!(command = %command_line, error = %e, "flow command failed to start");
            None
        }
    };

    let updates = if action.takes_targets() {
        view.refresh_targets(targets)
    } else {
        view.tick()
    };

    let rebuilt = action.changes_membership();
    if rebuilt {
        view.rebuild();
    }

    Some(DispatchReport {
        action,
        command_line,
        outcome,
        updates,
        rebuilt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::TargetStatus;
    use crate::test_utils::{RunFixture, THREE_TARGETS};
    use std::cell::RefCell;
    use std::path::PathBuf;

    /// Records invocations and optionally touches a sentinel like the flow tool would.
    struct FakeRunner {
        calls: RefCell<Vec<(PathBuf, String, Vec<String>)>>,
        effect: Box<dyn Fn(&Path, &[String])>,
        exit_code: Option<i32>,
    }

    impl FakeRunner {
        fn new(effect: impl Fn(&Path, &[String]) + 'static) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                effect: Box::new(effect),
                exit_code: Some(0),
            }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, cwd: &Path, program: &str, args: &[String]) -> Result<CommandOutcome> {
            self.calls
                .borrow_mut()
                .push((cwd.to_path_buf(), program.to_string(), args.to_vec()));
            (self.effect)(cwd, args);
            Ok(CommandOutcome {
                exit_code: self.exit_code,
                stderr: String::new(),
            })
        }
    }

    struct MissingRunner;

    impl CommandRunner for MissingRunner {
        fn run(&self, _cwd: &Path, program: &str, _args: &[String]) -> Result<CommandOutcome> {
            Err(XMetaError::ExternalProcess(format!("{}: not found", program)))
        }
    }

    #[test]
    fn test_command_lines() {
        let targets = vec!["t1".to_string(), "t2".to_string()];
        assert_eq!(Action::Run.command_line(&targets), "XMeta_run t1 t2");
        assert_eq!(Action::RunAll.command_line(&targets), "XMeta_run all");
        assert_eq!(Action::Stop.command_line(&targets), "XMeta_stop t1 t2");
        assert_eq!(Action::Skip.command_line(&targets), "XMeta_skip t1 t2");
        assert_eq!(Action::Unskip.command_line(&targets), "XMeta_unskip t1 t2");
        assert_eq!(Action::Invalid.command_line(&targets), "XMeta_invalid t1 t2");
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("run-all".parse::<Action>(), Ok(Action::RunAll));
        assert_eq!("skip".parse::<Action>(), Ok(Action::Skip));
        assert!("explode".parse::<Action>().is_err());
    }

    #[test]
    fn test_skip_updates_row_without_waiting_for_tick() {
        let fx = RunFixture::new(THREE_TARGETS);
        let mut view = TreeView::active(fx.run(), None);
        let runner = FakeRunner::new(|cwd, args| {
            for t in args {
                std::fs::File::create(cwd.join("status").join(format!("{}.skip", t))).unwrap();
            }
        });

        let report = dispatch(&runner, Action::Skip, &["t2".to_string()], &mut view).unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, fx.path());
        assert_eq!(calls[0].1, "XMeta_skip");
        assert_eq!(calls[0].2, vec!["t2"]);

        assert_eq!(report.updates.len(), 1);
        assert_eq!(report.updates[0].to, TargetStatus::Skip);
        assert!(report.rebuilt);
        let t2 = view.forest().target("t2").unwrap();
        assert_eq!(t2.status, TargetStatus::Skip);
        assert_eq!(t2.status.color_hex(), Some("#e6a23c"));
    }

    #[test]
    fn test_only_dispatched_targets_are_refreshed() {
        let fx = RunFixture::new(THREE_TARGETS);
        let mut view = TreeView::active(fx.run(), None);
        fx.mark("t3", "failed");
        let runner = FakeRunner::new(|cwd, _| {
            std::fs::File::create(cwd.join("status").join("t1.running")).unwrap();
        });

        let report = dispatch(&runner, Action::Run, &["t1".to_string()], &mut view).unwrap();

        assert!(!report.rebuilt);
        assert_eq!(report.updates.len(), 1);
        assert_eq!(view.forest().target("t1").unwrap().status, TargetStatus::Running);
        // t3 waits for the next tick.
        assert_eq!(view.forest().target("t3").unwrap().status, TargetStatus::None);
    }

    #[test]
    fn test_failed_command_still_reprobes() {
        let fx = RunFixture::new(THREE_TARGETS);
        let mut view = TreeView::active(fx.run(), None);
        let mut runner = FakeRunner::new(|cwd, _| {
            std::fs::File::create(cwd.join("status").join("t1.failed")).unwrap();
        });
        runner.exit_code = Some(2);

        let report = dispatch(&runner, Action::Run, &["t1".to_string()], &mut view).unwrap();
        assert_eq!(report.outcome.as_ref().unwrap().exit_code, Some(2));
        assert!(report.summary().contains("exited with 2"));
        assert_eq!(view.forest().target("t1").unwrap().status, TargetStatus::Failed);
    }

    #[test]
    fn test_missing_command_still_reprobes() {
        let fx = RunFixture::new(THREE_TARGETS);
        let mut view = TreeView::active(fx.run(), None);
        fx.mark("t1", "pending");

        let report = dispatch(&MissingRunner, Action::Stop, &["t1".to_string()], &mut view).unwrap();
        assert!(report.outcome.is_none());
        assert_eq!(report.updates.len(), 1);
        assert!(report.summary().contains("could not be started"));
    }

    #[test]
    fn test_run_all_ignores_selection() {
        let fx = RunFixture::new(THREE_TARGETS);
        let mut view = TreeView::active(fx.run(), None);
        let runner = FakeRunner::new(|_, _| {});

        dispatch(&runner, Action::RunAll, &[], &mut view).unwrap();
        dispatch(&runner, Action::RunAll, &["t1".to_string()], &mut view).unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls[0].2, vec!["all"]);
        assert_eq!(calls[1].2, vec!["all"]);
    }

    #[test]
    fn test_no_targets_is_a_no_op() {
        let fx = RunFixture::new(THREE_TARGETS);
        let mut view = TreeView::active(fx.run(), None);
        let runner = FakeRunner::new(|_, _| {});
        assert!(dispatch(&runner, Action::Stop, &[], &mut view).is_none());
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_unskip_rebuild_picks_up_new_membership() {
        let fx = RunFixture::new("set ACTIVE_TARGETS = \"t1\"\nset TARGET_LEVEL_t1 = \"1\"\n");
        let mut view = TreeView::active(fx.run(), None);
        let root = fx.path().to_path_buf();
        let runner = FakeRunner::new(move |_, _| {
            std::fs::write(
                root.join(crate::run_dir::DEPENDENCY_FILE),
                "set ACTIVE_TARGETS = \"t1 t2\"\nset TARGET_LEVEL_t1 = \"1\"\nset TARGET_LEVEL_t2 = \"1\"\n",
            )
            .unwrap();
        });

        let report = dispatch(&runner, Action::Unskip, &["t2".to_string()], &mut view).unwrap();
        assert!(report.rebuilt);
        assert!(report.updates.is_empty());
        assert_eq!(view.forest().target_count(), 2);
    }
}

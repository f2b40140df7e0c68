//! Run directories and their on-disk layout.
//!
//! A run directory is any directory holding a `.target_dependency.csh`.
//! Everything this crate reads lives at fixed paths under it:
//!
//! ```text
//! R/.target_dependency.csh
//! R/status/{target}.{status}
//! R/logs/targettracker/{target}.start | .finished
//! R/make_targets/{target}.csh
//! R/cmds/{target}.cmd
//! R/logs/{target}.log[.gz]
//! ```

use crate::dependency::DependencyFile;
use crate::error::{Result, XMetaError};
use crate::status::{self, TargetStatus, Timestamps};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// File name of the dependency descriptor.
pub const DEPENDENCY_FILE: &str = ".target_dependency.csh";

const STATUS_DIR: &str = "status";
const TRACKER_DIR: &str = "logs/targettracker";
const SHELL_DIR: &str = "make_targets";
const CMD_DIR: &str = "cmds";
const LOG_DIR: &str = "logs";

/// A single flow run, identified by its absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunDirectory {
    root: PathBuf,
}

/// Result of probing one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetProbe {
    pub status: TargetStatus,
    pub timestamps: Timestamps,
}

/// Artifact files a user can open for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Shell,
    Command,
    Log,
}

impl Artifact {
    pub fn name(&self) -> &'static str {
        match self {
            Artifact::Shell => "shell script",
            Artifact::Command => "command file",
            Artifact::Log => "log",
        }
    }
}

impl RunDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open an existing directory, making its path absolute.
    ///
    /// # Errors
    ///
    /// Returns [`XMetaError::RunNotFound`] if the path is not a directory.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(XMetaError::RunNotFound(path.to_path_buf()));
        }
        let root = fs::canonicalize(path)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name used for tab titles and listings.
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    pub fn dependency_file(&self) -> PathBuf {
        self.root.join(DEPENDENCY_FILE)
    }

    pub fn has_dependency_file(&self) -> bool {
        self.dependency_file().is_file()
    }

    /// Load the run's dependency descriptor.
    pub fn dependencies(&self) -> Result<DependencyFile> {
        DependencyFile::load(&self.dependency_file())
    }

    pub fn status_dir(&self) -> PathBuf {
        self.root.join(STATUS_DIR)
    }

    /// Sentinel base path: `R/status/{target}`.
    pub fn status_file(&self, target: &str) -> PathBuf {
        self.status_dir().join(target)
    }

    /// Tracker base path: `R/logs/targettracker/{target}`.
    pub fn track_file(&self, target: &str) -> PathBuf {
        self.root.join(TRACKER_DIR).join(target)
    }

    pub fn probe_status(&self, target: &str) -> TargetStatus {
        status::probe_status(&self.status_file(target))
    }

    pub fn probe_timestamps(&self, target: &str) -> Timestamps {
        status::probe_timestamps(&self.track_file(target))
    }

    pub fn probe(&self, target: &str) -> TargetProbe {
        TargetProbe {
            status: self.probe_status(target),
            timestamps: self.probe_timestamps(target),
        }
    }

    /// Whether the target still has some status record on disk even though
    /// no sentinel matched.
    pub fn has_residual_record(&self, target: &str) -> bool {
        status::has_residual_record(&self.status_file(target))
    }

    /// Path of an artifact file for a target.
    ///
    /// Logs prefer `{target}.log` and fall back to `{target}.log.gz` when
    /// only the compressed log exists.
    pub fn artifact_path(&self, target: &str, artifact: Artifact) -> PathBuf {
        match artifact {
            Artifact::Shell => self.root.join(SHELL_DIR).join(format!("{}.csh", target)),
            Artifact::Command => self.root.join(CMD_DIR).join(format!("{}.cmd", target)),
            Artifact::Log => {
                let log = self.root.join(LOG_DIR).join(format!("{}.log", target));
                let gz = self.root.join(LOG_DIR).join(format!("{}.log.gz", target));
                if !log.exists() && gz.exists() {
                    gz
                } else {
                    log
                }
            }
        }
    }

    /// The most recently touched mark file under `status/`.
    pub fn latest_mark(&self) -> RunSummary {
        let name = self.name();
        let entries = match fs::read_dir(self.status_dir()) {
            Ok(entries) => entries,
            Err(_) => {
                return RunSummary {
                    run: name,
                    latest: None,
                    note: Some("No status dir".to_string()),
                }
            }
        };

        let mut latest: Option<(SystemTime, String, String)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some((target, status)) = parse_mark_file(&file_name) else {
                continue;
            };
            let mtime = match entry.metadata().and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "cannot stat mark file");
                    continue;
                }
            };
            if latest.as_ref().is_none_or(|(best, _, _)| mtime > *best) {
                latest = Some((mtime, target.to_string(), status.to_string()));
            }
        }

        match latest {
            Some((mtime, target, status)) => RunSummary {
                run: name,
                latest: Some(LatestMark {
                    target,
                    status,
                    timestamp: DateTime::<Local>::from(mtime)
                        .format(status::TIMESTAMP_FORMAT)
                        .to_string(),
                }),
                note: None,
            },
            None => RunSummary {
                run: name,
                latest: None,
                note: Some("No valid mark files".to_string()),
            },
        }
    }
}

/// Split a mark file name at its last dot into `(target, status)`.
pub fn parse_mark_file(file_name: &str) -> Option<(&str, &str)> {
    let (target, status) = file_name.rsplit_once('.')?;
    if target.is_empty() || status.is_empty() {
        return None;
    }
    Some((target, status))
}

/// Latest mark file of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestMark {
    pub target: String,
    /// Raw extension of the mark file. Usually a known status, but the
    /// directory may hold anything.
    pub status: String,
    pub timestamp: String,
}

impl LatestMark {
    pub fn target_status(&self) -> TargetStatus {
        self.status.parse().unwrap_or_default()
    }
}

/// One line of the all-runs overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run: String,
    pub latest: Option<LatestMark>,
    pub note: Option<String>,
}

/// Discover selectable run directories around `cwd`.
///
/// The current directory always comes first. It is followed by every
/// non-symlink sibling (a directory next to `cwd` in its parent) that holds
/// a dependency descriptor, in name order.
pub fn discover_runs(cwd: &Path) -> Result<Vec<RunDirectory>> {
    let mut runs = vec![RunDirectory::new(cwd)];
    let Some(parent) = cwd.parent() else {
        return Ok(runs);
    };

    let mut siblings: Vec<PathBuf> = fs::read_dir(parent)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.as_path() != cwd)
        .filter(|p| {
            fs::symlink_metadata(p)
                .map(|m| m.is_dir())
                .unwrap_or(false)
        })
        .filter(|p| p.join(DEPENDENCY_FILE).exists())
        .collect();
    siblings.sort();

    runs.extend(siblings.into_iter().map(RunDirectory::new));
    Ok(runs)
}

/// Discover runs around the process working directory.
pub fn discover_from_current_dir() -> Result<Vec<RunDirectory>> {
    let cwd = std::env::current_dir()?;
    discover_runs(&cwd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RunFixture;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let run = RunDirectory::new("/work/run1");
        assert_eq!(
            run.dependency_file(),
            PathBuf::from("/work/run1/.target_dependency.csh")
        );
        assert_eq!(run.status_file("syn"), PathBuf::from("/work/run1/status/syn"));
        assert_eq!(
            run.track_file("syn"),
            PathBuf::from("/work/run1/logs/targettracker/syn")
        );
        assert_eq!(
            run.artifact_path("syn", Artifact::Shell),
            PathBuf::from("/work/run1/make_targets/syn.csh")
        );
        assert_eq!(
            run.artifact_path("syn", Artifact::Command),
            PathBuf::from("/work/run1/cmds/syn.cmd")
        );
        assert_eq!(run.name(), "run1");
    }

    #[test]
    fn test_log_prefers_plain_then_gz() {
        let fx = RunFixture::new("set ACTIVE_TARGETS = \"a\"\n");
        let run = fx.run();
        let logs = run.root().join("logs");
        std::fs::create_dir_all(&logs).unwrap();

        assert_eq!(run.artifact_path("a", Artifact::Log), logs.join("a.log"));

        std::fs::write(logs.join("a.log.gz"), b"").unwrap();
        assert_eq!(run.artifact_path("a", Artifact::Log), logs.join("a.log.gz"));

        std::fs::write(logs.join("a.log"), b"").unwrap();
        assert_eq!(run.artifact_path("a", Artifact::Log), logs.join("a.log"));
    }

    #[test]
    fn test_probe_reads_status_and_times() {
        let fx = RunFixture::new("set ACTIVE_TARGETS = \"a\"\n");
        fx.mark("a", "finish");
        fx.track(
            "a",
            "start",
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200),
        );
        let probe = fx.run().probe("a");
        assert_eq!(probe.status, TargetStatus::Finish);
        assert_eq!(probe.timestamps.start, "2024-01-01 08:00:00");
        assert_eq!(probe.timestamps.end, "");
    }

    #[test]
    fn test_open_rejects_missing_dir() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            RunDirectory::open(&missing),
            Err(XMetaError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_discover_puts_cwd_first() {
        let dir = TempDir::new().unwrap();
        for name in ["a_run", "z_cwd", "m_run", "no_dep"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        for name in ["a_run", "z_cwd", "m_run"] {
            std::fs::write(dir.path().join(name).join(DEPENDENCY_FILE), "").unwrap();
        }
        std::fs::write(dir.path().join("plain_file"), "").unwrap();

        let cwd = dir.path().join("z_cwd");
        let names: Vec<String> = discover_runs(&cwd)
            .unwrap()
            .iter()
            .map(|r| r.name())
            .collect();
        assert_eq!(names, vec!["z_cwd", "a_run", "m_run"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_skips_symlinks() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("cwd")).unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::fs::write(dir.path().join("real").join(DEPENDENCY_FILE), "").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let names: Vec<String> = discover_runs(&dir.path().join("cwd"))
            .unwrap()
            .iter()
            .map(|r| r.name())
            .collect();
        assert_eq!(names, vec!["cwd", "real"]);
    }

    #[test]
    fn test_parse_mark_file() {
        assert_eq!(parse_mark_file("syn.finish"), Some(("syn", "finish")));
        assert_eq!(parse_mark_file("a.b.running"), Some(("a.b", "running")));
        assert_eq!(parse_mark_file("noext"), None);
        assert_eq!(parse_mark_file(".hidden"), None);
    }

    #[test]
    fn test_latest_mark_picks_newest() {
        let fx = RunFixture::new("");
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        fx.mark_at("syn", "finish", base);
        fx.mark_at("place", "running", base + Duration::from_secs(60));
        fx.mark_at("route", "pending", base + Duration::from_secs(30));

        let summary = fx.run().latest_mark();
        let latest = summary.latest.unwrap();
        assert_eq!(latest.target, "place");
        assert_eq!(latest.status, "running");
        assert_eq!(latest.target_status(), TargetStatus::Running);
        assert!(summary.note.is_none());
    }

    #[test]
    fn test_latest_mark_notes() {
        let dir = TempDir::new().unwrap();
        let run = RunDirectory::new(dir.path());
        assert_eq!(run.latest_mark().note.as_deref(), Some("No status dir"));

        std::fs::create_dir(dir.path().join("status")).unwrap();
        std::fs::write(dir.path().join("status").join("README"), "").unwrap();
        assert_eq!(
            run.latest_mark().note.as_deref(),
            Some("No valid mark files")
        );
    }
}

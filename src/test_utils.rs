//! Test utilities shared across modules.
//!
//! [`RunFixture`] builds a throwaway run directory in a temp dir with a
//! dependency descriptor and helpers for touching sentinel files the way
//! the flow tool does.

use crate::run_dir::{RunDirectory, DEPENDENCY_FILE};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

/// Descriptor used by most tree tests: two targets at level 1, one at level 2.
pub const THREE_TARGETS: &str = r#"set ACTIVE_TARGETS = "t1 t2 t3"
set TARGET_LEVEL_t1 = "1"
set TARGET_LEVEL_t2 = "1"
set TARGET_LEVEL_t3 = "2"
"#;

pub struct RunFixture {
    _dir: TempDir,
    root: PathBuf,
}

impl RunFixture {
    /// Create a run directory named `run` holding the given descriptor.
    pub fn new(descriptor: &str) -> Self {
        Self::named("run", descriptor)
    }

    pub fn named(name: &str, descriptor: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join(name);
        fs::create_dir_all(root.join("status")).unwrap();
        fs::create_dir_all(root.join("logs").join("targettracker")).unwrap();
        fs::write(root.join(DEPENDENCY_FILE), descriptor).unwrap();
        Self { _dir: dir, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn run(&self) -> RunDirectory {
        RunDirectory::new(&self.root)
    }

    /// Replace the dependency descriptor.
    pub fn write_descriptor(&self, descriptor: &str) {
        fs::write(self.root.join(DEPENDENCY_FILE), descriptor).unwrap();
    }

    /// Touch `status/{target}.{status}`.
    pub fn mark(&self, target: &str, status: &str) {
        File::create(self.mark_path(target, status)).unwrap();
    }

    /// Touch `status/{target}.{status}` with a fixed mtime.
    pub fn mark_at(&self, target: &str, status: &str, mtime: SystemTime) {
        let file = File::create(self.mark_path(target, status)).unwrap();
        file.set_modified(mtime).unwrap();
    }

    /// Remove `status/{target}.{status}` if present.
    pub fn unmark(&self, target: &str, status: &str) {
        let _ = fs::remove_file(self.mark_path(target, status));
    }

    /// Touch `logs/targettracker/{target}.{event}` with a fixed mtime.
    pub fn track(&self, target: &str, event: &str, mtime: SystemTime) {
        let path = self
            .root
            .join("logs")
            .join("targettracker")
            .join(format!("{}.{}", target, event));
        let file = File::create(path).unwrap();
        file.set_modified(mtime).unwrap();
    }

    fn mark_path(&self, target: &str, status: &str) -> PathBuf {
        self.root.join("status").join(format!("{}.{}", target, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let fx = RunFixture::new(THREE_TARGETS);
        assert!(fx.run().has_dependency_file());
        assert!(fx.path().join("status").is_dir());

        fx.mark("t1", "finish");
        assert!(fx.path().join("status/t1.finish").exists());
        fx.unmark("t1", "finish");
        assert!(!fx.path().join("status/t1.finish").exists());
    }
}

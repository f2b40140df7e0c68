//! Detached helpers: the editor for artifact files, the XMeta terminal and
//! the terminal clipboard.

use crate::error::{Result, XMetaError};
use crate::run_dir::{Artifact, RunDirectory};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use crossterm::{execute, style::Print};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;

/// Open a target's artifact in `editor`.
///
/// # Errors
///
/// Returns [`XMetaError::ExternalProcess`] if the artifact does not exist
/// or the editor cannot be started.
pub fn open_artifact(
    editor: &str,
    run: &RunDirectory,
    target: &str,
    artifact: Artifact,
) -> Result<PathBuf> {
    let path = run.artifact_path(target, artifact);
    if !path.exists() {
        return Err(XMetaError::ExternalProcess(format!(
            "{} not found: {}",
            artifact.name(),
            path.display()
        )));
    }
    spawn_detached(editor, &[path.as_os_str()], run.root())?;
    Ok(path)
}

/// Start the flow's terminal helper inside the run directory.
pub fn open_terminal(command: &str, run: &RunDirectory) -> Result<()> {
    spawn_detached(command, &[], run.root())?;
    Ok(())
}

/// Start a helper without waiting for it. A background thread reaps the
/// child so it never lingers as a zombie; the join handle yields its exit code.
fn spawn_detached(
    program: &str,
    args: &[&std::ffi::OsStr],
    cwd: &Path,
) -> Result<JoinHandle<Option<i32>>> {
    let mut parts = program.split_whitespace();
    let exe = parts
        .next()
        .ok_or_else(|| XMetaError::Config("empty command".to_string()))?;

    let mut child = Command::new(exe)
        .args(parts)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| XMetaError::ExternalProcess(format!("{}: {}", exe, e)))?;

    tracing::debug!(program, cwd = %cwd.display(), pid = child.id(), "spawned helper");

    let exe = exe.to_string();
    let reaper = std::thread::spawn(move || match child.wait() {
        Ok(status) => {
            tracing::debug!(program = %exe, %status, "helper exited");
            status.code()
        }
        Err(e) => {
            tracing::debug!(program = %exe, error = %e, "failed to wait for helper");
            None
        }
    });
    Ok(reaper)
}

/// Put `text` on the clipboard through the terminal (OSC 52), which also
/// works over ssh.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    execute!(io::stdout(), Print(osc52_sequence(text)))?;
    Ok(())
}

fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x1b\\", STANDARD.encode(text.as_bytes()))
}

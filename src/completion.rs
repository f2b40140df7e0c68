//! Shell completion scripts generated from the clap definition.

use crate::cli::Cli;
use crate::error::{Result, XMetaError};
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::str::FromStr;

/// Names accepted by [`ShellType::from_name`].
pub const SUPPORTED_SHELLS: &[&str] = &["bash", "zsh", "fish"];

const BIN_NAME: &str = "xmeta-console";

/// Supported shell types for completion scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
}

impl ShellType {
    pub fn to_clap_shell(self) -> Shell {
        match self {
            ShellType::Bash => Shell::Bash,
            ShellType::Zsh => Shell::Zsh,
            ShellType::Fish => Shell::Fish,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShellType::Bash => "bash",
            ShellType::Zsh => "zsh",
            ShellType::Fish => "fish",
        }
    }

    /// Parse a shell name or path such as `/usr/bin/zsh`.
    pub fn from_name(name: &str) -> Result<Self> {
        let base = std::path::Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);
        match base {
            "bash" => Ok(ShellType::Bash),
            "zsh" => Ok(ShellType::Zsh),
            "fish" => Ok(ShellType::Fish),
            _ => Err(XMetaError::Usage(format!(
                "Unsupported shell: '{}'. Supported shells are: {}.",
                base,
                SUPPORTED_SHELLS.join(", ")
            ))),
        }
    }
}

impl std::fmt::Display for ShellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ShellType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ShellType::from_name(s).map_err(|e| e.to_string())
    }
}

pub fn generate_completion_script(shell: ShellType) -> String {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    generate(shell.to_clap_shell(), &mut cmd, BIN_NAME, &mut buf);
    String::from_utf8(buf).unwrap_or_default()
}

pub fn print_completion_script(shell: ShellType) {
    print!("{}", generate_completion_script(shell));
}

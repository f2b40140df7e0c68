//! Config command handler.

use crate::config::{config_path, Config};
use crate::error::{Result, XMetaError};
use crate::output::{BOLD, GRAY, RESET};

/// Display the effective configuration as TOML.
pub fn config_command(config: &Config) -> Result<()> {
    println!("{BOLD}# Effective config{RESET}");
    println!("{GRAY}# {}{RESET}", config_path()?.display());
    println!();

    let toml = toml::to_string_pretty(config)
        .map_err(|e| XMetaError::Config(format!("Failed to serialize config: {}", e)))?;
    print!("{}", toml);
    Ok(())
}

use crate::error::{Result, XMetaError};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// The base config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "xmeta-console";

const CONFIG_FILENAME: &str = "config.toml";

const LOGS_SUBDIR: &str = "logs";

/// User preferences for the console.
///
/// Missing keys fall back to their defaults, so a partial file works.
///
/// ```toml
/// editor = "gvim"
/// terminal_command = "XMeta_term"
/// log_level = "info"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Program used to open shell scripts, command files and logs.
    #[serde(default = "default_editor")]
    pub editor: String,

    /// Command started in the run directory by the terminal action.
    #[serde(default = "default_terminal_command")]
    pub terminal_command: String,

    /// Default log filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_editor() -> String {
    "gvim".to_string()
}

fn default_terminal_command() -> String {
    "XMeta_term".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: default_editor(),
            terminal_command: default_terminal_command(),
            log_level: default_log_level(),
        }
    }
}

const DEFAULT_CONFIG_WITH_COMMENTS: &str = r#"# XMeta Console Configuration

# Editor used to open a target's shell script, command file and log.
# The file path is appended as the last argument.
editor = "gvim"

# Terminal helper started inside the run directory.
terminal_command = "XMeta_term"

# Log level for ~/.config/xmeta-console/logs/ (error, warn, info, debug, trace).
# RUST_LOG overrides this when set.
log_level = "info"
"#;

/// Get the config directory path (~/.config/xmeta-console/).
///
/// Does not create the directory.
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| XMetaError::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

/// Path of the config file.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

/// Directory that holds the rolling log files.
pub fn log_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join(LOGS_SUBDIR))
}

/// Load `~/.config/xmeta-console/config.toml`, creating it with commented
/// defaults if it does not exist.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined, the file
/// cannot be read or written, or it holds invalid TOML.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_dir()?)
}

fn load_config_from(dir: &Path) -> Result<Config> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        fs::create_dir_all(dir)?;
        fs::write(&config_path, DEFAULT_CONFIG_WITH_COMMENTS)?;
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&config_path)?;
    toml::from_str(&content).map_err(|e| {
        XMetaError::Config(format!(
            "Failed to parse config file at {:?}: {}",
            config_path, e
        ))
    })
}

/// Window title built from the flow's environment.
///
/// Reads `XMETA_VERSION`, `FAMILY` and `XMETA_PROJECT_NAME`, each falling
/// back to a placeholder when unset.
pub fn console_title() -> String {
    format_title(
        env::var("XMETA_VERSION").ok().as_deref(),
        env::var("FAMILY").ok().as_deref(),
        env::var("XMETA_PROJECT_NAME").ok().as_deref(),
    )
}

fn format_title(version: Option<&str>, family: Option<&str>, project: Option<&str>) -> String {
    format!(
        "Console of XMeta/{}-{} @ {}",
        version.unwrap_or("Version"),
        family.unwrap_or("Family"),
        project.unwrap_or("XMetaProject")
    )
}

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XMetaError {
    #[error("Dependency descriptor not available: {0}")]
    SourceUnavailable(PathBuf),

    #[error("Malformed assignment for {0}")]
    MalformedAssignment(String),

    #[error("External command failed: {0}")]
    ExternalProcess(String),

    #[error("Run directory not found: {0}")]
    RunNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Usage(String),

    #[error("Signal handler error: {0}")]
    SignalHandler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, XMetaError>;

//! Workspace-wide error type.

use thiserror::Error;

/// Errors surfaced by pipelines, stores and the scheduler.
#[derive(Debug, Error)]
pub enum ZsemError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// A retention sweep found no snapshot to keep.
    #[error("Snapshot log '{0}' is empty")]
    EmptyLog(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ZsemError>;

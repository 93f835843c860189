use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MuxError {
    #[error("could not load config from {path}: {detail}")]
    ConfigLoad { path: PathBuf, detail: String },

    #[error("no session matches '{0}'")]
    SessionNotFound(String),

    #[error("session already exists: {0}")]
    DuplicateSession(String),

    #[error("{backend} does not support {operation}")]
    UnsupportedOperation {
        backend: &'static str,
        operation: &'static str,
    },

    #[error("`{command}` failed: {detail}")]
    ExternalTool { command: String, detail: String },

    #[error("snapshot file is not valid: {0}")]
    SnapshotFormat(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MuxError>;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Path is not tracked: {0}")]
    NotTracked(String),

    #[error("Invalid repository state: {0}")]
    InvalidState(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Could not acquire directory lock within timeout")]
    LockTimeout,

    #[error("Export failed: {0}")]
    ExportFailed(String),
}

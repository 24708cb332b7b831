/// This module defines the error types for uuidstore.
///
/// Every failure in the store is fatal for the run that hit it: a malformed
/// identifier, an undecodable input line, an I/O failure or a corrupt store
/// file all stop the pipeline and travel back to the caller as a
/// [`StoreError`]. Nothing is retried and nothing is skipped.
///
/// ```rust,ignore
/// match generate_from_path(&config) {
///     Ok(summary) => // Store is complete,
///     Err(StoreError::MalformedInputLine { line, .. }) => // Bad JSON at `line`,
///     Err(e) => // Any other fatal error
/// }
/// ```
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while generating or searching a store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),
    #[error("Malformed input on line {line}: {source}")]
    MalformedInputLine {
        line: usize,
        source: serde_json::Error,
    },
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Corrupt store {path}: length {len} is not a multiple of the record size")]
    CorruptStore { path: PathBuf, len: u64 },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Worker panicked: {0}")]
    WorkerPanicked(&'static str),
    #[error("IO error: {0}")]
    StoreIo(#[from] std::io::Error),
}

impl StoreError {
    pub fn malformed_identifier(text: impl Into<String>) -> Self {
        Self::MalformedIdentifier(text.into())
    }

    pub fn malformed_input_line(line: usize, source: serde_json::Error) -> Self {
        Self::MalformedInputLine { line, source }
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn corrupt_store(path: impl Into<PathBuf>, len: u64) -> Self {
        Self::CorruptStore {
            path: path.into(),
            len,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Maps an error from opening `path` onto the matching variant.
    pub fn from_open(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::StoreIo(err),
        }
    }
}

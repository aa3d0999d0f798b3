//! Centralized error types for mailflow.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailflow library.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The ticketing database could not be opened or queried.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The output base directory could not be created.
    #[error("Cannot create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A staging directory for atomic publishing could not be allocated.
    #[error("Cannot create staging directory under '{path}': {source}")]
    StagingDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization produced no bytes for a record.
    #[error("Serialization produced no output for message {id}")]
    EmptyMessage { id: i64 },

    /// An invalid date or date range was supplied.
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    /// A purge transaction failed and was rolled back.
    #[error("Purge failed and was rolled back: {0}")]
    PurgeFailed(String),
}

/// Convenience alias for `Result<T, ExportError>`.
pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `ExportError`
/// when no path context is available (rare — prefer `ExportError::io`).
impl From<std::io::Error> for ExportError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

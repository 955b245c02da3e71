//! Result and error types for the core library

use thiserror::Error;

use super::batch::BatchStatus;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    /// The CSV source could not be read or has no usable header
    #[error("Source unreadable: {0}")]
    SourceUnreadable(String),

    /// A row without an identifier. Parsers report these as row outcomes;
    /// the variant exists so callers can surface them uniformly.
    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// Per-record store access failure
    #[error("Store error: {0}")]
    StoreIo(String),

    #[error("Import batch already exists: {0}")]
    BatchIdCollision(String),

    #[error("Invalid batch transition for {batch_id}: {from} -> {to}")]
    InvalidTransition {
        batch_id: String,
        from: BatchStatus,
        to: BatchStatus,
    },

    #[error("Import aborted: {0}")]
    Aborted(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create a store access error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreIo(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a source unreadable error
    pub fn unreadable(msg: impl Into<String>) -> Self {
        Self::SourceUnreadable(msg.into())
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

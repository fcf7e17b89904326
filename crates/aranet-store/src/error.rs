//! Error types for aranet-store.

use std::path::PathBuf;

use time::OffsetDateTime;

/// Result type for aranet-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in aranet-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The database was written by a newer version.
    #[error("Database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i32, supported: i32 },

    /// A record with this timestamp is already stored.
    #[error("Duplicate record for timestamp {timestamp}")]
    DuplicateKey { timestamp: OffsetDateTime },

    /// Percentile requested against a store with no records.
    #[error("History is empty")]
    EmptyHistory,

    /// Invalid timestamp.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The configured date format could not be parsed.
    #[error("Invalid date format '{format}': {message}")]
    InvalidDateFormat { format: String, message: String },

    /// A CSV row could not be turned into a reading.
    #[error("Invalid CSV row {line}: {message}")]
    InvalidRow { line: u64, message: String },

    /// CSV reader/writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a rejected duplicate insert.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::DuplicateKey { .. })
    }
}

//! Error types for the migration monitor

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the migration monitor
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Upstream feed errors (tick-scoped: abort the tick, keep the loop)
    #[error("Feed error: {0}")]
    Fetch(String),

    #[error("Feed returned malformed payload: {0}")]
    MalformedResponse(String),

    // Normalization errors (record-scoped: skip the record, keep the batch)
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    // Persistence errors (record-scoped)
    #[error("Storage error: {0}")]
    Storage(String),

    // Notification errors (logged, never roll back persistence)
    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error only poisons a single record (skip it, continue
    /// the batch) as opposed to the whole tick.
    pub fn is_record_scoped(&self) -> bool {
        matches!(
            self,
            Error::MissingField(_)
                | Error::InvalidAddress(_)
                | Error::InvalidTimestamp(_)
                | Error::Storage(_)
                | Error::Delivery(_)
        )
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Fetch(e.to_string())
    }
}

// Conversion from rusqlite errors
impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedResponse(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Config(e.to_string())
    }
}

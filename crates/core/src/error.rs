//! Unified error types for the contributors service.
//!
//! Store errors are authoritative and reach the caller. Cache errors are
//! advisory: backends return them, the coordinator logs and swallows them.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the contributors service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No contributor matches the lookup.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// A unique constraint (username or email) was violated.
    #[error("DUPLICATE_KEY: {field} already in use")]
    DuplicateKey { field: String },

    /// The identifier is not a well-formed contributor id.
    #[error("INVALID_ID: {0}")]
    InvalidId(String),

    /// Invalid input parameters (e.g., blank username).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Cache read, write or delete failed.
    #[error("CACHE_UNAVAILABLE: {0}")]
    CacheUnavailable(String),

    /// Payload could not be encoded for the cache.
    #[error("CODEC_ERROR: {0}")]
    Codec(#[from] serde_json::Error),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Whether the error originates from the cache rather than the store.
    pub fn is_cache(&self) -> bool {
        matches!(self, Error::CacheUnavailable(_) | Error::Codec(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidId(id) => (-32602, format!("invalid contributor id: {id}")),
            Error::NotFound(msg) => (-32001, msg.clone()),
            Error::DuplicateKey { field } => (-32009, format!("{field} already in use")),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::CacheUnavailable(msg) => (-32000, msg.clone()),
            Error::Codec(e) => (-32000, e.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

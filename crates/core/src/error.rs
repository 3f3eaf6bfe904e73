//! Unified error types for cidian.
//!
//! Every variant carries a stable code prefix so callers (and the MCP
//! boundary) can branch on the category without parsing messages.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the cidian crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Structured store could not be opened or upgraded.
    #[error("CONNECTION_ERROR: {0}")]
    Connection(String),

    /// A record or key could not be stored (bad key path, bad key type).
    #[error("DATA_ERROR: {0}")]
    Data(String),

    /// Imported or downloaded data failed the first-record shape check.
    #[error("SCHEMA_INVALID: {0}")]
    SchemaValidation(String),

    /// Database operation failed.
    #[error("STORAGE_ERROR: {0}")]
    Storage(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Unknown object store or index.
    #[error("STORAGE_ERROR: not found: {0}")]
    UnknownStore(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Transport-level network failure.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Network request exceeded its deadline.
    #[error("NETWORK_TIMEOUT: {0}")]
    Timeout(String),

    /// Non-success HTTP status where one was required.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Filesystem failure (local storage, exports).
    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode failure.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation not permitted in the current lifecycle state.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Storage(tokio_rusqlite::Error::Close(c)),
            _ => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Storage(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::SchemaValidation(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32602, msg.clone()),
            Error::Connection(msg) => (-32010, msg.clone()),
            Error::Data(msg) => (-32011, msg.clone()),
            Error::Network(msg) | Error::HttpError(msg) => (-32012, msg.clone()),
            Error::Timeout(msg) => (-32013, msg.clone()),
            Error::InvalidState(msg) => (-32014, msg.clone()),
            _ => (-32603, err.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

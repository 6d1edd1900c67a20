//! Unified error types for the booking cache.
//!
//! `NetworkError` classifies failures of a remote fetch. `Error` is what the
//! coordinator and store hand back to callers.

use tokio_rusqlite::rusqlite;

/// Failure reported by a remote fetcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// The source could not be located (missing document, malformed URL).
    #[error("Invalid URL")]
    InvalidUrl,

    /// The source answered, but not with something usable.
    #[error("Invalid response from server")]
    InvalidResponse,

    /// The payload was empty or unreadable.
    #[error("Invalid data received")]
    InvalidData,

    /// The payload was not a structured booking document.
    #[error("Error decoding data")]
    DecodingError,

    /// The source reported a failure of its own.
    #[error("Server error: {0}")]
    ServerError(String),
}

/// Unified error type for coordinator and store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fetching from the remote source failed.
    #[error("{0}")]
    Network(#[from] NetworkError),

    /// The persistence layer failed.
    #[error("Store error: {0}")]
    Store(tokio_rusqlite::Error),

    /// A schema migration failed to apply.
    #[error("Store error: migration failed: {0}")]
    MigrationFailed(String),

    /// A cached record exists but is expired or stale.
    #[error("Data has expired")]
    DataExpired,

    /// No record could be produced.
    #[error("No data available")]
    NoDataAvailable,
}

impl Error {
    /// True for failures raised by the persistence layer.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_) | Error::MigrationFailed(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Store(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Store(tokio_rusqlite::Error::Close(c)),
            _ => Error::Store(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Store(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(tokio_rusqlite::Error::Error(err))
    }
}

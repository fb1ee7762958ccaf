//! Error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while configuring or using the database handle
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be turned into a handle (malformed value, bad CA file, ...)
    #[error("configuration error: {0}")]
    Config(String),

    /// TLS setup failed
    #[error("tls error: {0}")]
    Tls(String),

    /// Error reported by the wrapped Postgres client, passed through unchanged
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    /// Operation not permitted in the handle's current lifecycle state
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// What the operation required
        expected: String,
        /// What the handle was in
        actual: String,
    },
}

impl Error {
    /// Whether this error originated in the wrapped client library
    pub fn is_postgres(&self) -> bool {
        matches!(self, Error::Postgres(_))
    }
}

impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Self {
        Error::Tls(e.to_string())
    }
}

//! Error types for the file vault.

use thiserror::Error;

/// Common error type for the file vault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The request omitted a required field or carried unusable content.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The decoded payload exceeds the upload ceiling.
    #[error("payload too large: {size} bytes (limit {limit} bytes)")]
    PayloadTooLarge {
        /// Decoded payload size in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        limit: u64,
    },

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The access policy denied the viewer.
    #[error("access denied: {0}")]
    Forbidden(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted metadata document could not be read or written.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Metadata(e.to_string())
    }
}

/// Result type alias for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

//! Error types for manglo-api

use thiserror::Error;

/// Result type alias using manglo-api Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the assistant service
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed (transport-level)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Service returned a non-success status
    #[error("API error: {message} (status {status})")]
    Api { status: u16, message: String },

    /// Authentication required or rejected (401-class)
    #[error("Authentication required: {0}")]
    Auth(String),

    /// The event stream violated the protocol in a non-recoverable way
    #[error("Stream protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Create an API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Check if this error means the caller is not authenticated
    pub fn is_auth(&self) -> bool {
        match self {
            Error::Auth(_) => true,
            Error::Api { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }
}

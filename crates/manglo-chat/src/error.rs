//! Error types for manglo-chat

use thiserror::Error;

/// Result type alias using manglo-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during session operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the wire/client layer
    #[error(transparent)]
    Api(#[from] manglo_api::Error),

    /// A send or clear was issued while an exchange is already in flight
    #[error("an exchange is already in flight")]
    Busy,
}

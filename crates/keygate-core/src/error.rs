//! Error types for Keygate Core.

use thiserror::Error;

/// Core errors that can occur while handling secrets, tokens and dates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The server secret is missing or unusable. Fatal configuration error.
    #[error("server secret unavailable: {0}")]
    SecretUnavailable(String),

    /// A stored expiry value could not be parsed as `YYYY-MM-DD`.
    #[error("corrupt expiry value: {0:?}")]
    CorruptExpiry(String),

    /// A token did not have the expected shape.
    #[error("malformed token")]
    MalformedToken,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

//! Error types for the guard module.

use thiserror::Error;

/// Errors from guard components.
#[derive(Debug, Error)]
pub enum GuardError {
    /// A thread panicked while holding shared guard state.
    #[error("guard state poisoned: {0}")]
    StatePoisoned(String),

    /// An operator alert could not be delivered.
    #[error("alert delivery failed: {0}")]
    AlertDelivery(String),
}

impl<T> From<std::sync::PoisonError<T>> for GuardError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        GuardError::StatePoisoned(e.to_string())
    }
}

/// Result type for guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;

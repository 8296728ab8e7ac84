//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// Every variant means the backing medium could not confirm the operation.
/// Callers treat them uniformly as "storage unavailable".
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Snapshot serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The medium could not be reached (poisoned lock, failed worker, outage).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Concurrent writers kept invalidating the snapshot version.
    #[error("commit abandoned after {attempts} conflicting attempts")]
    Contention { attempts: u32 },

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

//! Error types for Keygate operations.

use std::time::Duration;

use keygate_core::SubjectId;
use keygate_guard::GuardError;
use keygate_store::StoreError;
use thiserror::Error;

/// Why a Keygate operation did not succeed.
///
/// Every validation failure has already been audited and counted against
/// the subject by the time the caller sees it.
#[derive(Debug, Error)]
pub enum KeygateError {
    /// The requester may not mint keys.
    #[error("{requester} is not authorized to issue keys")]
    NotAuthorized { requester: SubjectId },

    /// Too many failed attempts; try again after the cooldown.
    #[error("rate limited, retry in {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// The input is not shaped like a key.
    #[error("invalid key format")]
    InvalidFormat,

    /// The key's signature does not verify.
    #[error("invalid key signature")]
    InvalidSignature,

    /// The key is unknown or has already been redeemed.
    #[error("key not found")]
    KeyNotFound,

    /// The key's expiry has passed.
    #[error("key expired")]
    KeyExpired,

    /// Storage could not confirm the operation. Whether it took effect is
    /// unknown; the caller may retry.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The work was done and audited, but the operator alert about it was
    /// not delivered.
    #[error("alert delivery failed: {0}")]
    AlertDelivery(String),
}

impl KeygateError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, KeygateError::StorageUnavailable(_))
    }

    /// The message shown to the end user. Stable per variant.
    pub fn user_message(&self) -> String {
        match self {
            KeygateError::NotAuthorized { .. } => "Admin only command.".to_string(),
            KeygateError::RateLimited { retry_after } => format!(
                "Too many attempts! Please try again in {} seconds.",
                retry_after.as_secs().max(1)
            ),
            KeygateError::InvalidFormat => {
                "Invalid key format. Please check the key and try again.".to_string()
            }
            KeygateError::InvalidSignature => {
                "Invalid key. Verification failed; it may be corrupted.".to_string()
            }
            KeygateError::KeyNotFound => {
                "Invalid key. The key you entered is invalid or has already been used.".to_string()
            }
            KeygateError::KeyExpired => "Expired key. This key has already expired.".to_string(),
            KeygateError::StorageUnavailable(_) | KeygateError::AlertDelivery(_) => {
                "Something went wrong on our side. Please try again shortly.".to_string()
            }
        }
    }
}

impl From<StoreError> for KeygateError {
    fn from(e: StoreError) -> Self {
        KeygateError::StorageUnavailable(e.to_string())
    }
}

impl From<GuardError> for KeygateError {
    fn from(e: GuardError) -> Self {
        match e {
            GuardError::AlertDelivery(reason) => KeygateError::AlertDelivery(reason),
            GuardError::StatePoisoned(_) => KeygateError::StorageUnavailable(e.to_string()),
        }
    }
}

/// Result type for Keygate operations.
pub type Result<T> = std::result::Result<T, KeygateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_storage_is_retryable() {
        assert!(KeygateError::StorageUnavailable("down".into()).is_retryable());
        assert!(!KeygateError::KeyNotFound.is_retryable());
        assert!(!KeygateError::RateLimited {
            retry_after: Duration::from_secs(5)
        }
        .is_retryable());
    }

    #[test]
    fn test_rate_limited_message_shows_seconds() {
        let e = KeygateError::RateLimited {
            retry_after: Duration::from_millis(42_500),
        };
        assert!(e.user_message().contains("42 seconds"));
    }

    #[test]
    fn test_storage_message_hides_cause() {
        let e = KeygateError::from(StoreError::Unavailable("disk on fire".into()));
        assert!(!e.user_message().contains("disk"));
        assert!(e.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_alert_failure_is_its_own_error() {
        let e = KeygateError::from(GuardError::AlertDelivery("alert receiver dropped".into()));
        match &e {
            KeygateError::AlertDelivery(reason) => assert!(reason.contains("dropped")),
            other => panic!("expected AlertDelivery, got {other:?}"),
        }
        assert!(!e.is_retryable());

        let poisoned = KeygateError::from(GuardError::StatePoisoned("boom".into()));
        assert!(matches!(poisoned, KeygateError::StorageUnavailable(_)));
    }
}

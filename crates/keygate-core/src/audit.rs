//! Audit event types.
//!
//! Events are immutable once built. Sinks live in `keygate-guard`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::SubjectId;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// An administrator minted a key.
    KeyGenerated,
    /// A non-administrator tried to mint a key.
    UnauthorizedKeyGeneration,
    /// A key was exchanged for a grant.
    KeyRedeemed,
    /// Redemption input failed the shape check.
    InvalidKeyFormat,
    /// Redemption input failed signature verification.
    InvalidKeySignature,
    /// A well-signed token that is not outstanding (unknown or already used).
    InvalidKeyAttempt,
    /// The key exists but its expiry has passed.
    ExpiredKey,
    /// The stored expiry for the key could not be parsed.
    CorruptExpiry,
    /// The store failed while committing; outcome indeterminate.
    StorageFailure,
    /// The sweeper found subjects with excessive failed attempts.
    BruteForceSuspected,
}

impl AuditKind {
    /// Stable wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditKind::KeyGenerated => "key_generated",
            AuditKind::UnauthorizedKeyGeneration => "unauthorized_key_generation",
            AuditKind::KeyRedeemed => "key_redeemed",
            AuditKind::InvalidKeyFormat => "invalid_key_format",
            AuditKind::InvalidKeySignature => "invalid_key_signature",
            AuditKind::InvalidKeyAttempt => "invalid_key_attempt",
            AuditKind::ExpiredKey => "expired_key",
            AuditKind::CorruptExpiry => "corrupt_expiry",
            AuditKind::StorageFailure => "storage_failure",
            AuditKind::BruteForceSuspected => "brute_force_suspected",
        }
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable security-relevant event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// What happened.
    pub kind: AuditKind,
    /// Who it happened to (or who did it).
    pub subject: SubjectId,
    /// Free-form context. Never contains a full token.
    pub detail: String,
    /// When it happened (Unix ms).
    pub occurred_at: i64,
}

impl AuditEvent {
    /// Create a new event.
    pub fn new(
        kind: AuditKind,
        subject: SubjectId,
        detail: impl Into<String>,
        occurred_at: i64,
    ) -> Self {
        Self {
            kind,
            subject,
            detail: detail.into(),
            occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_serde() {
        let kinds = [
            AuditKind::KeyGenerated,
            AuditKind::UnauthorizedKeyGeneration,
            AuditKind::KeyRedeemed,
            AuditKind::InvalidKeyFormat,
            AuditKind::InvalidKeySignature,
            AuditKind::InvalidKeyAttempt,
            AuditKind::ExpiredKey,
            AuditKind::CorruptExpiry,
            AuditKind::StorageFailure,
            AuditKind::BruteForceSuspected,
        ];
        for kind in kinds {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}

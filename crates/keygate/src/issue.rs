//! Administrative key issuance.

use std::sync::Arc;
use std::time::Duration;

use keygate_core::{AuditKind, Clock, Key, KeyCodec, StoredExpiry, SubjectId};
use keygate_store::{EntitlementStore, Mutation, StoreExt};

use crate::command::{parse_valid_days, DEFAULT_VALID_DAYS};
use crate::error::{KeygateError, Result};
use crate::report::{bounded, Reporter};

/// A key that has been minted and stored as outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedKey {
    /// The token and its expiry.
    pub key: Key,
    /// Validity actually applied, after clamping.
    pub valid_days: u32,
}

/// Mints keys for the administrator.
pub struct KeyIssuer<S> {
    store: Arc<S>,
    codec: Arc<KeyCodec>,
    admin: Option<SubjectId>,
    reporter: Reporter,
    clock: Arc<dyn Clock>,
    storage_timeout: Duration,
    default_valid_days: u32,
}

impl<S: EntitlementStore> KeyIssuer<S> {
    pub(crate) fn new(
        store: Arc<S>,
        codec: Arc<KeyCodec>,
        admin: Option<SubjectId>,
        reporter: Reporter,
        clock: Arc<dyn Clock>,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            store,
            codec,
            admin,
            reporter,
            clock,
            storage_timeout,
            default_valid_days: DEFAULT_VALID_DAYS,
        }
    }

    /// Validity applied by [`issue_args`](Self::issue_args) when the
    /// arguments carry no usable day count.
    pub(crate) fn with_default_valid_days(mut self, days: u32) -> Self {
        self.default_valid_days = days;
        self
    }

    /// Whether `requester` may issue keys.
    pub fn is_admin(&self, requester: &SubjectId) -> bool {
        self.admin.as_ref() == Some(requester)
    }

    /// Mint a key valid for `valid_days` (clamped to `1..=365`) and store
    /// it as outstanding.
    pub async fn issue(&self, requester: &SubjectId, valid_days: u32) -> Result<IssuedKey> {
        if !self.is_admin(requester) {
            tracing::warn!(requester = %requester, "unauthorized key issuance attempt");
            self.reporter
                .audit(
                    AuditKind::UnauthorizedKeyGeneration,
                    requester,
                    "issuance refused".to_string(),
                )
                .await;
            return Err(KeygateError::NotAuthorized {
                requester: requester.clone(),
            });
        }

        let today = self.clock.today();
        let key = self.codec.issue(valid_days, today);
        // The codec clamps; report what it applied.
        let valid_days = (key.expires_on - today).num_days() as u32;
        let hint = KeyCodec::hint(&key.token);
        let expiry = StoredExpiry::from(key.expires_on);

        let insert = self.store.commit(|snapshot| {
            snapshot
                .outstanding_keys
                .insert(key.token.clone(), expiry.clone());
            Mutation::Write(())
        });
        if let Err(e) = bounded(self.storage_timeout, insert).await {
            return Err(self
                .reporter
                .storage_failure(requester, &format!("issue key {hint}"), e)
                .await);
        }

        self.reporter
            .audit(
                AuditKind::KeyGenerated,
                requester,
                format!(
                    "key {hint}, valid {valid_days} days, expires {}",
                    key.expires_on
                ),
            )
            .await;
        tracing::info!(valid_days, expires_on = %key.expires_on, "key issued");

        Ok(IssuedKey { key, valid_days })
    }

    /// Issue from raw command arguments: an optional day count, falling
    /// back to the configured default when absent or not a number.
    pub async fn issue_args(&self, requester: &SubjectId, args: &[&str]) -> Result<IssuedKey> {
        let valid_days = parse_valid_days(args, self.default_valid_days);
        self.issue(requester, valid_days).await
    }
}

//! Key redemption.
//!
//! A redemption moves through fixed stages and stops at the first failure:
//!
//! ```text
//! rate check -> format -> signature -> existence -> expiry -> commit
//! ```
//!
//! The rate check costs the subject nothing. Every later rejection counts
//! as a failed attempt and is audited. Existence, expiry and the state
//! change are evaluated inside one store commit, so they always see the
//! same snapshot and a token can be spent at most once.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use keygate_core::{AuditKind, Clock, KeyCodec, SubjectId};
use keygate_guard::{RateLimiter, SubjectLocks};
use keygate_store::{EntitlementStore, Mutation, StoreExt};

use crate::command::{normalize_token, parse_redeem_token};
use crate::error::{KeygateError, Result};
use crate::report::{bounded, Reporter};

/// A confirmed redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    /// Who now holds the grant.
    pub subject: SubjectId,
    /// The grant's expiry, taken from the redeemed key.
    pub expires_on: NaiveDate,
}

/// What the commit closure found.
#[derive(Debug)]
enum Lookup {
    Redeemed(NaiveDate),
    NotOutstanding,
    Expired(NaiveDate),
    CorruptExpiry(String),
}

/// Validates keys and converts them into grants.
pub struct RedemptionService<S> {
    store: Arc<S>,
    codec: Arc<KeyCodec>,
    limiter: Arc<RateLimiter>,
    locks: SubjectLocks,
    reporter: Reporter,
    clock: Arc<dyn Clock>,
    storage_timeout: Duration,
}

impl<S: EntitlementStore> RedemptionService<S> {
    pub(crate) fn new(
        store: Arc<S>,
        codec: Arc<KeyCodec>,
        limiter: Arc<RateLimiter>,
        reporter: Reporter,
        clock: Arc<dyn Clock>,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            store,
            codec,
            limiter,
            locks: SubjectLocks::new(),
            reporter,
            clock,
            storage_timeout,
        }
    }

    /// Redeem `raw_token` for `subject`.
    ///
    /// The token is trimmed and upper-cased first.
    pub async fn redeem(&self, subject: &SubjectId, raw_token: &str) -> Result<Redemption> {
        let _guard = self.locks.lock(subject).await?;
        self.check_rate(subject)?;

        self.validate_and_commit(subject, &normalize_token(raw_token))
            .await
    }

    /// Redeem from raw command arguments. Anything other than exactly one
    /// argument is a failed attempt with `InvalidFormat`.
    pub async fn redeem_args(&self, subject: &SubjectId, args: &[&str]) -> Result<Redemption> {
        let _guard = self.locks.lock(subject).await?;
        self.check_rate(subject)?;

        match parse_redeem_token(args) {
            Some(token) => self.validate_and_commit(subject, &token).await,
            None => {
                self.reject(
                    subject,
                    AuditKind::InvalidKeyFormat,
                    format!("expected exactly one key argument, got {}", args.len()),
                    KeygateError::InvalidFormat,
                )
                .await
            }
        }
    }

    fn check_rate(&self, subject: &SubjectId) -> Result<()> {
        if let Some(retry_after) = self.limiter.retry_after(subject)? {
            tracing::debug!(subject = %subject, ?retry_after, "redemption rate limited");
            return Err(KeygateError::RateLimited { retry_after });
        }
        Ok(())
    }

    async fn validate_and_commit(&self, subject: &SubjectId, token: &str) -> Result<Redemption> {
        let hint = KeyCodec::hint(token);

        if !KeyCodec::check_format(token) {
            return self
                .reject(
                    subject,
                    AuditKind::InvalidKeyFormat,
                    format!("key {hint}"),
                    KeygateError::InvalidFormat,
                )
                .await;
        }

        if !self.codec.check_signature(token) {
            return self
                .reject(
                    subject,
                    AuditKind::InvalidKeySignature,
                    format!("key {hint}"),
                    KeygateError::InvalidSignature,
                )
                .await;
        }

        let today = self.clock.today();
        let lookup = match bounded(self.storage_timeout, self.spend(subject, token, today)).await {
            Ok(lookup) => lookup,
            Err(e) => {
                // Outcome unknown: do not count this against the subject.
                return Err(self
                    .reporter
                    .storage_failure(subject, &format!("redeem key {hint}"), e)
                    .await);
            }
        };

        match lookup {
            Lookup::Redeemed(expires_on) => {
                // The grant is committed; a limiter fault must not turn it into an error.
                if let Err(e) = self.limiter.record_attempt(subject, true) {
                    tracing::error!(subject = %subject, "failed to clear rate-limit record: {}", e);
                }
                self.reporter
                    .audit(
                        AuditKind::KeyRedeemed,
                        subject,
                        format!("key {hint}, expires {expires_on}"),
                    )
                    .await;
                tracing::info!(subject = %subject, %expires_on, "key redeemed");

                Ok(Redemption {
                    subject: subject.clone(),
                    expires_on,
                })
            }
            Lookup::NotOutstanding => {
                self.reject(
                    subject,
                    AuditKind::InvalidKeyAttempt,
                    format!("key {hint}"),
                    KeygateError::KeyNotFound,
                )
                .await
            }
            Lookup::Expired(expired_on) => {
                self.reject(
                    subject,
                    AuditKind::ExpiredKey,
                    format!("key {hint}, expired {expired_on}"),
                    KeygateError::KeyExpired,
                )
                .await
            }
            Lookup::CorruptExpiry(raw) => {
                tracing::warn!(subject = %subject, key = %hint, stored = %raw, "stored key expiry unreadable");
                self.reject(
                    subject,
                    AuditKind::CorruptExpiry,
                    format!("key {hint}, stored expiry {raw:?}"),
                    KeygateError::KeyNotFound,
                )
                .await
            }
        }
    }

    /// Check existence and expiry, and move the key into a grant, in one commit.
    async fn spend(
        &self,
        subject: &SubjectId,
        token: &str,
        today: NaiveDate,
    ) -> keygate_store::Result<Lookup> {
        self.store
            .commit(|snapshot| {
                let Some(stored) = snapshot.outstanding_keys.get(token) else {
                    return Mutation::Discard(Lookup::NotOutstanding);
                };
                let expires_on = match stored.date() {
                    Ok(date) => date,
                    Err(_) => {
                        return Mutation::Discard(Lookup::CorruptExpiry(stored.as_str().to_string()))
                    }
                };
                if expires_on <= today {
                    return Mutation::Discard(Lookup::Expired(expires_on));
                }

                let stored = stored.clone();
                snapshot.outstanding_keys.remove(token);
                snapshot.grants.insert(subject.clone(), stored);
                Mutation::Write(Lookup::Redeemed(expires_on))
            })
            .await
    }

    async fn reject(
        &self,
        subject: &SubjectId,
        kind: AuditKind,
        detail: String,
        error: KeygateError,
    ) -> Result<Redemption> {
        self.limiter.record_attempt(subject, false)?;
        self.reporter.audit(kind, subject, detail).await;
        tracing::debug!(subject = %subject, %kind, "redemption rejected");
        Err(error)
    }
}

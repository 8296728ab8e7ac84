//! The Keygate facade: one handle over issuance, redemption and entitlement
//! queries.
//!
//! Front-ends only need this type. It owns the rate limiter, the codec and
//! the store handle, and shares them with the services and the sweeper.

use std::sync::Arc;

use chrono::NaiveDate;
use keygate_core::{Clock, KeyCodec, ServerSecret, SubjectId, SystemClock};
use keygate_guard::{
    Alerter, AuditLog, RateLimiter, SecuritySweeper, SweepReport, TracingAlerter, TracingAuditLog,
};
use keygate_store::{EntitlementStore, StoreExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::command::Template;
use crate::config::KeygateConfig;
use crate::error::Result;
use crate::issue::{IssuedKey, KeyIssuer};
use crate::redeem::{Redemption, RedemptionService};
use crate::report::{bounded, Reporter};

/// The time source and sinks a [`Keygate`] reports through.
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub audit: Arc<dyn AuditLog>,
    pub alerter: Arc<dyn Alerter>,
}

impl Default for Collaborators {
    /// Wall clock, `tracing` audit log, `tracing` alerts.
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            audit: Arc::new(TracingAuditLog),
            alerter: Arc::new(TracingAlerter),
        }
    }
}

/// The main Keygate handle.
pub struct Keygate<S: EntitlementStore> {
    store: Arc<S>,
    redemption: RedemptionService<S>,
    issuer: KeyIssuer<S>,
    limiter: Arc<RateLimiter>,
    sweeper: Arc<SecuritySweeper>,
    clock: Arc<dyn Clock>,
    config: KeygateConfig,
}

impl<S: EntitlementStore> Keygate<S> {
    /// Create a Keygate with the default collaborators.
    pub fn new(store: S, secret: ServerSecret, config: KeygateConfig) -> Self {
        Self::with_collaborators(Arc::new(store), secret, config, Collaborators::default())
    }

    /// Create a Keygate over a shared store with explicit collaborators.
    pub fn with_collaborators(
        store: Arc<S>,
        secret: ServerSecret,
        config: KeygateConfig,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators {
            clock,
            audit,
            alerter,
        } = collaborators;

        let codec = Arc::new(KeyCodec::new(secret));
        let limiter = Arc::new(RateLimiter::new(config.rate_limit, clock.clone()));
        let reporter = Reporter::new(audit.clone(), alerter.clone(), clock.clone())
            .with_alert_timeout(config.storage_timeout);

        let redemption = RedemptionService::new(
            store.clone(),
            codec.clone(),
            limiter.clone(),
            reporter.clone(),
            clock.clone(),
            config.storage_timeout,
        );
        let issuer = KeyIssuer::new(
            store.clone(),
            codec,
            config.admin.clone(),
            reporter,
            clock.clone(),
            config.storage_timeout,
        )
        .with_default_valid_days(config.default_valid_days);
        let sweeper = Arc::new(SecuritySweeper::new(
            limiter.clone(),
            audit,
            alerter,
            clock.clone(),
            config.sweeper,
        ));

        Self {
            store,
            redemption,
            issuer,
            limiter,
            sweeper,
            clock,
            config,
        }
    }

    /// The store backend.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The shared rate limiter.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The active configuration.
    pub fn config(&self) -> &KeygateConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Mint a key. Only the configured administrator may do this.
    pub async fn issue(&self, requester: &SubjectId, valid_days: u32) -> Result<IssuedKey> {
        self.issuer.issue(requester, valid_days).await
    }

    /// Mint a key from raw command arguments.
    pub async fn issue_args(&self, requester: &SubjectId, args: &[&str]) -> Result<IssuedKey> {
        self.issuer.issue_args(requester, args).await
    }

    /// Redeem a key for `subject`.
    pub async fn redeem(&self, subject: &SubjectId, token: &str) -> Result<Redemption> {
        self.redemption.redeem(subject, token).await
    }

    /// Redeem from raw command arguments.
    pub async fn redeem_args(&self, subject: &SubjectId, args: &[&str]) -> Result<Redemption> {
        self.redemption.redeem_args(subject, args).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entitlements
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `subject` currently holds an active grant.
    ///
    /// Fail-closed: storage errors, timeouts and corrupt data all read as
    /// not entitled.
    pub async fn is_entitled(&self, subject: &SubjectId) -> bool {
        let today = self.clock.today();
        match bounded(
            self.config.storage_timeout,
            self.store.is_entitled(subject, today),
        )
        .await
        {
            Ok(entitled) => entitled,
            Err(e) => {
                tracing::warn!(subject = %subject, "entitlement check failed closed: {}", e);
                false
            }
        }
    }

    /// The expiry of `subject`'s grant, whether or not it is still active.
    pub async fn grant_expiry(&self, subject: &SubjectId) -> Result<Option<NaiveDate>> {
        bounded(self.config.storage_timeout, self.store.grant_expiry(subject)).await
    }

    /// The template to render with: `requested` if the subject may use it,
    /// otherwise the free one.
    pub async fn resolve_template(&self, subject: &SubjectId, requested: Template) -> Template {
        if !requested.requires_entitlement() || self.is_entitled(subject).await {
            requested
        } else {
            Template::Basic
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Security sweeper
    // ─────────────────────────────────────────────────────────────────────────

    /// Run one brute-force sweep now.
    ///
    /// A flagged subject is audited before its alert is sent, so
    /// [`KeygateError::AlertDelivery`](crate::KeygateError::AlertDelivery)
    /// means only the alert was lost.
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        Ok(self.sweeper.sweep_once().await?)
    }

    /// Start the periodic sweeper. It stops when `shutdown` turns true or
    /// its sender is dropped.
    pub fn spawn_sweeper(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        Arc::clone(&self.sweeper).spawn(shutdown)
    }
}

//! Background brute-force detection.
//!
//! Every interval the sweeper asks the rate limiter for subjects whose
//! failure streak is above twice the attempt limit, reports them in one
//! aggregated audit event plus an operator alert, and evicts idle
//! rate-limit records. A failed cycle is logged and retried after a
//! shorter backoff. The loop only ends when its shutdown signal fires.

use std::sync::Arc;
use std::time::Duration;

use keygate_core::{AuditEvent, AuditKind, Clock, SubjectId};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::alert::{Alert, Alerter};
use crate::audit::AuditLog;
use crate::error::{GuardError, Result};
use crate::rate_limit::RateLimiter;

/// Subject recorded on events the sweeper raises itself.
pub const SWEEPER_SUBJECT: &str = "system:security-sweeper";

/// Sweeper configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Time between cycles.
    pub interval: Duration,
    /// Time before retrying after a failed cycle.
    pub error_backoff: Duration,
    /// Rate-limit records idle this long are dropped.
    pub idle_retention: Duration,
    /// Longest a cycle waits for its alert to be delivered.
    pub alert_timeout: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            error_backoff: Duration::from_secs(60),
            idle_retention: Duration::from_secs(24 * 60 * 60),
            alert_timeout: Duration::from_secs(10),
        }
    }
}

/// What one cycle found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Subjects over the threshold with their failure streaks.
    pub flagged: Vec<(SubjectId, u32)>,
    /// Idle rate-limit records removed.
    pub evicted: usize,
}

/// Periodic scanner over rate-limiter state.
pub struct SecuritySweeper {
    limiter: Arc<RateLimiter>,
    audit: Arc<dyn AuditLog>,
    alerter: Arc<dyn Alerter>,
    clock: Arc<dyn Clock>,
    config: SweeperConfig,
}

impl std::fmt::Debug for SecuritySweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecuritySweeper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SecuritySweeper {
    /// Create a sweeper. Nothing runs until [`spawn`](Self::spawn) or
    /// [`sweep_once`](Self::sweep_once) is called.
    pub fn new(
        limiter: Arc<RateLimiter>,
        audit: Arc<dyn AuditLog>,
        alerter: Arc<dyn Alerter>,
        clock: Arc<dyn Clock>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            limiter,
            audit,
            alerter,
            clock,
            config,
        }
    }

    /// Streaks strictly above this are reported.
    pub fn threshold(&self) -> u32 {
        self.limiter.config().max_attempts.saturating_mul(2)
    }

    /// Run one detection cycle.
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let flagged = self.limiter.suspicious(self.threshold())?;
        let evicted = self.limiter.evict_idle(self.config.idle_retention)?;

        if !flagged.is_empty() {
            let now = self.clock.now_millis();
            let summary = describe(&flagged, self.threshold());

            self.audit
                .append(AuditEvent::new(
                    AuditKind::BruteForceSuspected,
                    SubjectId::from(SWEEPER_SUBJECT),
                    summary.clone(),
                    now,
                ))
                .await;
            let alert = Alert::new(AuditKind::BruteForceSuspected, summary, now);
            tokio::time::timeout(self.config.alert_timeout, self.alerter.raise(alert))
                .await
                .map_err(|_| {
                    GuardError::AlertDelivery(format!(
                        "no delivery within {}ms",
                        self.config.alert_timeout.as_millis()
                    ))
                })??;
        }

        if evicted > 0 {
            tracing::debug!(evicted, "evicted idle rate-limit records");
        }

        Ok(SweepReport { flagged, evicted })
    }

    /// Run cycles until `shutdown` turns true or its sender is dropped.
    ///
    /// Shutdown is observed while waiting and while a cycle is in flight.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut delay = self.config.interval;

        loop {
            let stopping = *shutdown.borrow();
            if stopping {
                break;
            }

            let outcome = tokio::select! {
                changed = shutdown.changed() => Err(changed.is_ok()),
                outcome = self.wait_and_sweep(delay) => Ok(outcome),
            };

            delay = match outcome {
                // Sender dropped.
                Err(false) => break,
                Err(true) => continue,
                Ok(Ok(report)) => {
                    if !report.flagged.is_empty() {
                        tracing::warn!(
                            subjects = report.flagged.len(),
                            "brute-force suspects reported"
                        );
                    }
                    self.config.interval
                }
                Ok(Err(e)) => {
                    tracing::error!("security sweep failed: {}", e);
                    self.config.error_backoff
                }
            };
        }

        tracing::debug!("security sweeper stopped");
    }

    async fn wait_and_sweep(&self, delay: Duration) -> Result<SweepReport> {
        tokio::time::sleep(delay).await;
        self.sweep_once().await
    }

    /// Run the loop on its own task.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}

fn describe(flagged: &[(SubjectId, u32)], threshold: u32) -> String {
    let subjects = flagged
        .iter()
        .map(|(s, n)| format!("{s} ({n})"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} subject(s) above {} consecutive failed redemptions: {}",
        flagged.len(),
        threshold,
        subjects
    )
}

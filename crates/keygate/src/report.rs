//! Audit, alert and storage-bound helpers shared by issuance and redemption.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use keygate_core::{AuditEvent, AuditKind, Clock, SubjectId};
use keygate_guard::{Alert, Alerter, AuditLog};

use crate::error::{KeygateError, Result};

/// Longest a request waits on alert delivery unless told otherwise.
const DEFAULT_ALERT_TIMEOUT: Duration = Duration::from_secs(5);

/// Writes audit events and operator alerts stamped with one clock.
#[derive(Clone)]
pub(crate) struct Reporter {
    audit: Arc<dyn AuditLog>,
    alerter: Arc<dyn Alerter>,
    clock: Arc<dyn Clock>,
    alert_timeout: Duration,
}

impl Reporter {
    pub(crate) fn new(
        audit: Arc<dyn AuditLog>,
        alerter: Arc<dyn Alerter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            audit,
            alerter,
            clock,
            alert_timeout: DEFAULT_ALERT_TIMEOUT,
        }
    }

    /// Bound alert delivery so a lagging operator channel never holds up
    /// the request that raised the alert.
    pub(crate) fn with_alert_timeout(mut self, limit: Duration) -> Self {
        self.alert_timeout = limit;
        self
    }

    pub(crate) async fn audit(&self, kind: AuditKind, subject: &SubjectId, detail: String) {
        let event = AuditEvent::new(kind, subject.clone(), detail, self.clock.now_millis());
        self.audit.append(event).await;
    }

    /// Audit a storage failure and page the operator. Returns the error for
    /// the caller to propagate.
    pub(crate) async fn storage_failure(
        &self,
        subject: &SubjectId,
        operation: &str,
        error: KeygateError,
    ) -> KeygateError {
        tracing::error!(subject = %subject, operation, "storage write failed: {}", error);

        self.audit(
            AuditKind::StorageFailure,
            subject,
            format!("{operation}: {error}"),
        )
        .await;

        let alert = Alert::new(
            AuditKind::StorageFailure,
            format!("{operation} for subject {subject} could not be confirmed: {error}"),
            self.clock.now_millis(),
        );
        match tokio::time::timeout(self.alert_timeout, self.alerter.raise(alert)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("failed to deliver operator alert: {}", e),
            Err(_) => tracing::error!(
                "operator alert not delivered within {}ms",
                self.alert_timeout.as_millis()
            ),
        }

        error
    }
}

/// Await a storage call, failing with `StorageUnavailable` after `limit`.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = keygate_store::Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(KeygateError::from),
        Err(_) => Err(KeygateError::StorageUnavailable(format!(
            "storage call timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

//! Out-of-band operator alerts.
//!
//! Alerts are for conditions a human should look at now: storage that
//! refused a write after a key was validated, and subjects that look like
//! they are brute-forcing keys.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use keygate_core::AuditKind;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::{GuardError, Result};

/// An operator alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// The audit kind that triggered the alert.
    pub kind: AuditKind,
    /// Human-readable summary. Never contains a full token.
    pub message: String,
    /// Unix ms.
    pub raised_at: i64,
}

impl Alert {
    /// Create a new alert.
    pub fn new(kind: AuditKind, message: impl Into<String>, raised_at: i64) -> Self {
        Self {
            kind,
            message: message.into(),
            raised_at,
        }
    }
}

/// Delivers alerts to an operator.
#[async_trait]
pub trait Alerter: Send + Sync {
    /// Deliver one alert.
    async fn raise(&self, alert: Alert) -> Result<()>;
}

#[async_trait]
impl<A: Alerter + ?Sized> Alerter for Arc<A> {
    async fn raise(&self, alert: Alert) -> Result<()> {
        (**self).raise(alert).await
    }
}

/// Writes alerts as `ERROR` events on the `keygate::alert` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlerter;

#[async_trait]
impl Alerter for TracingAlerter {
    async fn raise(&self, alert: Alert) -> Result<()> {
        tracing::error!(
            target: "keygate::alert",
            kind = %alert.kind,
            raised_at = alert.raised_at,
            "{}",
            alert.message
        );
        Ok(())
    }
}

/// Forwards alerts to a bounded channel, e.g. a task that messages the
/// administrator.
///
/// Never waits for room: when the consumer lags and the channel is full,
/// the alert is refused with [`GuardError::AlertDelivery`].
#[derive(Debug, Clone)]
pub struct ChannelAlerter {
    tx: mpsc::Sender<Alert>,
}

impl ChannelAlerter {
    /// Create an alerter and the receiving end of its channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Alert>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Alerter for ChannelAlerter {
    async fn raise(&self, alert: Alert) -> Result<()> {
        self.tx.try_send(alert).map_err(|e| match e {
            TrySendError::Full(_) => GuardError::AlertDelivery("alert channel full".into()),
            TrySendError::Closed(_) => GuardError::AlertDelivery("alert receiver dropped".into()),
        })
    }
}

/// Keeps alerts in memory.
#[derive(Debug, Default)]
pub struct MemoryAlerter {
    alerts: Mutex<Vec<Alert>>,
}

impl MemoryAlerter {
    /// Create an empty alerter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything raised so far.
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Alerter for MemoryAlerter {
    async fn raise(&self, alert: Alert) -> Result<()> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert);
        Ok(())
    }
}

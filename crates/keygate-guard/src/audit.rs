//! Audit log sinks.
//!
//! The [`AuditLog`] trait is append-only: events go in, nothing is ever
//! updated or removed. Delivery problems are a sink's own concern and never
//! fail the operation being audited.
//!
//! - [`TracingAuditLog`]: structured `tracing` events on the `keygate::audit` target
//! - [`MemoryAuditLog`]: keeps events in memory for inspection in tests

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use keygate_core::{AuditEvent, AuditKind};

/// An append-only sink for security-relevant events.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record an event.
    async fn append(&self, event: AuditEvent);
}

#[async_trait]
impl<L: AuditLog + ?Sized> AuditLog for Arc<L> {
    async fn append(&self, event: AuditEvent) {
        (**self).append(event).await;
    }
}

/// Audit log that emits structured `tracing` events.
///
/// Field mapping:
/// - `kind`: stable kind name (e.g. `key_redeemed`)
/// - `subject`: the subject the event concerns
/// - `detail`: free-form context
/// - `occurred_at`: Unix ms
///
/// Storage failures and brute-force reports are emitted at `WARN`, the rest
/// at `INFO`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLog;

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn append(&self, event: AuditEvent) {
        match event.kind {
            AuditKind::StorageFailure | AuditKind::BruteForceSuspected => {
                tracing::warn!(
                    target: "keygate::audit",
                    kind = %event.kind,
                    subject = %event.subject,
                    detail = %event.detail,
                    occurred_at = event.occurred_at,
                    "audit_event"
                );
            }
            _ => {
                tracing::info!(
                    target: "keygate::audit",
                    kind = %event.kind,
                    subject = %event.subject,
                    detail = %event.detail,
                    occurred_at = event.occurred_at,
                    "audit_event"
                );
            }
        }
    }
}

/// Audit log that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in append order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events of one kind, in append order.
    pub fn of_kind(&self, kind: AuditKind) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect()
    }

    /// Number of events of one kind.
    pub fn count(&self, kind: AuditKind) -> usize {
        self.of_kind(kind).len()
    }

    /// Total number of events.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

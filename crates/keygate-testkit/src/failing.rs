//! Fault injection for store-dependent tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use keygate_store::{CasOutcome, EntitlementStore, Result, Snapshot, StoreError};

/// Wraps a store and fails or delays calls when told to.
#[derive(Debug, Default)]
pub struct FailingStore<S> {
    inner: S,
    fail_loads: AtomicBool,
    fail_writes: AtomicBool,
    delay_ms: AtomicU64,
    writes: AtomicU64,
}

impl<S> FailingStore<S> {
    /// Wrap `inner`; all calls pass through until configured otherwise.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_loads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Make snapshot loads fail.
    pub fn fail_loads(&self, on: bool) {
        self.fail_loads.store(on, Ordering::SeqCst);
    }

    /// Make compare-and-swap fail.
    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    /// Stall every call by `delay` before doing anything.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of compare-and-swap calls that reached the inner store.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn stall(&self) {
        let ms = self.delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait]
impl<S: EntitlementStore> EntitlementStore for FailingStore<S> {
    async fn load_snapshot(&self) -> Result<Snapshot> {
        self.stall().await;
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected load failure".into()));
        }
        self.inner.load_snapshot().await
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        snapshot: &Snapshot,
    ) -> Result<CasOutcome> {
        self.stall().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        let outcome = self.inner.compare_and_swap(expected_version, snapshot).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(outcome)
    }
}

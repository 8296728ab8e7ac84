//! Store trait: the abstract interface for entitlement persistence.
//!
//! Backends only provide a snapshot load and a versioned compare-and-swap.
//! Everything that reads-then-writes goes through [`StoreExt::commit`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use keygate_core::SubjectId;

use crate::error::{Result, StoreError};
use crate::snapshot::{Mutation, Snapshot};

/// How many times `commit` re-runs a closure after losing a version race.
pub const MAX_COMMIT_ATTEMPTS: u32 = 16;

/// Result of a compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write landed; the snapshot is now at `version`.
    Swapped { version: u64 },
    /// Someone else wrote first; the store is at `current`.
    Conflict { current: u64 },
}

/// The EntitlementStore trait: async interface for snapshot persistence.
///
/// All methods are async to support both sync (SQLite) and networked
/// backends. For SQLite, `spawn_blocking` is used internally.
///
/// # Design Notes
///
/// - **Single unit**: keys and grants are always loaded and written together.
/// - **Version token**: every successful write bumps the version by one.
/// - **Conditional write**: `compare_and_swap` only writes when the stored
///   version equals `expected_version`.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Read the current snapshot.
    async fn load_snapshot(&self) -> Result<Snapshot>;

    /// Replace the stored maps with those of `snapshot` if the stored
    /// version still equals `expected_version`.
    ///
    /// `snapshot.version` is ignored.
    async fn compare_and_swap(&self, expected_version: u64, snapshot: &Snapshot)
        -> Result<CasOutcome>;
}

#[async_trait]
impl<S: EntitlementStore + ?Sized> EntitlementStore for Arc<S> {
    async fn load_snapshot(&self) -> Result<Snapshot> {
        (**self).load_snapshot().await
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        snapshot: &Snapshot,
    ) -> Result<CasOutcome> {
        (**self).compare_and_swap(expected_version, snapshot).await
    }
}

/// Extension trait for read-modify-write and entitlement queries.
pub trait StoreExt: EntitlementStore {
    /// Apply `mutate` to the current snapshot as one atomic step.
    ///
    /// The closure may run more than once if another writer commits in
    /// between; it must derive everything it decides from the snapshot it
    /// is given. Returns the value carried by the closure's final
    /// [`Mutation`], once any write is confirmed.
    fn commit<T, F>(&self, mutate: F) -> impl Future<Output = Result<T>> + Send
    where
        T: Send,
        F: FnMut(&mut Snapshot) -> Mutation<T> + Send;

    /// Whether `subject` holds a grant active on `today`. Fail-closed on corrupt data.
    fn is_entitled(
        &self,
        subject: &SubjectId,
        today: NaiveDate,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// The readable grant expiry for `subject`, if any.
    fn grant_expiry(
        &self,
        subject: &SubjectId,
    ) -> impl Future<Output = Result<Option<NaiveDate>>> + Send;
}

impl<S: EntitlementStore + ?Sized> StoreExt for S {
    async fn commit<T, F>(&self, mut mutate: F) -> Result<T>
    where
        T: Send,
        F: FnMut(&mut Snapshot) -> Mutation<T> + Send,
    {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let mut snapshot = self.load_snapshot().await?;
            let expected = snapshot.version;

            let value = match mutate(&mut snapshot) {
                Mutation::Discard(value) => return Ok(value),
                Mutation::Write(value) => value,
            };

            match self.compare_and_swap(expected, &snapshot).await? {
                CasOutcome::Swapped { .. } => return Ok(value),
                CasOutcome::Conflict { current } => {
                    tracing::debug!(
                        attempt,
                        expected,
                        current,
                        "snapshot version moved during commit, retrying"
                    );
                    tokio::task::yield_now().await;
                }
            }
        }

        Err(StoreError::Contention {
            attempts: MAX_COMMIT_ATTEMPTS,
        })
    }

    async fn is_entitled(&self, subject: &SubjectId, today: NaiveDate) -> Result<bool> {
        let snapshot = self.load_snapshot().await?;
        Ok(snapshot.is_entitled(subject, today))
    }

    async fn grant_expiry(&self, subject: &SubjectId) -> Result<Option<NaiveDate>> {
        let snapshot = self.load_snapshot().await?;
        Ok(snapshot.grant_expiry(subject))
    }
}

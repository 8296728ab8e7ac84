//! In-memory implementation of the EntitlementStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::snapshot::Snapshot;
use crate::traits::{CasOutcome, EntitlementStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Snapshot>,
    loads: AtomicU64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the maps of `snapshot`, at its version.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
            loads: AtomicU64::new(0),
        }
    }

    /// How many times the snapshot has been loaded.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {}", e))
}

#[async_trait]
impl EntitlementStore for MemoryStore {
    async fn load_snapshot(&self) -> Result<Snapshot> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.clone())
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        snapshot: &Snapshot,
    ) -> Result<CasOutcome> {
        let mut inner = self.inner.write().map_err(poisoned)?;

        if inner.version != expected_version {
            return Ok(CasOutcome::Conflict {
                current: inner.version,
            });
        }

        let version = expected_version + 1;
        *inner = Snapshot {
            version,
            outstanding_keys: snapshot.outstanding_keys.clone(),
            grants: snapshot.grants.clone(),
        };

        Ok(CasOutcome::Swapped { version })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Mutation;
    use crate::traits::StoreExt;
    use chrono::NaiveDate;
    use keygate_core::{StoredExpiry, SubjectId};
    use std::sync::Arc;

    fn expiry() -> StoredExpiry {
        NaiveDate::from_ymd_opt(2027, 1, 1).unwrap().into()
    }

    #[tokio::test]
    async fn test_memory_store_commit_and_load() {
        let store = MemoryStore::new();

        store
            .commit(|s| {
                s.outstanding_keys.insert("KEY".into(), expiry());
                Mutation::Write(())
            })
            .await
            .unwrap();

        let snapshot = store.load_snapshot().await.unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.outstanding_keys.get("KEY"), Some(&expiry()));
    }

    #[tokio::test]
    async fn test_memory_store_discard_does_not_write() {
        let store = MemoryStore::new();

        let value = store
            .commit(|s| {
                s.grants.insert(SubjectId::from("alice"), expiry());
                Mutation::Discard(7)
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        let snapshot = store.load_snapshot().await.unwrap();
        assert_eq!(snapshot.version, 0);
        assert!(snapshot.grants.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_stale_cas_conflicts() {
        let store = MemoryStore::new();
        let stale = store.load_snapshot().await.unwrap();

        let first = store.compare_and_swap(0, &stale).await.unwrap();
        assert_eq!(first, CasOutcome::Swapped { version: 1 });

        let second = store.compare_and_swap(0, &stale).await.unwrap();
        assert_eq!(second, CasOutcome::Conflict { current: 1 });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_memory_store_no_lost_updates() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .commit(|s| {
                        s.grants.insert(SubjectId::new(format!("s{i}")), expiry());
                        Mutation::Write(())
                    })
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let snapshot = store.load_snapshot().await.unwrap();
        assert_eq!(snapshot.grants.len(), 8);
        assert_eq!(snapshot.version, 8);
    }

    #[tokio::test]
    async fn test_memory_store_load_count() {
        let store = MemoryStore::new();
        assert_eq!(store.load_count(), 0);
        store.is_entitled(&SubjectId::from("x"), NaiveDate::MIN).await.unwrap();
        assert_eq!(store.load_count(), 1);
    }
}

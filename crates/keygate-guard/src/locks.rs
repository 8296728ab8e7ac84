//! Per-subject serialization.
//!
//! Redemptions by the same subject run one at a time; different subjects
//! never wait on each other. Lock entries are created on demand and
//! removed when the last holder releases with nobody queued behind it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use keygate_core::SubjectId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::Result;

/// A map of per-subject async mutexes.
#[derive(Debug, Default)]
pub struct SubjectLocks {
    inner: Mutex<HashMap<SubjectId, Arc<AsyncMutex<()>>>>,
}

impl SubjectLocks {
    /// Create an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access for `subject`.
    pub async fn lock(&self, subject: &SubjectId) -> Result<SubjectGuard<'_>> {
        let mutex = {
            let mut map = self.inner.lock()?;
            Arc::clone(map.entry(subject.clone()).or_default())
        };

        let guard = mutex.lock_owned().await;

        Ok(SubjectGuard {
            locks: self,
            subject: subject.clone(),
            _guard: guard,
        })
    }

    /// Number of subjects with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Whether no subject currently holds or awaits a lock.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access for one subject. Released on drop.
#[derive(Debug)]
pub struct SubjectGuard<'a> {
    locks: &'a SubjectLocks,
    subject: SubjectId,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for SubjectGuard<'_> {
    fn drop(&mut self) {
        let Ok(mut map) = self.locks.inner.lock() else {
            return;
        };
        // One reference in the map, one in this guard: nobody is waiting.
        let idle = map
            .get(&self.subject)
            .map(|m| Arc::strong_count(m) <= 2)
            .unwrap_or(false);
        if idle {
            map.remove(&self.subject);
        }
    }
}

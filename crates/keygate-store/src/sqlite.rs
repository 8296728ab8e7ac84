//! SQLite implementation of the EntitlementStore trait.
//!
//! This is the primary storage backend for Keygate. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.
//!
//! The snapshot lives in a single row. Both maps are stored as JSON text
//! and the row's `version` column is the compare-and-swap token.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::snapshot::Snapshot;
use crate::traits::{CasOutcome, EntitlementStore};

/// How long SQLite waits on a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))
}

fn read_snapshot(conn: &Connection) -> Result<Snapshot> {
    let (version, keys, grants): (i64, String, String) = conn.query_row(
        "SELECT version, outstanding_keys, grants FROM entitlement_snapshot WHERE id = 1",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    Ok(Snapshot {
        version: version as u64,
        outstanding_keys: serde_json::from_str(&keys)?,
        grants: serde_json::from_str(&grants)?,
    })
}

#[async_trait]
impl EntitlementStore for SqliteStore {
    async fn load_snapshot(&self) -> Result<Snapshot> {
        self.run(|conn| read_snapshot(conn)).await
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        snapshot: &Snapshot,
    ) -> Result<CasOutcome> {
        let keys = serde_json::to_string(&snapshot.outstanding_keys)?;
        let grants = serde_json::to_string(&snapshot.grants)?;

        self.run(move |conn| {
            let tx = conn.transaction()?;

            let updated = tx.execute(
                "UPDATE entitlement_snapshot
                 SET version = version + 1, outstanding_keys = ?1, grants = ?2, updated_at = ?3
                 WHERE id = 1 AND version = ?4",
                params![keys, grants, migration::now_millis(), expected_version as i64],
            )?;

            let current: i64 = tx.query_row(
                "SELECT version FROM entitlement_snapshot WHERE id = 1",
                [],
                |row| row.get(0),
            )?;

            tx.commit()?;

            if updated == 1 {
                Ok(CasOutcome::Swapped {
                    version: current as u64,
                })
            } else {
                Ok(CasOutcome::Conflict {
                    current: current as u64,
                })
            }
        })
        .await
    }
}

//! SQLite schema setup.
//!
//! Applied steps are recorded in `schema_migrations`, one row per version.
//! Opening a database runs every step above the recorded version inside a
//! single transaction, so a half-migrated schema is never committed.

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::error::{Result, StoreError};

/// Newest schema this build understands.
pub const CURRENT_VERSION: u32 = 1;

type Step = fn(&Transaction<'_>) -> Result<()>;

/// Schema steps, indexed by target version minus one.
const STEPS: [Step; CURRENT_VERSION as usize] = [create_snapshot_table];

/// Bring `conn` up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let found = schema_version(conn)?;
    if found > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "schema version {found} is ahead of this build ({CURRENT_VERSION})"
        )));
    }
    if found == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (target, step) in STEPS.iter().enumerate().skip(found as usize) {
        let target = target as u32 + 1;
        step(&tx)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![target, now_millis()],
        )?;
        tracing::info!(version = target, "sqlite schema upgraded");
    }
    tx.commit()?;

    Ok(())
}

/// Highest recorded schema version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

/// v1: the single-row entitlement snapshot, seeded empty at version 0.
fn create_snapshot_table(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE entitlement_snapshot (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            outstanding_keys TEXT NOT NULL,    -- JSON: token -> YYYY-MM-DD
            grants TEXT NOT NULL,              -- JSON: subject -> YYYY-MM-DD
            updated_at INTEGER NOT NULL
        );
        "#,
    )?;
    tx.execute(
        "INSERT INTO entitlement_snapshot (id, version, outstanding_keys, grants, updated_at)
         VALUES (1, 0, '{}', '{}', ?1)",
        params![now_millis()],
    )?;
    Ok(())
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn
    }

    #[test]
    fn test_fresh_database_reaches_current_version() {
        let conn = fresh();

        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
        let snapshot_tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'entitlement_snapshot'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(snapshot_tables, 1);
    }

    #[test]
    fn test_unmigrated_database_reports_zero() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, applied_at INTEGER NOT NULL);",
        )
        .unwrap();

        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_snapshot_row_seeded_empty() {
        let conn = fresh();

        let row: (i64, String, String) = conn
            .query_row(
                "SELECT version, outstanding_keys, grants FROM entitlement_snapshot WHERE id = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();

        assert_eq!(row, (0, "{}".to_string(), "{}".to_string()));
    }

    #[test]
    fn test_reopen_does_not_reseed() {
        let mut conn = fresh();
        conn.execute(
            "UPDATE entitlement_snapshot SET version = 7 WHERE id = 1",
            [],
        )
        .unwrap();

        migrate(&mut conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT version FROM entitlement_snapshot", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 7);
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(applied, 1);
    }

    #[test]
    fn test_schema_from_future_build_rejected() {
        let mut conn = fresh();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, 0)",
            params![CURRENT_VERSION + 1],
        )
        .unwrap();

        match migrate(&mut conn) {
            Err(StoreError::Migration(msg)) => assert!(msg.contains("ahead")),
            other => panic!("expected migration error, got {other:?}"),
        }
    }
}

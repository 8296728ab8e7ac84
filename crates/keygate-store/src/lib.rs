//! # Keygate Store
//!
//! Storage abstraction for Keygate. Provides a trait-based interface for
//! the entitlement snapshot with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! Outstanding keys and active grants are persisted together as one
//! versioned [`Snapshot`]. Backends implement two primitives, a snapshot
//! load and a compare-and-swap on the version token; [`StoreExt::commit`]
//! builds the atomic read-modify-write on top of them.
//!
//! ## Key Types
//!
//! - [`EntitlementStore`] - The async trait every backend implements
//! - [`StoreExt`] - `commit`, `is_entitled` and `grant_expiry` for any store
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`Snapshot`] - Outstanding keys + grants + version
//! - [`Mutation`] - What a commit closure wants done with its changes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keygate_core::{StoredExpiry, SubjectId};
//! use keygate_store::{Mutation, SqliteStore, StoreExt};
//!
//! async fn example() {
//!     let store = SqliteStore::open("keygate.db").unwrap();
//!
//!     // Grant a subject access until the given date, atomically.
//!     let expiry: StoredExpiry = chrono::NaiveDate::from_ymd_opt(2027, 1, 1).unwrap().into();
//!     store
//!         .commit(|snapshot| {
//!             snapshot.grants.insert(SubjectId::from("42"), expiry.clone());
//!             Mutation::Write(())
//!         })
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **No lost updates**: a write only lands if the version it was computed
//!   from is still current; otherwise the closure re-runs on fresh state.
//! - **Fail-closed reads**: an unparsable stored expiry never grants access.
//! - **Blocking I/O off the runtime**: SQLite work runs in `spawn_blocking`.

pub mod error;
pub mod memory;
pub mod migration;
pub mod snapshot;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use snapshot::{Mutation, Snapshot};
pub use sqlite::SqliteStore;
pub use traits::{CasOutcome, EntitlementStore, StoreExt, MAX_COMMIT_ATTEMPTS};

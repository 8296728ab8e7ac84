//! # Keygate
//!
//! Time-limited premium keys, one-time redemption, and abuse-resistant
//! entitlements.
//!
//! ## Overview
//!
//! - **Keys**: signed bearer tokens minted by an administrator, each with an
//!   expiry date covered by the signature
//! - **Redemption**: a key is exchanged exactly once for a grant on the
//!   redeeming subject
//! - **Grants**: a subject is entitled while its grant's expiry is in the future
//! - **Abuse controls**: per-subject rate limiting, an audit trail, and a
//!   background sweeper that reports brute-force patterns
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keygate::{Keygate, KeygateConfig};
//! use keygate::core::SubjectId;
//! use keygate::store::SqliteStore;
//!
//! async fn example() {
//!     let (config, secret) = KeygateConfig::from_env().unwrap();
//!     let store = SqliteStore::open(&config.database).unwrap();
//!     let admin = config.admin.clone().unwrap();
//!     let gate = Keygate::new(store, secret, config);
//!
//!     let issued = gate.issue(&admin, 30).await.unwrap();
//!
//!     let user = SubjectId::from("1001");
//!     gate.redeem(&user, &issued.key.token).await.unwrap();
//!     assert!(gate.is_entitled(&user).await);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `keygate::core` - Tokens, grants, audit events, clocks
//! - `keygate::store` - Entitlement storage and SQLite
//! - `keygate::guard` - Rate limiting, audit sinks, alerts, sweeper

pub mod command;
pub mod config;
pub mod error;
pub mod gate;
pub mod issue;
pub mod redeem;
mod report;

// Re-export component crates
pub use keygate_core as core;
pub use keygate_guard as guard;
pub use keygate_store as store;

// Re-export main types for convenience
pub use command::{CallbackAction, CommandError, Template, DEFAULT_VALID_DAYS};
pub use config::{ConfigError, KeygateConfig};
pub use error::{KeygateError, Result};
pub use gate::{Collaborators, Keygate};
pub use issue::{IssuedKey, KeyIssuer};
pub use redeem::{Redemption, RedemptionService};

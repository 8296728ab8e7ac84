//! # Keygate Core
//!
//! Pure primitives for Keygate: signed premium key tokens, grants, audit
//! events, and the clock abstraction everything else reads time from.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over key tokens and calendar dates.
//!
//! ## Key Types
//!
//! - [`KeyCodec`] - Mints, shape-checks and verifies key tokens
//! - [`ServerSecret`] - The process-wide MAC secret
//! - [`Key`] - A minted token with its expiry date
//! - [`StoredExpiry`] - An expiry date as persisted in the grants map
//! - [`AuditEvent`] - An immutable security-relevant event
//! - [`Clock`] - Source of "now" and "today"
//!
//! ## Token Format
//!
//! ```text
//! PPPPPPPPPPPPPPPP-YYYYMMDD-SSSSSSSSSSSSSSSS
//! ```
//!
//! `P` is a random payload and `S` a truncated keyed Blake3 MAC over the
//! payload and the embedded expiry, both base32 (RFC 4648, upper case).
//! See [`codec`] for details.

pub mod audit;
pub mod base32;
pub mod clock;
pub mod codec;
pub mod error;
pub mod types;

pub use audit::{AuditEvent, AuditKind};
pub use clock::{date_from_millis, Clock, ManualClock, SystemClock};
pub use codec::{Key, KeyCodec, ServerSecret, MAX_VALID_DAYS, TOKEN_LEN};
pub use error::{CoreError, Result};
pub use types::{StoredExpiry, SubjectId};

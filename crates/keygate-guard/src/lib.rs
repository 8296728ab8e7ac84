//! # Keygate Guard
//!
//! Abuse controls around key redemption.
//!
//! ## Key Types
//!
//! - [`RateLimiter`] - Per-subject failed-attempt tracking and cooldown
//! - [`SubjectLocks`] - Serializes work for one subject, leaves others alone
//! - [`AuditLog`] - Append-only sink for security events
//! - [`Alerter`] - Out-of-band operator notification
//! - [`SecuritySweeper`] - Background brute-force detection
//!
//! All time-dependent components read from an injected
//! [`Clock`](keygate_core::Clock).

pub mod alert;
pub mod audit;
pub mod error;
pub mod locks;
pub mod rate_limit;
pub mod sweeper;

pub use alert::{Alert, Alerter, ChannelAlerter, MemoryAlerter, TracingAlerter};
pub use audit::{AuditLog, MemoryAuditLog, TracingAuditLog};
pub use error::{GuardError, Result};
pub use locks::{SubjectGuard, SubjectLocks};
pub use rate_limit::{RateLimitConfig, RateLimitRecord, RateLimiter};
pub use sweeper::{SecuritySweeper, SweepReport, SweeperConfig, SWEEPER_SUBJECT};

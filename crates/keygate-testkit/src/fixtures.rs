//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use keygate::{Collaborators, Keygate, KeygateConfig};
use keygate_core::{KeyCodec, ManualClock, ServerSecret, SubjectId};
use keygate_guard::{MemoryAlerter, MemoryAuditLog, RateLimitConfig};
use keygate_store::{EntitlementStore, MemoryStore};

/// Subject configured as administrator in fixtures.
pub const ADMIN: &str = "admin";

/// Fixed signing secret used by fixtures.
pub const TEST_SECRET: [u8; 32] = [0x42; 32];

/// The date every fixture clock starts on.
pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

/// Configuration used by fixtures: [`ADMIN`] as administrator, three
/// attempts per 60 s window, short storage timeout.
pub fn fixture_config() -> KeygateConfig {
    KeygateConfig {
        admin: Some(SubjectId::from(ADMIN)),
        storage_timeout: Duration::from_millis(200),
        rate_limit: RateLimitConfig {
            max_attempts: 3,
            cooldown: Duration::from_secs(60),
        },
        ..KeygateConfig::default()
    }
}

/// Shorthand for a subject id.
pub fn subject(name: &str) -> SubjectId {
    SubjectId::from(name)
}

/// A codec holding the fixture secret, for minting tokens off the books.
pub fn codec() -> KeyCodec {
    KeyCodec::new(ServerSecret::from_bytes(TEST_SECRET))
}

/// A Keygate wired to inspectable collaborators.
pub struct TestFixture<S: EntitlementStore = MemoryStore> {
    pub clock: Arc<ManualClock>,
    pub store: Arc<S>,
    pub audit: Arc<MemoryAuditLog>,
    pub alerter: Arc<MemoryAlerter>,
    pub gate: Keygate<S>,
    pub admin: SubjectId,
}

impl TestFixture<MemoryStore> {
    /// Fixture over an empty in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(), fixture_config())
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EntitlementStore> TestFixture<S> {
    /// Fixture over a given store and configuration.
    pub fn with_store(store: S, config: KeygateConfig) -> Self {
        let clock = Arc::new(ManualClock::at_date(start_date()));
        let store = Arc::new(store);
        let audit = Arc::new(MemoryAuditLog::new());
        let alerter = Arc::new(MemoryAlerter::new());

        let gate = Keygate::with_collaborators(
            store.clone(),
            ServerSecret::from_bytes(TEST_SECRET),
            config,
            Collaborators {
                clock: clock.clone(),
                audit: audit.clone(),
                alerter: alerter.clone(),
            },
        );

        Self {
            clock,
            store,
            audit,
            alerter,
            gate,
            admin: SubjectId::from(ADMIN),
        }
    }

    /// Issue a key as the administrator and return its token.
    pub async fn issue(&self, valid_days: u32) -> String {
        self.gate
            .issue(&self.admin, valid_days)
            .await
            .expect("fixture issuance failed")
            .key
            .token
    }
}

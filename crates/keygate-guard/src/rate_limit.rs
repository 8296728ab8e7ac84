//! Per-subject redemption rate limiting.
//!
//! Each subject gets a [`RateLimitRecord`] created on its first failed
//! attempt. A subject is blocked once it has `max_attempts` failures inside
//! one cooldown window, counted from its most recent attempt. The window
//! count resets lazily: a failure recorded after the cooldown has elapsed
//! starts a new window at one.
//!
//! Alongside the windowed count, every record keeps the failure streak since
//! the subject's last success. The streak survives window resets, which is
//! what lets the sweeper see repeated waves of guessing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use keygate_core::{Clock, SubjectId};

use crate::error::Result;

/// Rate limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Failures allowed inside one window before the subject is blocked.
    pub max_attempts: u32,
    /// Window length, measured from the most recent attempt.
    pub cooldown: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            cooldown: Duration::from_secs(300),
        }
    }
}

/// Attempt history for one subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Failures in the current window.
    pub attempt_count: u32,
    /// Failures since the last success, across windows.
    pub consecutive_failures: u32,
    /// Unix ms of the most recent recorded attempt.
    pub last_attempt_at: i64,
}

/// Tracks failed redemption attempts and enforces the cooldown.
///
/// The internal mutex is only held for map lookups and never across an
/// `.await`.
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<SubjectId, RateLimitRecord>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Create a limiter reading time from `clock`.
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    fn cooldown_millis(&self) -> i64 {
        i64::try_from(self.config.cooldown.as_millis()).unwrap_or(i64::MAX)
    }

    /// Milliseconds left in the record's window at `now`, if it is still open.
    fn window_remaining(&self, record: &RateLimitRecord, now: i64) -> Option<i64> {
        let elapsed = now.saturating_sub(record.last_attempt_at);
        let remaining = self.cooldown_millis().saturating_sub(elapsed);
        (remaining > 0).then_some(remaining)
    }

    /// Whether the subject has used up its attempts in the current window.
    pub fn is_blocked(&self, subject: &SubjectId) -> Result<bool> {
        Ok(self.retry_after(subject)?.is_some())
    }

    /// How long until a blocked subject may try again. `None` if not blocked.
    pub fn retry_after(&self, subject: &SubjectId) -> Result<Option<Duration>> {
        let now = self.clock.now_millis();
        let records = self.records.lock()?;

        let Some(record) = records.get(subject) else {
            return Ok(None);
        };
        if record.attempt_count < self.config.max_attempts {
            return Ok(None);
        }

        Ok(self
            .window_remaining(record, now)
            .map(|ms| Duration::from_millis(ms as u64)))
    }

    /// Record the outcome of an attempt.
    ///
    /// A success clears the subject's history. A failure bumps the window
    /// count (starting a new window if the old one has elapsed) and the
    /// streak, and stamps the attempt time.
    pub fn record_attempt(&self, subject: &SubjectId, success: bool) -> Result<()> {
        let mut records = self.records.lock()?;
        let now = self.clock.now_millis();

        if success {
            records.remove(subject);
            return Ok(());
        }

        let window_open = records
            .get(subject)
            .and_then(|r| self.window_remaining(r, now))
            .is_some();
        let record = records.entry(subject.clone()).or_default();

        record.attempt_count = if window_open {
            record.attempt_count.saturating_add(1)
        } else {
            1
        };
        record.consecutive_failures = record.consecutive_failures.saturating_add(1);
        record.last_attempt_at = now;

        if record.attempt_count >= self.config.max_attempts {
            tracing::debug!(
                subject = %subject,
                attempts = record.attempt_count,
                "subject reached attempt limit"
            );
        }

        Ok(())
    }

    /// Subjects whose failure streak exceeds `threshold`, ordered by subject.
    pub fn suspicious(&self, threshold: u32) -> Result<Vec<(SubjectId, u32)>> {
        let records = self.records.lock()?;

        let mut flagged: Vec<_> = records
            .iter()
            .filter(|(_, r)| r.consecutive_failures > threshold)
            .map(|(s, r)| (s.clone(), r.consecutive_failures))
            .collect();
        flagged.sort();

        Ok(flagged)
    }

    /// Drop records whose last attempt is at least `retention` old.
    ///
    /// Returns the number of records removed.
    pub fn evict_idle(&self, retention: Duration) -> Result<usize> {
        let now = self.clock.now_millis();
        let retention = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
        let mut records = self.records.lock()?;

        let before = records.len();
        records.retain(|_, r| now.saturating_sub(r.last_attempt_at) < retention);

        Ok(before - records.len())
    }

    /// The current record for a subject.
    pub fn record(&self, subject: &SubjectId) -> Result<Option<RateLimitRecord>> {
        Ok(self.records.lock()?.get(subject).copied())
    }

    /// Number of subjects currently tracked.
    pub fn tracked(&self) -> Result<usize> {
        Ok(self.records.lock()?.len())
    }
}

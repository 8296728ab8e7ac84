//! Time sources.
//!
//! Timestamps are Unix milliseconds; calendar dates are UTC. Every
//! component that needs "now" or "today" takes an `Arc<dyn Clock>` so
//! tests can move time explicitly.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// Current time in Unix milliseconds.
    fn now_millis(&self) -> i64;

    /// Current UTC calendar date.
    fn today(&self) -> NaiveDate {
        date_from_millis(self.now_millis())
    }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at the given Unix milliseconds.
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Create a clock frozen at noon UTC of the given date.
    pub fn at_date(date: NaiveDate) -> Self {
        Self::new(noon_millis(date))
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    /// Move the clock forward by whole days.
    pub fn advance_days(&self, days: i64) {
        self.millis
            .fetch_add(days * 86_400_000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Convert Unix milliseconds to a UTC calendar date.
///
/// Out-of-range values clamp to the earliest representable date, which
/// every expiry comparison treats as already past.
pub fn date_from_millis(millis: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.date_naive())
        .unwrap_or(NaiveDate::MIN)
}

fn noon_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(12, 0, 0)
        .map(|ndt| Utc.from_utc_datetime(&ndt).timestamp_millis())
        .unwrap_or_default()
}

//! Strong type definitions for Keygate.
//!
//! Subject identifiers are newtypes so they cannot be confused with tokens.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Storage format for expiry dates.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d";

/// The identity of a subject (an end user, or the administrator).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Create a new subject identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubjectId({})", self.0)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An expiry date exactly as persisted (`YYYY-MM-DD`).
///
/// Stored values are kept raw so a corrupt row never prevents the rest of
/// the snapshot from loading. Parsing happens at the point of use and a
/// parse failure is always treated as "not valid".
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredExpiry(String);

impl StoredExpiry {
    /// Format a date for storage.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(EXPIRY_FORMAT).to_string())
    }

    /// Wrap a raw stored value without validating it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw stored value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the stored value.
    pub fn date(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, EXPIRY_FORMAT)
            .map_err(|_| CoreError::CorruptExpiry(self.0.clone()))
    }

    /// Whether the expiry is strictly after `today`.
    pub fn is_after(&self, today: NaiveDate) -> Result<bool> {
        Ok(self.date()? > today)
    }
}

impl fmt::Debug for StoredExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoredExpiry({})", self.0)
    }
}

impl From<NaiveDate> for StoredExpiry {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

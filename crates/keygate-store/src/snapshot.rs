//! The entitlement snapshot: outstanding keys and grants, read and written together.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use keygate_core::{StoredExpiry, SubjectId};

/// Outstanding keys and grants at one version.
///
/// `version` is owned by the store. Commit closures may read it but any
/// change they make to it is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Version token; bumped by every successful write.
    pub version: u64,
    /// Token -> expiry of keys minted but not yet redeemed.
    pub outstanding_keys: BTreeMap<String, StoredExpiry>,
    /// Subject -> expiry of their entitlement.
    pub grants: BTreeMap<SubjectId, StoredExpiry>,
}

impl Snapshot {
    /// Whether `subject` holds a grant that is still active on `today`.
    ///
    /// A stored expiry that fails to parse counts as not entitled.
    pub fn is_entitled(&self, subject: &SubjectId, today: NaiveDate) -> bool {
        match self.grants.get(subject) {
            None => false,
            Some(expiry) => match expiry.is_after(today) {
                Ok(active) => active,
                Err(e) => {
                    tracing::warn!(subject = %subject, "unreadable grant expiry: {}", e);
                    false
                }
            },
        }
    }

    /// The parsed grant expiry for `subject`, if present and readable.
    pub fn grant_expiry(&self, subject: &SubjectId) -> Option<NaiveDate> {
        self.grants.get(subject).and_then(|e| e.date().ok())
    }
}

/// Decision returned by a commit closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<T> {
    /// Persist the modified snapshot, then return the value.
    Write(T),
    /// Leave the store untouched and return the value.
    Discard(T),
}

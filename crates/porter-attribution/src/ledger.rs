//! Deleted-invite ledger.
//!
//! Single-use invites disappear the moment they are consumed, usually before the join
//! notification arrives, so their counter never shows an increase. The ledger remembers recent
//! deletions so a join can still be matched to one. Entries stay visible for the retention
//! window; a claim only trusts the narrower claim window.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// How long a deletion stays visible.
pub const RETENTION_SECS: i64 = 30;
/// How recent a deletion must be to be claimed by a join.
pub const CLAIM_WINDOW_SECS: i64 = 10;

#[derive(Debug, Clone)]
pub struct DeletedInviteLedger {
    deleted_at: HashMap<String, DateTime<Utc>>,
    retention: Duration,
}

impl Default for DeletedInviteLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl DeletedInviteLedger {
    pub fn new() -> Self {
        Self::with_retention(Duration::seconds(RETENTION_SECS))
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            deleted_at: HashMap::new(),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Record that `code` was deleted at `now`. A later deletion of the same code wins.
    pub fn record_deletion(&mut self, code: &str, now: DateTime<Utc>) {
        self.purge_expired(now);
        self.deleted_at.insert(code.to_string(), now);
    }

    /// Consume the deletion entry for `code` if it is younger than `max_age`.
    ///
    /// Returns true at most once per recorded deletion. A stale entry is removed and yields
    /// false. `max_age` is capped at the retention window.
    pub fn try_claim(&mut self, code: &str, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.purge_expired(now);
        let max_age = max_age.min(self.retention);
        match self.deleted_at.remove(code) {
            Some(at) => now - at < max_age,
            None => false,
        }
    }

    /// Whether a deletion of `code` is still within the retention window.
    pub fn contains(&self, code: &str, now: DateTime<Utc>) -> bool {
        self.deleted_at
            .get(code)
            .is_some_and(|at| self.is_live(*at, now))
    }

    /// Drop entries older than the retention window. Returns how many were dropped.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.deleted_at.len();
        let retention = self.retention;
        self.deleted_at.retain(|_, at| now - *at < retention);
        before - self.deleted_at.len()
    }

    pub fn len(&self) -> usize {
        self.deleted_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deleted_at.is_empty()
    }

    fn is_live(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - at < self.retention
    }
}

//! Codes already handed to a join.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Invite codes recently attributed by a claim-bearing strategy.
///
/// The ledger guarantees a deletion is consumed once, but the weaker fallbacks (invite gone
/// from the list, only one pending account) have no entry to consume. Reserving the code here
/// keeps two concurrent joins from both walking away with it.
#[derive(Debug, Clone)]
pub struct ClaimRegistry {
    claimed_at: HashMap<String, DateTime<Utc>>,
    hold: Duration,
}

impl ClaimRegistry {
    pub fn new(hold: Duration) -> Self {
        Self {
            claimed_at: HashMap::new(),
            hold,
        }
    }

    /// Reserve `code`. Returns false if it is already held.
    pub fn reserve(&mut self, code: &str, now: DateTime<Utc>) -> bool {
        if self.is_reserved(code, now) {
            return false;
        }
        self.claimed_at.insert(code.to_string(), now);
        true
    }

    pub fn is_reserved(&self, code: &str, now: DateTime<Utc>) -> bool {
        self.claimed_at
            .get(code)
            .is_some_and(|at| now - *at < self.hold)
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.claimed_at.len();
        let hold = self.hold;
        self.claimed_at.retain(|_, at| now - *at < hold);
        before - self.claimed_at.len()
    }

    pub fn len(&self) -> usize {
        self.claimed_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed_at.is_empty()
    }
}

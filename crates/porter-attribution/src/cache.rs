//! Invite usage cache: last observed use count per invite code.

use porter_events::InviteUsage;
use std::collections::HashMap;

/// Last observed use count per invite code.
///
/// Counts only ever move up for a given entry: an incoming value lower than the cached one is
/// a stale read and is ignored.
#[derive(Debug, Default, Clone)]
pub struct InviteUsageCache {
    uses: HashMap<String, u64>,
}

impl InviteUsageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole cache with a fresh invite list.
    pub fn resync(&mut self, invites: &[InviteUsage]) {
        self.uses = invites
            .iter()
            .map(|invite| (invite.code.clone(), invite.uses))
            .collect();
    }

    /// Insert or raise the count for `code`.
    pub fn observe_created(&mut self, code: &str, uses: u64) {
        match self.uses.get_mut(code) {
            Some(existing) => *existing = (*existing).max(uses),
            None => {
                self.uses.insert(code.to_string(), uses);
            }
        }
    }

    /// Forget `code`. Returns whether it was cached.
    pub fn observe_deleted(&mut self, code: &str) -> bool {
        self.uses.remove(code).is_some()
    }

    /// Find the first invite whose count rose above the cached value, in the order given.
    ///
    /// Every scanned invite is folded back into the cache, so a counter increase is reported
    /// exactly once. Codes not yet cached count as 0.
    pub fn diff(&mut self, current: &[InviteUsage]) -> Option<String> {
        let mut increased = None;
        for invite in current {
            let cached = self.uses.get(&invite.code).copied().unwrap_or(0);
            if increased.is_none() && invite.uses > cached {
                increased = Some(invite.code.clone());
            }
            self.observe_created(&invite.code, invite.uses);
        }
        increased
    }

    pub fn uses(&self, code: &str) -> Option<u64> {
        self.uses.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.uses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uses.is_empty()
    }
}

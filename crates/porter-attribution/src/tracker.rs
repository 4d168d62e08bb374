//! Shared invite-tracking state.

use chrono::Duration;
use porter_events::InviteUsage;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::InviteUsageCache;
use crate::claims::ClaimRegistry;
use crate::clock::Clock;
use crate::ledger::{DeletedInviteLedger, RETENTION_SECS};

#[derive(Debug)]
struct TrackerState {
    cache: InviteUsageCache,
    ledger: DeletedInviteLedger,
    claims: ClaimRegistry,
    synced: bool,
}

/// Point-in-time sizes, for health output and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSnapshot {
    pub cached_invites: usize,
    pub recent_deletions: usize,
    pub held_claims: usize,
    pub synced: bool,
}

/// Owner of the usage cache, the deletion ledger and the claim registry.
///
/// Cloning is cheap; clones share state. Every method takes the lock for one short step and
/// releases it before returning, so no caller ever holds it across I/O.
#[derive(Debug, Clone)]
pub struct InviteTracker {
    state: Arc<Mutex<TrackerState>>,
    clock: Arc<dyn Clock>,
}

impl InviteTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_retention(clock, Duration::seconds(RETENTION_SECS))
    }

    pub fn with_retention(clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(TrackerState {
                cache: InviteUsageCache::new(),
                ledger: DeletedInviteLedger::with_retention(retention),
                claims: ClaimRegistry::new(retention),
                synced: false,
            })),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Replace the cache with the full invite list (startup or reconnect).
    pub async fn resync(&self, invites: &[InviteUsage]) {
        let mut state = self.state.lock().await;
        state.cache.resync(invites);
        state.synced = true;
        debug!(invites = invites.len(), "Invite cache resynchronized");
    }

    pub async fn observe_created(&self, code: &str, uses: u64) {
        self.state.lock().await.cache.observe_created(code, uses);
    }

    /// Move `code` from the cache to the ledger in one step.
    pub async fn observe_deleted(&self, code: &str) {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        state.cache.observe_deleted(code);
        state.ledger.record_deletion(code, now);
    }

    /// Diff a fresh invite list against the cache and fold it in.
    ///
    /// Before the first resync the cache holds no baseline, so the list becomes the baseline
    /// and no increase is reported.
    pub async fn diff(&self, current: &[InviteUsage]) -> Option<String> {
        let mut state = self.state.lock().await;
        if !state.synced {
            state.cache.resync(current);
            state.synced = true;
            debug!(invites = current.len(), "Invite cache seeded from a join-time fetch");
            return None;
        }
        state.cache.diff(current)
    }

    /// Claim the recorded deletion of `code` if it is younger than `window` and the code has
    /// not already been handed to another join.
    pub async fn claim_deletion(&self, code: &str, window: Duration) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        if state.claims.is_reserved(code, now) {
            return false;
        }
        if !state.ledger.try_claim(code, now, window) {
            return false;
        }
        state.claims.reserve(code, now)
    }

    /// Reserve `code` for a fallback attribution. Returns false if another join holds it.
    pub async fn reserve(&self, code: &str) -> bool {
        let now = self.clock.now();
        self.state.lock().await.claims.reserve(code, now)
    }

    /// Eagerly drop expired deletions and claims. Returns how many entries were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        state.ledger.purge_expired(now) + state.claims.purge_expired(now)
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        let state = self.state.lock().await;
        TrackerSnapshot {
            cached_invites: state.cache.len(),
            recent_deletions: state.ledger.len(),
            held_claims: state.claims.len(),
            synced: state.synced,
        }
    }

    pub async fn cached_uses(&self, code: &str) -> Option<u64> {
        self.state.lock().await.cache.uses(code)
    }
}

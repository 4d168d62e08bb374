//! Turns "someone joined" into "this invite, or unknown".

use chrono::Duration;
use porter_events::InviteSource;
use porter_storage::{AccountStore, PendingIdentity};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ledger::CLAIM_WINDOW_SECS;
use crate::tracker::InviteTracker;

/// Strength of the evidence behind an attribution, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Confidence {
    /// A usage counter went up.
    Diff,
    /// A pending account's invite was deleted, recently or at some point.
    DeletionMatch,
    /// Only one account was waiting.
    SoleCandidate,
    Unknown,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Diff => "diff",
            Confidence::DeletionMatch => "deletion_match",
            Confidence::SoleCandidate => "sole_candidate",
            Confidence::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pass produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    CounterDiff,
    LedgerClaim,
    /// The invite is missing from the live list but the ledger never saw it go.
    ExistenceGap,
    SoleCandidate,
    None,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CounterDiff => "counter_diff",
            Strategy::LedgerClaim => "ledger_claim",
            Strategy::ExistenceGap => "existence_gap",
            Strategy::SoleCandidate => "sole_candidate",
            Strategy::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributionResult {
    pub code: Option<String>,
    pub confidence: Confidence,
    pub strategy: Strategy,
}

impl AttributionResult {
    fn matched(code: String, confidence: Confidence, strategy: Strategy) -> Self {
        Self {
            code: Some(code),
            confidence,
            strategy,
        }
    }

    pub fn unknown() -> Self {
        Self {
            code: None,
            confidence: Confidence::Unknown,
            strategy: Strategy::None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.code.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Page size of the pending-identity query.
    pub pending_limit: u32,
    /// Deletions older than this are not claimed.
    pub claim_window: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            pending_limit: 10,
            claim_window: Duration::seconds(CLAIM_WINDOW_SECS),
        }
    }
}

/// Resolves one join at a time; any number of resolutions may run concurrently.
#[derive(Clone)]
pub struct AttributionResolver {
    tracker: InviteTracker,
    invites: Arc<dyn InviteSource>,
    accounts: Arc<dyn AccountStore>,
    settings: ResolverSettings,
}

impl AttributionResolver {
    pub fn new(
        tracker: InviteTracker,
        invites: Arc<dyn InviteSource>,
        accounts: Arc<dyn AccountStore>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            tracker,
            invites,
            accounts,
            settings,
        }
    }

    pub fn tracker(&self) -> &InviteTracker {
        &self.tracker
    }

    /// Account for a join that must not be attributed (e.g. a bot).
    ///
    /// Runs only the diff pass so the counter increase this join caused is folded into the
    /// cache and cannot be credited to a later join. Deletions and candidates are left alone.
    /// Returns the invite the join used, when the counters show it.
    pub async fn absorb(&self) -> Option<String> {
        match self.invites.fetch_current_invites().await {
            Ok(current) => {
                let code = self.tracker.diff(&current).await;
                debug!(code = ?code, "Absorbed unattributed join");
                code
            }
            Err(e) => {
                warn!(error = %e, "Invite list unavailable, counter increase left in place");
                None
            }
        }
    }

    /// Attribute the join that just happened.
    ///
    /// Passes, in order: counter diff, ledger claim, existence gap, sole candidate. Collaborator
    /// failures only disable the passes that need them; this never fails.
    pub async fn resolve(&self) -> AttributionResult {
        // Diff pass. Works for reusable invites whose counter moves without deletion.
        let current = match self.invites.fetch_current_invites().await {
            Ok(list) => Some(list),
            Err(e) => {
                warn!(error = %e, "Invite list unavailable, skipping diff pass");
                None
            }
        };

        if let Some(list) = &current {
            if let Some(code) = self.tracker.diff(list).await {
                info!(code = %code, "Join attributed by usage counter");
                return AttributionResult::matched(code, Confidence::Diff, Strategy::CounterDiff);
            }
        }

        let candidates = match self
            .accounts
            .query_pending_identities(self.settings.pending_limit)
            .await
        {
            Ok(pending) => pending.into_iter().filter(is_eligible).collect::<Vec<_>>(),
            Err(e) => {
                warn!(error = %e, "Pending identities unavailable, join stays unattributed");
                return AttributionResult::unknown();
            }
        };
        debug!(candidates = candidates.len(), "Loaded pending identities");

        // Deletion-match pass. Claims are destructive, so stop at the first one.
        for candidate in &candidates {
            if self
                .tracker
                .claim_deletion(&candidate.invite_code, self.settings.claim_window)
                .await
            {
                info!(code = %candidate.invite_code, "Join attributed by recent invite deletion");
                return AttributionResult::matched(
                    candidate.invite_code.clone(),
                    Confidence::DeletionMatch,
                    Strategy::LedgerClaim,
                );
            }
        }

        // Existence fallback. Catches deletions the ledger missed, e.g. right after a reconnect.
        if let Some(list) = &current {
            let live: HashSet<&str> = list.iter().map(|invite| invite.code.as_str()).collect();
            for candidate in &candidates {
                if live.contains(candidate.invite_code.as_str()) {
                    continue;
                }
                if self.tracker.reserve(&candidate.invite_code).await {
                    info!(code = %candidate.invite_code, "Join attributed by missing invite");
                    return AttributionResult::matched(
                        candidate.invite_code.clone(),
                        Confidence::DeletionMatch,
                        Strategy::ExistenceGap,
                    );
                }
            }
        }

        if let [only] = candidates.as_slice() {
            if self.tracker.reserve(&only.invite_code).await {
                info!(code = %only.invite_code, "Join attributed to the only pending account");
                return AttributionResult::matched(
                    only.invite_code.clone(),
                    Confidence::SoleCandidate,
                    Strategy::SoleCandidate,
                );
            }
        }

        info!(
            candidates = candidates.len(),
            "Join could not be attributed to an invite"
        );
        AttributionResult::unknown()
    }
}

fn is_eligible(candidate: &PendingIdentity) -> bool {
    candidate.subscription_active && !candidate.invite_code.is_empty()
}

//! Invite attribution engine.
//!
//! A "member joined" notification carries no invite code. This crate works out which invite
//! was most likely used, from three kinds of evidence gathered as events stream in:
//!
//! - usage counters that went up since the last look ([`InviteUsageCache`])
//! - invites that were deleted moments ago, which is what consuming a single-use invite looks
//!   like ([`DeletedInviteLedger`])
//! - accounts still waiting to be linked ([`porter_storage::AccountStore`])
//!
//! [`AttributionResolver`] combines them into one [`AttributionResult`] per join, strongest
//! evidence first. All mutable state lives in an [`InviteTracker`] that serializes access, so
//! concurrent joins never both win the same counter increase, deletion, or fallback.

mod cache;
mod claims;
mod clock;
mod ledger;
mod resolver;
mod tracker;

pub use cache::InviteUsageCache;
pub use claims::ClaimRegistry;
pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{DeletedInviteLedger, CLAIM_WINDOW_SECS, RETENTION_SECS};
pub use resolver::{AttributionResolver, AttributionResult, Confidence, ResolverSettings, Strategy};
pub use tracker::{InviteTracker, TrackerSnapshot};

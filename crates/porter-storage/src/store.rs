//! The AccountStore trait that backends implement.

use chrono::{DateTime, Utc};

use crate::types::*;
use crate::StoreError;

/// The storage trait the attribution engine and onboarding flow depend on.
///
/// The engine only reads through [`AccountStore::query_pending_identities`]; everything else is
/// used by onboarding and administration.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    // ───────────────────────────────────── Accounts ───────────────────────────────────────

    /// Create an account.
    async fn create_account(&self, params: &CreateAccountParams) -> Result<Account, StoreError>;

    /// Get account by ID.
    async fn get_account(&self, account_id: &AccountId) -> Result<Account, StoreError>;

    /// Update the subscription status of an account.
    async fn set_subscription_status(
        &self,
        account_id: &AccountId,
        status: SubscriptionStatus,
    ) -> Result<(), StoreError>;

    // ───────────────────────────────────── Identity linkage ───────────────────────────────

    /// List accounts awaiting linkage, most recently updated first.
    ///
    /// Only accounts with no external identity, an invite code, and an active subscription
    /// are returned.
    async fn query_pending_identities(
        &self,
        limit: u32,
    ) -> Result<Vec<PendingIdentity>, StoreError>;

    /// Find the account an invite code was issued to.
    async fn lookup_account_by_invite(&self, code: &str) -> Result<Option<Account>, StoreError>;

    /// Link an external identity to an account.
    ///
    /// Idempotent. The identity is detached from any other account first, so one member maps
    /// to at most one account.
    async fn link_identity(
        &self,
        account_id: &AccountId,
        member_id: &MemberId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Clear the external identity so the account can be matched again on a future rejoin.
    /// Returns whether any account was linked to the member.
    async fn unlink_identity(&self, member_id: &MemberId) -> Result<bool, StoreError>;
}

//! Onboarding: what happens to a member once their join has been attributed (or not).

use porter_attribution::{AttributionResolver, AttributionResult, Clock};
use porter_events::{GuildActions, TransportError};
use porter_storage::{Account, AccountId, AccountStore, MemberId, RoleId};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::OnboardingConfig;
use crate::metrics::{record_collaborator_error, ResolutionTimer};

/// Access granted to a member after joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTier {
    Full,
    Restricted,
}

impl AccessTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Full => "full",
            AccessTier::Restricted => "restricted",
        }
    }
}

/// Full access only for an attributed join whose account has an active subscription.
pub fn select_tier(result: &AttributionResult, account: Option<&Account>) -> AccessTier {
    match (result.is_known(), account) {
        (true, Some(account)) if account.subscription_status.is_active() => AccessTier::Full,
        _ => AccessTier::Restricted,
    }
}

/// What a handled join ended up as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub attribution: AttributionResult,
    pub account_id: Option<AccountId>,
    pub tier: AccessTier,
}

#[derive(Clone)]
pub struct OnboardingCoordinator {
    resolver: AttributionResolver,
    accounts: Arc<dyn AccountStore>,
    guild: Arc<dyn GuildActions>,
    clock: Arc<dyn Clock>,
    config: OnboardingConfig,
}

impl OnboardingCoordinator {
    pub fn new(
        resolver: AttributionResolver,
        accounts: Arc<dyn AccountStore>,
        guild: Arc<dyn GuildActions>,
        config: OnboardingConfig,
    ) -> Self {
        let clock = resolver.tracker().clock().clone();
        Self {
            resolver,
            accounts,
            guild,
            clock,
            config,
        }
    }

    pub fn resolver(&self) -> &AttributionResolver {
        &self.resolver
    }

    /// Attribute a join, link the account, grant a tier and greet the member.
    ///
    /// Bots only use up the counter increase they caused; they get no account, role or
    /// message. Every collaborator failure is logged and skipped; the member always
    /// ends up with at least the restricted tier.
    pub async fn handle_join(&self, member_id: MemberId, is_bot: bool) -> Option<JoinOutcome> {
        if is_bot {
            let code = self.resolver.absorb().await;
            info!(member = %member_id, code = code.as_deref().unwrap_or("-"), "Ignoring bot join");
            return None;
        }

        let timer = ResolutionTimer::start();
        let attribution = self.resolver.resolve().await;
        timer.finish(&attribution);

        let account = match &attribution.code {
            Some(code) => self.lookup_account(code).await,
            None => None,
        };

        if let Some(account) = &account {
            self.link(account, &member_id).await;
        }

        let tier = select_tier(&attribution, account.as_ref());
        self.grant(&member_id, tier).await;
        self.welcome(&member_id, tier).await;

        let account_id = account.map(|a| a.id);
        info!(
            member = %member_id,
            code = attribution.code.as_deref().unwrap_or("-"),
            confidence = %attribution.confidence,
            strategy = attribution.strategy.as_str(),
            account = ?account_id,
            tier = tier.as_str(),
            "Join handled"
        );

        Some(JoinOutcome {
            attribution,
            account_id,
            tier,
        })
    }

    /// Unlink the member so their account can be matched again if they come back.
    pub async fn handle_leave(&self, member_id: MemberId) {
        match self.accounts.unlink_identity(&member_id).await {
            Ok(true) => info!(member = %member_id, "Unlinked departed member"),
            Ok(false) => info!(member = %member_id, "Departed member had no linked account"),
            Err(e) => {
                record_collaborator_error("unlink_identity");
                warn!(member = %member_id, error = %e, "Failed to unlink departed member");
            }
        }
    }

    async fn lookup_account(&self, code: &str) -> Option<Account> {
        match self.accounts.lookup_account_by_invite(code).await {
            Ok(Some(account)) => Some(account),
            Ok(None) => {
                warn!(code = %code, "Attributed invite belongs to no account");
                None
            }
            Err(e) => {
                record_collaborator_error("lookup_account_by_invite");
                warn!(code = %code, error = %e, "Account lookup failed");
                None
            }
        }
    }

    async fn link(&self, account: &Account, member_id: &MemberId) {
        if let Err(e) = self
            .accounts
            .link_identity(&account.id, member_id, self.clock.now())
            .await
        {
            record_collaborator_error("link_identity");
            warn!(account = %account.id, member = %member_id, error = %e, "Failed to link identity");
        }
    }

    fn role_for(&self, tier: AccessTier) -> &RoleId {
        match tier {
            AccessTier::Full => &self.config.full_role,
            AccessTier::Restricted => &self.config.restricted_role,
        }
    }

    async fn grant(&self, member_id: &MemberId, tier: AccessTier) {
        let role = self.role_for(tier);
        if let Err(e) = self.guild.add_role(member_id, role).await {
            record_collaborator_error("add_role");
            warn!(member = %member_id, role = %role, error = %e, "Failed to grant role");
        }
    }

    async fn welcome(&self, member_id: &MemberId, tier: AccessTier) {
        let content = match tier {
            AccessTier::Full => &self.config.welcome_full,
            AccessTier::Restricted => &self.config.welcome_restricted,
        };
        match self.guild.send_direct_message(member_id, content).await {
            Ok(()) => {}
            Err(TransportError::SendSuppressed(reason)) => {
                info!(member = %member_id, reason = %reason, "Welcome message suppressed");
            }
            Err(e) => {
                record_collaborator_error("send_direct_message");
                warn!(member = %member_id, error = %e, "Failed to send welcome message");
            }
        }
    }
}

//! Common test helpers for dispatcher-driven tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use porter_attribution::{AttributionResolver, InviteTracker, ManualClock, ResolverSettings};
use porter_events::{GatewayEvent, GuildActions, InviteSource, InviteUsage, TransportError};
use porter_storage::*;
use porter_store_sqlite::SqliteStore;
use std::sync::{Arc, Mutex};

use crate::config::OnboardingConfig;
use crate::coordinator::OnboardingCoordinator;
use crate::dispatcher::Dispatcher;

pub const FULL_ROLE: RoleId = RoleId(111);
pub const RESTRICTED_ROLE: RoleId = RoleId(222);

/// Community platform double: serves a configurable invite list and records side effects.
#[derive(Default)]
pub struct FakeGuild {
    invites: Mutex<Vec<InviteUsage>>,
    invites_down: Mutex<bool>,
    dms_closed: Mutex<bool>,
    pub roles: Mutex<Vec<(MemberId, RoleId)>>,
    pub messages: Mutex<Vec<(MemberId, String)>>,
}

impl FakeGuild {
    pub fn set_invites(&self, invites: &[(&str, u64)]) {
        *self.invites.lock().unwrap() = invites
            .iter()
            .map(|(code, uses)| InviteUsage::new(*code, *uses))
            .collect();
    }

    pub fn set_invites_down(&self, down: bool) {
        *self.invites_down.lock().unwrap() = down;
    }

    pub fn close_dms(&self) {
        *self.dms_closed.lock().unwrap() = true;
    }

    pub fn roles_for(&self, member_id: MemberId) -> Vec<RoleId> {
        self.roles
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == member_id)
            .map(|(_, r)| *r)
            .collect()
    }
}

#[async_trait]
impl InviteSource for FakeGuild {
    async fn fetch_current_invites(&self) -> Result<Vec<InviteUsage>, TransportError> {
        tokio::task::yield_now().await;
        if *self.invites_down.lock().unwrap() {
            return Err(TransportError::Unavailable("gateway timeout".to_string()));
        }
        Ok(self.invites.lock().unwrap().clone())
    }
}

#[async_trait]
impl GuildActions for FakeGuild {
    async fn add_role(&self, member_id: &MemberId, role_id: &RoleId) -> Result<(), TransportError> {
        self.roles.lock().unwrap().push((*member_id, *role_id));
        Ok(())
    }

    async fn send_direct_message(
        &self,
        member_id: &MemberId,
        content: &str,
    ) -> Result<(), TransportError> {
        if *self.dms_closed.lock().unwrap() {
            return Err(TransportError::SendSuppressed(
                "cannot send messages to this user".to_string(),
            ));
        }
        self.messages
            .lock()
            .unwrap()
            .push((*member_id, content.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<SqliteStore>,
    pub guild: Arc<FakeGuild>,
    pub clock: ManualClock,
    pub tracker: InviteTracker,
    pub dispatcher: Dispatcher,
}

impl Harness {
    /// Apply an event and wait for any join/leave task it started.
    pub async fn deliver(&self, event: GatewayEvent) {
        if let Some(handle) = self.dispatcher.apply(event).await {
            handle.await.unwrap();
        }
    }

    pub async fn ready(&self, invites: &[(&str, u64)]) {
        self.deliver(GatewayEvent::Ready {
            invites: invites
                .iter()
                .map(|(code, uses)| InviteUsage::new(*code, *uses))
                .collect(),
        })
        .await;
    }

    pub async fn join(&self, member_id: u64) {
        self.deliver(GatewayEvent::MemberJoined {
            member_id: MemberId(member_id),
            is_bot: false,
        })
        .await;
    }

    pub async fn add_account(
        &self,
        email: &str,
        invite_code: &str,
        status: SubscriptionStatus,
    ) -> Account {
        self.store
            .create_account(&CreateAccountParams {
                email: email.to_string(),
                invite_code: Some(invite_code.to_string()),
                subscription_status: status,
            })
            .await
            .unwrap()
    }

    pub async fn account(&self, id: &AccountId) -> Account {
        self.store.get_account(id).await.unwrap()
    }
}

fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_750_000_000, 0).unwrap()
}

/// Test helper: dispatcher over in-memory SQLite and a fake platform
pub async fn create_harness() -> Harness {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let guild = Arc::new(FakeGuild::default());
    let clock = ManualClock::new(start_time());
    let tracker = InviteTracker::new(Arc::new(clock.clone()));

    let resolver = AttributionResolver::new(
        tracker.clone(),
        guild.clone(),
        store.clone(),
        ResolverSettings::default(),
    );
    let coordinator = OnboardingCoordinator::new(
        resolver,
        store.clone(),
        guild.clone(),
        OnboardingConfig::new(FULL_ROLE, RESTRICTED_ROLE),
    );

    Harness {
        store,
        guild,
        clock,
        tracker,
        dispatcher: Dispatcher::new(coordinator),
    }
}

//! Routes gateway events to the tracker and the onboarding coordinator.

use futures::StreamExt;
use porter_attribution::InviteTracker;
use porter_events::{EventStream, GatewayEvent};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::coordinator::OnboardingCoordinator;

pub struct Dispatcher {
    tracker: InviteTracker,
    coordinator: OnboardingCoordinator,
}

impl Dispatcher {
    pub fn new(coordinator: OnboardingCoordinator) -> Self {
        Self {
            tracker: coordinator.resolver().tracker().clone(),
            coordinator,
        }
    }

    /// Apply one event.
    ///
    /// Invite bookkeeping happens before this returns, so it is always applied in arrival order.
    /// Joins and leaves run on their own task; the handle is returned for callers that want to
    /// wait on it.
    pub async fn apply(&self, event: GatewayEvent) -> Option<JoinHandle<()>> {
        debug!(kind = event.kind(), "Gateway event");
        match event {
            GatewayEvent::Ready { invites } => {
                self.tracker.resync(&invites).await;
                info!(invites = invites.len(), "Invite cache synced");
                None
            }
            GatewayEvent::InviteCreated { code, uses } => {
                self.tracker.observe_created(&code, uses).await;
                None
            }
            GatewayEvent::InviteDeleted { code } => {
                self.tracker.observe_deleted(&code).await;
                None
            }
            GatewayEvent::MemberJoined { member_id, is_bot } => {
                let coordinator = self.coordinator.clone();
                Some(tokio::spawn(async move {
                    coordinator.handle_join(member_id, is_bot).await;
                }))
            }
            GatewayEvent::MemberLeft { member_id } => {
                let coordinator = self.coordinator.clone();
                Some(tokio::spawn(async move {
                    coordinator.handle_leave(member_id).await;
                }))
            }
        }
    }

    /// Consume events until the stream ends.
    pub async fn run(self, mut events: EventStream) {
        while let Some(event) = events.next().await {
            self.apply(event).await;
        }
        info!("Event stream closed, dispatcher stopping");
    }
}

/// Periodically drop expired deletion records and claim reservations.
pub fn spawn_purge(tracker: InviteTracker, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = tracker.purge_expired().await;
            if purged > 0 {
                debug!(purged, "Purged expired invite records");
            }
        }
    })
}

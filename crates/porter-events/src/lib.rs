//! Gateway contracts for porter.
//!
//! This crate defines what the attribution engine consumes from the community side:
//! - [`GatewayEvent`]: push notifications (ready, invite created/deleted, member joined/left)
//! - [`InviteSource`]: the live invite list with usage counters
//! - [`GuildActions`]: role grants and direct messages issued during onboarding
//! - [`EventBus`]: how gateway events reach the dispatcher

use async_trait::async_trait;
use futures::Stream;
use porter_storage::{MemberId, RoleId};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

/// Observed usage counter of one invite.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteUsage {
    pub code: String,
    pub uses: u64,
}

impl InviteUsage {
    pub fn new(code: impl Into<String>, uses: u64) -> Self {
        Self {
            code: code.into(),
            uses,
        }
    }
}

/// Notification pushed by the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// Connection (re)established; carries the full invite list.
    Ready { invites: Vec<InviteUsage> },
    InviteCreated { code: String, uses: u64 },
    /// Also sent when a single-use invite is consumed.
    InviteDeleted { code: String },
    MemberJoined {
        member_id: MemberId,
        #[serde(default)]
        is_bot: bool,
    },
    MemberLeft { member_id: MemberId },
}

impl GatewayEvent {
    /// Short name used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayEvent::Ready { .. } => "ready",
            GatewayEvent::InviteCreated { .. } => "invite_created",
            GatewayEvent::InviteDeleted { .. } => "invite_deleted",
            GatewayEvent::MemberJoined { .. } => "member_joined",
            GatewayEvent::MemberLeft { .. } => "member_left",
        }
    }
}

/// Errors talking to the community platform.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// A best-effort notification was refused (e.g. the member closed their inbox).
    #[error("send suppressed: {0}")]
    SendSuppressed(String),
}

/// Source of the live invite list.
#[async_trait]
pub trait InviteSource: Send + Sync {
    /// Fetch every current invite with its usage counter, in the platform's natural order.
    async fn fetch_current_invites(&self) -> Result<Vec<InviteUsage>, TransportError>;
}

/// Side effects performed on the community during onboarding.
#[async_trait]
pub trait GuildActions: Send + Sync {
    /// Grant a role to a member.
    async fn add_role(&self, member_id: &MemberId, role_id: &RoleId)
        -> Result<(), TransportError>;

    /// Send a direct message to a member.
    async fn send_direct_message(
        &self,
        member_id: &MemberId,
        content: &str,
    ) -> Result<(), TransportError>;
}

/// Error type for event bus operations
#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("backend error: {0}")]
    Backend(String),
}

/// Stream of gateway events
pub type EventStream = Pin<Box<dyn Stream<Item = GatewayEvent> + Send>>;

/// Event bus trait for publishing and subscribing to gateway events.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a gateway event to all subscribers.
    async fn publish(&self, event: GatewayEvent) -> Result<(), EventBusError>;

    /// Subscribe to gateway events.
    ///
    /// Returns a stream that yields events as they occur.
    /// The stream will continue until dropped or the bus is closed.
    async fn subscribe(&self) -> Result<EventStream, EventBusError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_joined_wire_format() {
        let json = r#"{"type":"member_joined","member_id":"80351110224678912","is_bot":false}"#;
        let event: GatewayEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            GatewayEvent::MemberJoined {
                member_id: MemberId(80351110224678912),
                is_bot: false,
            }
        );
    }

    #[test]
    fn test_is_bot_defaults_to_false() {
        let json = r#"{"type":"member_joined","member_id":"5"}"#;
        let event: GatewayEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, GatewayEvent::MemberJoined { is_bot: false, .. }));
    }

    #[test]
    fn test_ready_carries_invites() {
        let json = r#"{"type":"ready","invites":[{"code":"abc","uses":3},{"code":"xyz","uses":0}]}"#;
        let event: GatewayEvent = serde_json::from_str(json).unwrap();
        match event {
            GatewayEvent::Ready { invites } => {
                assert_eq!(invites, vec![InviteUsage::new("abc", 3), InviteUsage::new("xyz", 0)]);
            }
            other => panic!("Expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let json = r#"{"type":"voice_state_update"}"#;
        assert!(serde_json::from_str::<GatewayEvent>(json).is_err());
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(
            GatewayEvent::InviteDeleted {
                code: "a".to_string()
            }
            .kind(),
            "invite_deleted"
        );
        assert_eq!(
            GatewayEvent::MemberLeft {
                member_id: MemberId(1)
            }
            .kind(),
            "member_left"
        );
    }

    #[test]
    fn test_transport_error_display() {
        let error = TransportError::SendSuppressed("cannot send messages to this user".to_string());
        let display = error.to_string();
        assert!(display.contains("send suppressed"));
        assert!(display.contains("cannot send messages"));
    }

    #[test]
    fn test_event_bus_error_display() {
        let error = EventBusError::Backend("connection failed".to_string());
        let display = error.to_string();
        assert!(display.contains("backend error"));
        assert!(display.contains("connection failed"));
    }
}

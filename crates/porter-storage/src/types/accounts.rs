//! Account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, MemberId};

/// Subscription status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Never subscribed, or subscription ended
    Inactive,

    /// Trial period (no payment required yet)
    Trialing,

    /// Active subscription
    Active,

    /// Past due (payment failed)
    PastDue,

    /// Canceled
    Canceled,
}

impl SubscriptionStatus {
    /// Whether this status grants full access.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive => write!(f, "inactive"),
            Self::Trialing => write!(f, "trialing"),
            Self::Active => write!(f, "active"),
            Self::PastDue => write!(f, "past_due"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(Self::Inactive),
            "trialing" => Ok(Self::Trialing),
            "active" => Ok(Self::Active),
            "past_due" => Ok(Self::PastDue),
            "canceled" => Ok(Self::Canceled),
            _ => Err(format!("Unknown subscription status: {}", s)),
        }
    }
}

/// Account record
#[derive(Clone, Debug)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub invite_code: Option<String>, // Invite issued to this account at checkout
    pub external_id: Option<MemberId>, // None until a join is attributed
    pub subscription_status: SubscriptionStatus,
    pub linked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating an account
#[derive(Clone, Debug)]
pub struct CreateAccountParams {
    pub email: String,
    pub invite_code: Option<String>,
    pub subscription_status: SubscriptionStatus,
}

/// An account awaiting linkage to an external identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingIdentity {
    pub account_id: AccountId,
    pub invite_code: String,
    pub subscription_active: bool,
    pub last_updated: DateTime<Utc>,
}

//! Bot configuration.
//!
//! Supports configuration via environment variables:
//!
//! ```bash
//! # Required
//! PORTER_GUILD_ID=1234567890
//! PORTER_BOT_TOKEN=...
//! PORTER_FULL_ROLE_ID=111
//! PORTER_RESTRICTED_ROLE_ID=222
//!
//! # Optional
//! PORTER_API_BASE=https://discord.com/api/v10
//! PORTER_PENDING_LIMIT=10
//! PORTER_CLAIM_WINDOW_SECS=10
//! PORTER_RETENTION_SECS=30
//! PORTER_PURGE_INTERVAL_SECS=15
//! PORTER_HTTP_TIMEOUT_SECS=10
//! PORTER_WELCOME_FULL="Welcome! Your membership is linked."
//! PORTER_WELCOME_RESTRICTED="Welcome! We couldn't find your membership yet."
//! ```

use porter_storage::RoleId;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_WELCOME_FULL: &str =
    "Welcome aboard! Your membership is linked and you have full access.";
const DEFAULT_WELCOME_RESTRICTED: &str =
    "Welcome! We couldn't match your membership yet, so you have limited access for now. \
     Reply here if you think this is a mistake.";

/// Bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub guild: GuildConfig,
    pub attribution: AttributionConfig,
    pub onboarding: OnboardingConfig,
}

/// Where and how to reach the community platform
#[derive(Debug, Clone)]
pub struct GuildConfig {
    pub guild_id: u64,
    pub bot_token: String,
    pub api_base: String,
    pub http_timeout: Duration,
}

/// Attribution windows and paging
#[derive(Debug, Clone)]
pub struct AttributionConfig {
    pub pending_limit: u32,
    pub claim_window: Duration,
    pub retention: Duration,
    pub purge_interval: Duration,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            pending_limit: 10,
            claim_window: Duration::from_secs(10),
            retention: Duration::from_secs(30),
            purge_interval: Duration::from_secs(15),
        }
    }
}

/// Roles and welcome messages per access tier
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    pub full_role: RoleId,
    pub restricted_role: RoleId,
    pub welcome_full: String,
    pub welcome_restricted: String,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidNumber { name: String, value: String },

    #[error("Claim window ({claim_secs}s) must not exceed retention ({retention_secs}s)")]
    ClaimWindowExceedsRetention { claim_secs: u64, retention_secs: u64 },

    #[error("{0} must be greater than zero")]
    Zero(String),
}

fn required(name: &str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn required_number<T: std::str::FromStr>(name: &str) -> Result<T, ConfigError> {
    parse_number(name, &required(name)?)
}

fn optional_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(v) => parse_number(name, &v),
        Err(_) => Ok(default),
    }
}

fn nonzero_secs(name: &str, default: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = optional_number(name, default)?;
    if secs == 0 {
        return Err(ConfigError::Zero(name.to_string()));
    }
    Ok(Duration::from_secs(secs))
}

impl BotConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let guild = GuildConfig {
            guild_id: required_number("PORTER_GUILD_ID")?,
            bot_token: required("PORTER_BOT_TOKEN")?,
            api_base: env::var("PORTER_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            http_timeout: nonzero_secs("PORTER_HTTP_TIMEOUT_SECS", 10)?,
        };

        let attribution = AttributionConfig {
            pending_limit: optional_number("PORTER_PENDING_LIMIT", 10)?,
            claim_window: nonzero_secs("PORTER_CLAIM_WINDOW_SECS", 10)?,
            retention: nonzero_secs("PORTER_RETENTION_SECS", 30)?,
            purge_interval: nonzero_secs("PORTER_PURGE_INTERVAL_SECS", 15)?,
        };
        if attribution.claim_window > attribution.retention {
            return Err(ConfigError::ClaimWindowExceedsRetention {
                claim_secs: attribution.claim_window.as_secs(),
                retention_secs: attribution.retention.as_secs(),
            });
        }

        let onboarding = OnboardingConfig {
            full_role: RoleId(required_number("PORTER_FULL_ROLE_ID")?),
            restricted_role: RoleId(required_number("PORTER_RESTRICTED_ROLE_ID")?),
            welcome_full: env::var("PORTER_WELCOME_FULL")
                .unwrap_or_else(|_| DEFAULT_WELCOME_FULL.to_string()),
            welcome_restricted: env::var("PORTER_WELCOME_RESTRICTED")
                .unwrap_or_else(|_| DEFAULT_WELCOME_RESTRICTED.to_string()),
        };

        Ok(Self {
            guild,
            attribution,
            onboarding,
        })
    }
}

impl OnboardingConfig {
    /// Roles and messages with built-in welcome texts.
    pub fn new(full_role: RoleId, restricted_role: RoleId) -> Self {
        Self {
            full_role,
            restricted_role,
            welcome_full: DEFAULT_WELCOME_FULL.to_string(),
            welcome_restricted: DEFAULT_WELCOME_RESTRICTED.to_string(),
        }
    }
}

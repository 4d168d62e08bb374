//! Community platform REST client.
//!
//! Implements [`InviteSource`] and [`GuildActions`] against the platform's HTTP API. Every
//! request carries `Authorization: Bot <token>` and uses the configured timeout.

use async_trait::async_trait;
use porter_events::{GuildActions, InviteSource, InviteUsage, TransportError};
use porter_storage::{MemberId, RoleId};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::config::GuildConfig;

#[derive(Deserialize)]
struct InvitePayload {
    code: String,
    #[serde(default)]
    uses: u64,
}

#[derive(Deserialize)]
struct ChannelPayload {
    id: String,
}

#[derive(Clone)]
pub struct HttpGuild {
    client: Client,
    api_base: String,
    guild_id: u64,
    authorization: String,
}

impl HttpGuild {
    pub fn new(config: &GuildConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            guild_id: config.guild_id,
            authorization: format!("Bot {}", config.bot_token),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Turn a non-success response into a transport error.
    async fn check(response: Response, best_effort: bool) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify(status, body, best_effort))
    }

    async fn open_dm_channel(&self, member_id: &MemberId) -> Result<String, TransportError> {
        let response = self
            .client
            .post(self.url("/users/@me/channels"))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .json(&serde_json::json!({ "recipient_id": member_id.to_string() }))
            .send()
            .await
            .map_err(unavailable)?;
        let channel: ChannelPayload = Self::check(response, true)
            .await?
            .json()
            .await
            .map_err(unavailable)?;
        Ok(channel.id)
    }
}

fn unavailable(e: reqwest::Error) -> TransportError {
    TransportError::Unavailable(e.to_string())
}

/// Map an HTTP failure status to a transport error.
///
/// Refusals of best-effort sends (closed DMs, blocked bot) are reported as suppressed.
fn classify(status: StatusCode, body: String, best_effort: bool) -> TransportError {
    let detail = format!("{}: {}", status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN if best_effort => {
            TransportError::SendSuppressed(detail)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportError::PermissionDenied(detail),
        _ => TransportError::Unavailable(detail),
    }
}

#[async_trait]
impl InviteSource for HttpGuild {
    async fn fetch_current_invites(&self) -> Result<Vec<InviteUsage>, TransportError> {
        let response = self
            .client
            .get(self.url(&format!("/guilds/{}/invites", self.guild_id)))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(unavailable)?;
        let invites: Vec<InvitePayload> = Self::check(response, false)
            .await?
            .json()
            .await
            .map_err(unavailable)?;
        Ok(invites
            .into_iter()
            .map(|i| InviteUsage::new(i.code, i.uses))
            .collect())
    }
}

#[async_trait]
impl GuildActions for HttpGuild {
    async fn add_role(
        &self,
        member_id: &MemberId,
        role_id: &RoleId,
    ) -> Result<(), TransportError> {
        let path = format!(
            "/guilds/{}/members/{}/roles/{}",
            self.guild_id, member_id, role_id
        );
        let response = self
            .client
            .put(self.url(&path))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(unavailable)?;
        Self::check(response, false).await?;
        Ok(())
    }

    async fn send_direct_message(
        &self,
        member_id: &MemberId,
        content: &str,
    ) -> Result<(), TransportError> {
        let channel_id = self.open_dm_channel(member_id).await?;
        let response = self
            .client
            .post(self.url(&format!("/channels/{}/messages", channel_id)))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(unavailable)?;
        Self::check(response, true).await?;
        Ok(())
    }
}

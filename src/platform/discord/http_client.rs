use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::models::{ApiChannel, ApiGatewayBot, ApiGuildMember, ApiMessage, ApiRole, ApiUser};
use super::rate_limit::{LimitHeaders, RateLimiter, route_key};
use super::types::{API_BASE, MAX_MESSAGES_PER_PAGE};
use crate::error::PlatformError;
use crate::platform::AllowedMentions;

const MAX_RATE_LIMIT_RETRIES: u8 = 3;
const SECONDS_PER_DAY: u32 = 86_400;

/// Discord REST client. Requests are paced by a shared [`RateLimiter`].
pub struct DiscordHttpClient {
    client: reqwest::Client,
    bot_token: String,
    api_base: String,
    limiter: RateLimiter,
}

impl DiscordHttpClient {
    #[must_use]
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self::with_api_base(bot_token, API_BASE)
    }

    #[must_use]
    pub fn with_api_base(bot_token: impl Into<String>, api_base: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            bot_token: bot_token.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            limiter: RateLimiter::default(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    pub async fn get_current_user(&self) -> Result<ApiUser, PlatformError> {
        self.get_json(&self.url("/users/@me")).await
    }

    pub async fn get_gateway_bot(&self) -> Result<ApiGatewayBot, PlatformError> {
        self.get_json(&self.url("/gateway/bot")).await
    }

    pub async fn get_channel(&self, channel_id: u64) -> Result<ApiChannel, PlatformError> {
        self.get_json(&self.url(&format!("/channels/{channel_id}")))
            .await
    }

    pub async fn get_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<ApiMessage, PlatformError> {
        self.get_json(&self.url(&format!("/channels/{channel_id}/messages/{message_id}")))
            .await
    }

    /// One page of channel history, newest first, older than `before` when set.
    pub async fn get_messages(
        &self,
        channel_id: u64,
        limit: usize,
        before: Option<u64>,
    ) -> Result<Vec<ApiMessage>, PlatformError> {
        let limit = limit.clamp(1, MAX_MESSAGES_PER_PAGE);
        let mut path = format!("/channels/{channel_id}/messages?limit={limit}");
        if let Some(before) = before {
            path.push_str(&format!("&before={before}"));
        }
        self.get_json(&self.url(&path)).await
    }

    pub async fn get_member(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<ApiGuildMember, PlatformError> {
        self.get_json(&self.url(&format!("/guilds/{guild_id}/members/{user_id}")))
            .await
    }

    pub async fn get_roles(&self, guild_id: u64) -> Result<Vec<ApiRole>, PlatformError> {
        self.get_json(&self.url(&format!("/guilds/{guild_id}/roles")))
            .await
    }

    pub async fn create_message(
        &self,
        channel_id: u64,
        content: &str,
        reply_to: Option<u64>,
        mentions: &AllowedMentions,
    ) -> Result<ApiMessage, PlatformError> {
        let mut body = json!({
            "content": content,
            "allowed_mentions": allowed_mentions_json(mentions),
        });
        if let Some(message_id) = reply_to {
            body["message_reference"] = json!({
                "message_id": message_id.to_string(),
                "fail_if_not_exists": false,
            });
        }
        let response = self
            .request(
                Method::POST,
                &self.url(&format!("/channels/{channel_id}/messages")),
                Some(body),
            )
            .await?;
        decode(response).await
    }

    pub async fn delete_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<(), PlatformError> {
        self.request(
            Method::DELETE,
            &self.url(&format!("/channels/{channel_id}/messages/{message_id}")),
            None,
        )
        .await
        .map(|_| ())
    }

    pub async fn create_ban(
        &self,
        guild_id: u64,
        user_id: u64,
        delete_message_days: u8,
    ) -> Result<(), PlatformError> {
        let seconds = u32::from(delete_message_days) * SECONDS_PER_DAY;
        self.request(
            Method::PUT,
            &self.url(&format!("/guilds/{guild_id}/bans/{user_id}")),
            Some(json!({ "delete_message_seconds": seconds })),
        )
        .await
        .map(|_| ())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, PlatformError> {
        let response = self.request(Method::GET, url, None).await?;
        decode(response).await
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, PlatformError> {
        let route = route_key(url);
        let auth = format!("Bot {}", self.bot_token);

        for attempt in 0..=MAX_RATE_LIMIT_RETRIES {
            self.limiter.acquire(&route).await;

            let mut builder = self
                .client
                .request(method.clone(), url)
                .header(reqwest::header::AUTHORIZATION, &auth);
            if let Some(payload) = &body {
                builder = builder.json(payload);
            }
            let response = builder.send().await.map_err(|error| {
                PlatformError::Transport(format!("{method} {route}: {error}"))
            })?;

            let limits = LimitHeaders::read(response.headers());
            self.limiter.observe(&route, &limits).await;

            match response.status() {
                StatusCode::TOO_MANY_REQUESTS => {
                    if attempt == MAX_RATE_LIMIT_RETRIES {
                        break;
                    }
                    let wait = self.limiter.back_off(&route, &limits).await;
                    tracing::debug!(
                        %route,
                        attempt,
                        wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        global = limits.global,
                        "Discord: rate limited, retrying"
                    );
                }
                status if status.is_success() => return Ok(response),
                status => {
                    let text = response.text().await.unwrap_or_default();
                    tracing::debug!(
                        %route,
                        status = status.as_u16(),
                        body = %text,
                        "Discord: request failed"
                    );
                    return Err(PlatformError::from_status(status.as_u16(), text));
                }
            }
        }

        tracing::warn!(
            %route,
            retries = MAX_RATE_LIMIT_RETRIES,
            "Discord: giving up on rate-limited request"
        );
        Err(PlatformError::RateLimited {
            retries: MAX_RATE_LIMIT_RETRIES,
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, PlatformError> {
    response
        .json()
        .await
        .map_err(|error| PlatformError::Decode(error.to_string()))
}

/// Empty `parse` disables implicit pings; only listed ids may notify.
fn allowed_mentions_json(mentions: &AllowedMentions) -> serde_json::Value {
    let ids = |ids: &[u64]| ids.iter().map(u64::to_string).collect::<Vec<_>>();
    let mut value = json!({ "parse": [] });
    if !mentions.roles.is_empty() {
        value["roles"] = json!(ids(&mentions.roles));
    }
    if !mentions.users.is_empty() {
        value["users"] = json!(ids(&mentions.users));
    }
    value
}

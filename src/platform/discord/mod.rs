pub mod gateway;
pub mod http_client;
pub mod models;
mod rate_limit;
pub mod types;

use crate::config::DiscordConfig;
use crate::error::PlatformError;
use crate::platform::{
    AllowedMentions, ChannelKind, ChannelMessage, ChatPlatform, HistorySource, Member,
    snowflake_timestamp,
};
use crate::utils::truncate_to_chars;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};

use self::gateway::{DiscordGateway, DiscordGatewayState, GatewayEvent};
use self::http_client::DiscordHttpClient;
use self::types::{
    ACTIVITY_WATCHING, DEFAULT_INTENTS, DiscordChannelType, MAX_MESSAGE_LENGTH, MAX_MESSAGES_PER_PAGE,
};

/// Discord implementation of [`ChatPlatform`], plus the gateway listener
/// that feeds incoming guild messages to the report pipeline.
pub struct DiscordPlatform {
    http: Arc<DiscordHttpClient>,
    gateway_state: Arc<DiscordGatewayState>,
    config: DiscordConfig,
    bot_user_id: AtomicU64,
    guilds: std::sync::Mutex<HashSet<u64>>,
    guild_count: watch::Sender<usize>,
}

impl DiscordPlatform {
    pub fn new(config: DiscordConfig) -> Self {
        let http = DiscordHttpClient::new(&config.bot_token);
        Self::with_http(config, http)
    }

    pub fn with_http(config: DiscordConfig, http: DiscordHttpClient) -> Self {
        let (guild_count, _) = watch::channel(0);
        Self {
            http: Arc::new(http),
            gateway_state: Arc::new(DiscordGatewayState::default()),
            config,
            bot_user_id: AtomicU64::new(0),
            guilds: std::sync::Mutex::new(HashSet::new()),
            guild_count,
        }
    }

    /// Resolve the bot's own account so reports can be recognised before the
    /// first READY arrives.
    pub async fn identify(&self) -> Result<u64, PlatformError> {
        let user = self.http.get_current_user().await?;
        self.bot_user_id.store(user.id, Ordering::SeqCst);
        tracing::info!(user_id = user.id, name = %user.username, "Discord: authenticated");
        Ok(user.id)
    }

    pub fn active_guilds(&self) -> usize {
        self.guilds.lock().map_or(0, |guilds| guilds.len())
    }

    /// Follows the number of guilds the bot is in; changes on READY and
    /// guild joins or removals.
    pub fn subscribe_guild_count(&self) -> watch::Receiver<usize> {
        self.guild_count.subscribe()
    }

    fn intents(&self) -> u64 {
        self.config.intents.unwrap_or(DEFAULT_INTENTS)
    }

    fn build_presence(&self) -> Option<serde_json::Value> {
        let activity_name = self.config.activity_name.trim();
        if activity_name.is_empty() {
            return None;
        }

        Some(serde_json::json!({
            "status": "online",
            "activities": [{
                "name": activity_name,
                "type": ACTIVITY_WATCHING,
            }],
            "since": null,
            "afk": false,
        }))
    }

    fn matches_guild_filter(&self, guild_id: Option<u64>) -> bool {
        match self.config.guild_id {
            Some(gid) => guild_id == Some(gid),
            None => true,
        }
    }

    fn update_guilds(&self, apply: impl FnOnce(&mut HashSet<u64>)) {
        let count = match self.guilds.lock() {
            Ok(mut guilds) => {
                apply(&mut guilds);
                guilds.len()
            }
            Err(_) => return,
        };
        self.guild_count.send_replace(count);
    }

    /// Run one gateway session, forwarding guild messages to `tx`. Returns
    /// when the session ends; callers reconnect by calling it again.
    pub async fn listen(&self, tx: mpsc::Sender<ChannelMessage>) -> anyhow::Result<()> {
        let gateway = DiscordGateway::new(
            self.config.bot_token.clone(),
            self.intents(),
            Arc::clone(&self.gateway_state),
            self.build_presence(),
        );

        let (event_tx, mut event_rx) = mpsc::channel::<GatewayEvent>(100);

        let mut gateway_handle = {
            let http = Arc::clone(&self.http);
            tokio::spawn(async move { gateway.connect_and_listen(&http, &event_tx).await })
        };

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    if !self.handle_gateway_event(event, &tx).await {
                        gateway_handle.abort();
                        anyhow::bail!("report pipeline receiver closed");
                    }
                }
                result = &mut gateway_handle => {
                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => return Err(e),
                        Err(e) => anyhow::bail!("Discord gateway task panicked: {e}"),
                    }
                    break;
                }
            }
        }

        Ok(())
    }

    /// Returns `false` once the downstream receiver is gone.
    async fn handle_gateway_event(
        &self,
        event: GatewayEvent,
        tx: &mpsc::Sender<ChannelMessage>,
    ) -> bool {
        match event {
            GatewayEvent::Ready {
                user_id, guild_ids, ..
            } => {
                self.bot_user_id.store(user_id, Ordering::SeqCst);
                tracing::info!(
                    user_id,
                    guilds = guild_ids.len(),
                    "Discord: gateway ready"
                );
                self.update_guilds(|guilds| {
                    guilds.clear();
                    guilds.extend(guild_ids);
                });
            }
            GatewayEvent::GuildCreate { guild_id } => {
                self.update_guilds(|guilds| {
                    guilds.insert(guild_id);
                });
            }
            GatewayEvent::GuildDelete {
                guild_id,
                unavailable,
            } => {
                if !unavailable {
                    self.update_guilds(|guilds| {
                        guilds.remove(&guild_id);
                    });
                }
            }
            GatewayEvent::MessageCreate(message) => {
                if !self.matches_guild_filter(message.guild_id) {
                    return true;
                }
                if tx.send(message).await.is_err() {
                    return false;
                }
            }
        }
        true
    }
}

#[async_trait]
impl HistorySource for DiscordPlatform {
    fn max_page_size(&self) -> usize {
        MAX_MESSAGES_PER_PAGE
    }

    async fn page(
        &self,
        channel_id: u64,
        before: Option<u64>,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, PlatformError> {
        let page = self.http.get_messages(channel_id, limit, before).await?;
        Ok(page.into_iter().map(ChannelMessage::from).collect())
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    fn bot_user_id(&self) -> u64 {
        self.bot_user_id.load(Ordering::SeqCst)
    }

    async fn fetch_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<ChannelMessage, PlatformError> {
        self.http
            .get_message(channel_id, message_id)
            .await
            .map(ChannelMessage::from)
    }

    async fn fetch_member(&self, guild_id: u64, user_id: u64) -> Result<Member, PlatformError> {
        let member = self.http.get_member(guild_id, user_id).await?;
        let user = member
            .user
            .ok_or_else(|| PlatformError::Decode("guild member without user".into()))?;

        let role_names: HashMap<u64, String> = self
            .http
            .get_roles(guild_id)
            .await?
            .into_iter()
            .map(|role| (role.id, role.name))
            .collect();
        let roles = member
            .roles
            .iter()
            .filter_map(|id| role_names.get(id).cloned())
            .collect();

        let display_name = member
            .nick
            .clone()
            .or_else(|| user.global_name.clone())
            .unwrap_or_else(|| user.username.clone());

        Ok(Member {
            created_at: snowflake_timestamp(user.id),
            user: user.into(),
            display_name,
            joined_at: member.joined_at,
            roles,
        })
    }

    async fn channel_kind(&self, channel_id: u64) -> Result<ChannelKind, PlatformError> {
        let channel = self.http.get_channel(channel_id).await?;
        Ok(DiscordChannelType::from_u64(channel.kind).map_or(ChannelKind::Other, |t| t.kind()))
    }

    fn history_source(&self, kind: ChannelKind) -> Option<&dyn HistorySource> {
        kind.has_history().then_some(self as &dyn HistorySource)
    }

    async fn send_message(
        &self,
        channel_id: u64,
        content: &str,
        mentions: &AllowedMentions,
    ) -> Result<u64, PlatformError> {
        let content = truncate_to_chars(content, MAX_MESSAGE_LENGTH);
        self.http
            .create_message(channel_id, &content, None, mentions)
            .await
            .map(|sent| sent.id)
    }

    async fn reply(
        &self,
        channel_id: u64,
        message_id: u64,
        content: &str,
    ) -> Result<(), PlatformError> {
        let content = truncate_to_chars(content, MAX_MESSAGE_LENGTH);
        self.http
            .create_message(
                channel_id,
                &content,
                Some(message_id),
                &AllowedMentions::none(),
            )
            .await
            .map(|_| ())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError> {
        self.http.delete_message(channel_id, message_id).await
    }

    async fn ban_member(
        &self,
        guild_id: u64,
        user_id: u64,
        delete_message_days: u8,
    ) -> Result<(), PlatformError> {
        self.http
            .create_ban(guild_id, user_id, delete_message_days)
            .await
    }
}

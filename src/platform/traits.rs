use super::types::{AllowedMentions, ChannelKind, ChannelMessage, Member};
use crate::error::PlatformError;
use async_trait::async_trait;

/// Read access to a channel's message timeline, one page at a time.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Largest `limit` a single [`HistorySource::page`] call honours.
    fn max_page_size(&self) -> usize;

    /// Up to `limit` messages older than `before` (the newest ones when
    /// `None`), newest first. A page shorter than `limit` means the
    /// timeline is exhausted.
    async fn page(
        &self,
        channel_id: u64,
        before: Option<u64>,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, PlatformError>;
}

/// Chat platform capabilities the moderation pipeline depends on.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Account id of the bot itself.
    fn bot_user_id(&self) -> u64;

    async fn fetch_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<ChannelMessage, PlatformError>;

    async fn fetch_member(&self, guild_id: u64, user_id: u64) -> Result<Member, PlatformError>;

    async fn channel_kind(&self, channel_id: u64) -> Result<ChannelKind, PlatformError>;

    /// History capability for a channel of the given kind, if it has one.
    fn history_source(&self, kind: ChannelKind) -> Option<&dyn HistorySource>;

    /// Post a message and return its id. Only the listed mentions ping.
    async fn send_message(
        &self,
        channel_id: u64,
        content: &str,
        mentions: &AllowedMentions,
    ) -> Result<u64, PlatformError>;

    /// Reply to a message without pinging anyone.
    async fn reply(
        &self,
        channel_id: u64,
        message_id: u64,
        content: &str,
    ) -> Result<(), PlatformError>;

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError>;

    /// Ban a member, also removing `delete_message_days` of their messages.
    async fn ban_member(
        &self,
        guild_id: u64,
        user_id: u64,
        delete_message_days: u8,
    ) -> Result<(), PlatformError>;
}

use super::report::{HistoryItem, UserProfile};
use crate::error::{ContextError, PlatformError};
use crate::platform::{ChannelMessage, ChatPlatform, Member};
use std::sync::Arc;

/// Lower bound on how many channel messages are examined.
const MIN_SCAN: usize = 50;

/// Messages examined for a history limit: `max(5 * limit, 50)`.
pub fn scan_ceiling(history_limit: usize) -> usize {
    history_limit.saturating_mul(5).max(MIN_SCAN)
}

/// The reported member's recent messages, or a marker that the channel
/// has no readable timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum History {
    Available(Vec<HistoryItem>),
    Unavailable,
}

impl History {
    pub fn items(&self) -> &[HistoryItem] {
        match self {
            Self::Available(items) => items,
            Self::Unavailable => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedContext {
    pub profile: UserProfile,
    pub history: History,
}

/// Gathers the profile and recent messages of a reported member.
#[derive(Clone)]
pub struct ContextCollector {
    platform: Arc<dyn ChatPlatform>,
}

impl ContextCollector {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self { platform }
    }

    pub async fn collect(
        &self,
        guild_id: u64,
        user_id: u64,
        channel_id: u64,
        history_limit: usize,
    ) -> Result<CollectedContext, ContextError> {
        let member = self.platform.fetch_member(guild_id, user_id).await?;
        let history = self
            .history(guild_id, user_id, channel_id, history_limit)
            .await?;
        Ok(CollectedContext {
            profile: profile_from_member(member),
            history,
        })
    }

    async fn history(
        &self,
        guild_id: u64,
        user_id: u64,
        channel_id: u64,
        history_limit: usize,
    ) -> Result<History, ContextError> {
        let kind = self
            .platform
            .channel_kind(channel_id)
            .await
            .map_err(history_error)?;
        let Some(source) = self.platform.history_source(kind) else {
            tracing::debug!(channel_id, ?kind, "channel has no readable history");
            return Ok(History::Unavailable);
        };

        let ceiling = scan_ceiling(history_limit);
        let page_size = source.max_page_size().max(1);
        let mut items = Vec::with_capacity(history_limit);
        let mut scanned = 0;
        let mut before = None;

        // Newest first; stop at the ceiling or once enough matches are in.
        while scanned < ceiling && items.len() < history_limit {
            let requested = (ceiling - scanned).min(page_size);
            let page = source
                .page(channel_id, before, requested)
                .await
                .map_err(history_error)?;
            let exhausted = page.len() < requested;
            scanned += page.len();
            before = page.last().map(|message| message.id);

            items.extend(
                page.into_iter()
                    .filter(|message| message.author.id == user_id)
                    .take(history_limit - items.len())
                    .map(|message| history_item(message, guild_id)),
            );
            if exhausted || before.is_none() {
                break;
            }
        }

        tracing::debug!(channel_id, scanned, matched = items.len(), "history collected");
        Ok(History::Available(items))
    }
}

fn history_item(mut message: ChannelMessage, guild_id: u64) -> HistoryItem {
    message.guild_id.get_or_insert(guild_id);
    HistoryItem {
        message_id: message.id,
        url: message.permalink(),
        content: message.content,
        timestamp: message.timestamp,
    }
}

/// Only a permission denial on the timeline is a distinct condition; a
/// missing channel is a platform failure, not a missing member.
fn history_error(error: PlatformError) -> ContextError {
    match error {
        PlatformError::Forbidden => ContextError::Forbidden,
        other => ContextError::Platform(other),
    }
}

fn profile_from_member(member: Member) -> UserProfile {
    UserProfile {
        id: member.user.id,
        name: member.user.name,
        display_name: member.display_name,
        created_at: member.created_at,
        joined_at: member.joined_at,
        bot: member.user.bot,
        roles: member.roles,
    }
}

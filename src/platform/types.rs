use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Discord snowflakes count milliseconds from 2015-01-01T00:00:00Z.
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Creation time encoded in a snowflake id.
pub fn snowflake_timestamp(id: u64) -> DateTime<Utc> {
    let ms = i64::try_from(id >> 22).unwrap_or(0) + DISCORD_EPOCH_MS;
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// A message author or referenced account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
    pub name: String,
    pub bot: bool,
}

impl UserRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bot: false,
        }
    }
}

/// A message as seen by the moderation pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: u64,
    pub channel_id: u64,
    /// `None` for direct messages.
    pub guild_id: Option<u64>,
    pub author: UserRef,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// User ids mentioned in the content.
    pub mentions: Vec<u64>,
    /// Id of the message this one replies to.
    pub referenced_message_id: Option<u64>,
}

impl ChannelMessage {
    /// Stable jump link to this message.
    pub fn permalink(&self) -> String {
        let scope = self
            .guild_id
            .map_or_else(|| "@me".to_string(), |g| g.to_string());
        format!(
            "https://discord.com/channels/{scope}/{}/{}",
            self.channel_id, self.id
        )
    }

    pub fn mentions_user(&self, user_id: u64) -> bool {
        self.mentions.contains(&user_id)
    }
}

/// A resolved community member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user: UserRef,
    /// Server nickname, falling back to the account name.
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub joined_at: Option<DateTime<Utc>>,
    /// Role names, not ids.
    pub roles: Vec<String>,
}

/// Channel shapes that matter for history access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Thread,
    Voice,
    Forum,
    Category,
    Direct,
    Other,
}

impl ChannelKind {
    /// Whether the channel carries a readable message timeline.
    pub fn has_history(self) -> bool {
        matches!(self, Self::Text | Self::Thread | Self::Voice | Self::Direct)
    }
}

/// Mentions in an outgoing message that may notify anyone. The default
/// notifies nobody, so `@everyone` or a mention quoted from a report stays
/// inert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedMentions {
    pub roles: Vec<u64>,
    pub users: Vec<u64>,
}

impl AllowedMentions {
    pub fn none() -> Self {
        Self::default()
    }
}

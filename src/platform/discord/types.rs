//! Discord API constants and wire enums.

use crate::platform::ChannelKind;

/// Discord API base URL (v10).
pub const API_BASE: &str = "https://discord.com/api/v10";

/// Gateway intents needed to see report messages.
///
/// GUILDS (1) | `GUILD_MESSAGES` (512) | `MESSAGE_CONTENT` (32768) = 33281
pub const DEFAULT_INTENTS: u64 = intents::GUILDS | intents::GUILD_MESSAGES | intents::MESSAGE_CONTENT;

/// Used when Hello omits the interval (ms).
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 41250;

/// Discord maximum message length (characters).
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Largest page `GET /channels/{id}/messages` returns.
pub const MAX_MESSAGES_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GatewayOpcode {
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    Resume = 6,
    Reconnect = 7,
    InvalidSession = 9,
    Hello = 10,
    HeartbeatAck = 11,
}

impl GatewayOpcode {
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            6 => Some(Self::Resume),
            7 => Some(Self::Reconnect),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }
}

/// Discord channel types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DiscordChannelType {
    GuildText = 0,
    Dm = 1,
    GuildVoice = 2,
    GroupDm = 3,
    GuildCategory = 4,
    GuildAnnouncement = 5,
    AnnouncementThread = 10,
    PublicThread = 11,
    PrivateThread = 12,
    GuildStageVoice = 13,
    GuildForum = 15,
    GuildMedia = 16,
}

impl DiscordChannelType {
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::GuildText),
            1 => Some(Self::Dm),
            2 => Some(Self::GuildVoice),
            3 => Some(Self::GroupDm),
            4 => Some(Self::GuildCategory),
            5 => Some(Self::GuildAnnouncement),
            10 => Some(Self::AnnouncementThread),
            11 => Some(Self::PublicThread),
            12 => Some(Self::PrivateThread),
            13 => Some(Self::GuildStageVoice),
            15 => Some(Self::GuildForum),
            16 => Some(Self::GuildMedia),
            _ => None,
        }
    }

    pub fn kind(self) -> ChannelKind {
        match self {
            Self::GuildText | Self::GuildAnnouncement => ChannelKind::Text,
            Self::AnnouncementThread | Self::PublicThread | Self::PrivateThread => {
                ChannelKind::Thread
            }
            Self::GuildVoice | Self::GuildStageVoice => ChannelKind::Voice,
            Self::GuildForum | Self::GuildMedia => ChannelKind::Forum,
            Self::GuildCategory => ChannelKind::Category,
            Self::Dm | Self::GroupDm => ChannelKind::Direct,
        }
    }
}

/// Individual intent bit flags.
pub mod intents {
    pub const GUILDS: u64 = 1 << 0;
    pub const GUILD_MEMBERS: u64 = 1 << 1;
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    pub const MESSAGE_CONTENT: u64 = 1 << 15;
}

/// Presence activity type rendered as "Watching ...".
pub const ACTIVITY_WATCHING: u8 = 3;

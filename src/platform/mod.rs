pub mod discord;
pub mod traits;
pub mod types;

pub use traits::{ChatPlatform, HistorySource};
pub use types::{AllowedMentions, ChannelKind, ChannelMessage, Member, UserRef, snowflake_timestamp};

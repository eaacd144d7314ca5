//! REST and gateway payload shapes.

use crate::platform::{ChannelMessage, UserRef};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Snowflakes arrive as JSON strings; tests and some payloads use numbers.
pub(super) mod snowflake {
    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(u64),
    }

    fn convert<E: Error>(raw: Raw) -> Result<u64, E> {
        match raw {
            Raw::Num(n) => Ok(n),
            Raw::Str(s) => s
                .parse()
                .map_err(|_| E::custom(format!("invalid snowflake: {s}"))),
        }
    }

    pub fn de<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        convert(Raw::deserialize(deserializer)?)
    }

    pub fn de_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        Option::<Raw>::deserialize(deserializer)?
            .map(convert)
            .transpose()
    }

    pub fn de_vec<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u64>, D::Error> {
        Vec::<Raw>::deserialize(deserializer)?
            .into_iter()
            .map(convert)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    #[serde(deserialize_with = "snowflake::de")]
    pub id: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl From<ApiUser> for UserRef {
    fn from(user: ApiUser) -> Self {
        Self {
            id: user.id,
            name: user.username,
            bot: user.bot,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessageReference {
    #[serde(default, deserialize_with = "snowflake::de_opt")]
    pub message_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    #[serde(deserialize_with = "snowflake::de")]
    pub id: u64,
    #[serde(deserialize_with = "snowflake::de")]
    pub channel_id: u64,
    #[serde(default, deserialize_with = "snowflake::de_opt")]
    pub guild_id: Option<u64>,
    pub author: ApiUser,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub mentions: Vec<ApiUser>,
    #[serde(default)]
    pub message_reference: Option<ApiMessageReference>,
}

impl From<ApiMessage> for ChannelMessage {
    fn from(msg: ApiMessage) -> Self {
        Self {
            id: msg.id,
            channel_id: msg.channel_id,
            guild_id: msg.guild_id,
            author: msg.author.into(),
            content: msg.content,
            timestamp: msg.timestamp,
            mentions: msg.mentions.iter().map(|u| u.id).collect(),
            referenced_message_id: msg.message_reference.and_then(|r| r.message_id),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiGuildMember {
    #[serde(default)]
    pub user: Option<ApiUser>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default, deserialize_with = "snowflake::de_vec")]
    pub roles: Vec<u64>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRole {
    #[serde(deserialize_with = "snowflake::de")]
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiChannel {
    #[serde(deserialize_with = "snowflake::de")]
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiGatewayBot {
    pub url: String,
}

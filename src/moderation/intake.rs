use super::messages;
use crate::error::PlatformError;
use crate::platform::{ChannelMessage, ChatPlatform};

/// What to do with an incoming guild message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intake {
    /// Not addressed to the bot as a report.
    Ignore,
    /// Malformed report; the text is sent back to the reporter.
    Reject(&'static str),
    Accept(AcceptedReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedReport {
    pub guild_id: u64,
    /// The reporter's message mentioning the bot.
    pub report: ChannelMessage,
    /// The message being reported.
    pub reported: ChannelMessage,
    pub reason: String,
}

/// A report is a guild message that mentions the bot and replies to
/// another user's message.
pub async fn evaluate(platform: &dyn ChatPlatform, message: &ChannelMessage) -> Intake {
    let bot_id = platform.bot_user_id();
    if bot_id == 0 || message.author.id == bot_id {
        return Intake::Ignore;
    }
    let Some(guild_id) = message.guild_id else {
        return Intake::Ignore;
    };
    if !message.mentions_user(bot_id) {
        return Intake::Ignore;
    }

    let Some(reference_id) = message.referenced_message_id else {
        return Intake::Reject(messages::NOT_A_REPLY);
    };

    let mut reported = match platform
        .fetch_message(message.channel_id, reference_id)
        .await
    {
        Ok(reported) => reported,
        Err(PlatformError::NotFound) => return Intake::Reject(messages::REFERENCED_NOT_FOUND),
        Err(PlatformError::Forbidden) => return Intake::Reject(messages::REFERENCED_FORBIDDEN),
        Err(error) => {
            tracing::warn!(
                message_id = reference_id,
                %error,
                "fetching referenced message failed"
            );
            return Intake::Reject(messages::REFERENCED_FETCH_FAILED);
        }
    };
    reported.guild_id.get_or_insert(guild_id);

    if reported.author.id == bot_id {
        return Intake::Reject(messages::CANNOT_REPORT_BOT);
    }
    if reported.author.id == message.author.id {
        return Intake::Reject(messages::CANNOT_REPORT_SELF);
    }

    Intake::Accept(AcceptedReport {
        guild_id,
        reason: normalize_reason(&message.content, bot_id),
        report: message.clone(),
        reported,
    })
}

/// Strip the bot's `<@id>` / `<@!id>` mentions and fall back to a fixed
/// reason when nothing is left.
pub fn normalize_reason(content: &str, bot_id: u64) -> String {
    let stripped = content
        .replace(&format!("<@{bot_id}>"), "")
        .replace(&format!("<@!{bot_id}>"), "");
    let reason = stripped.trim();
    if reason.is_empty() {
        messages::DEFAULT_REPORT_REASON.to_string()
    } else {
        reason.to_string()
    }
}

//! Requester-facing replies. Kept short; internal error detail never
//! reaches chat.

use crate::utils::truncate_to_chars;

pub const NOT_A_REPLY: &str = "❌ Please report by **replying** to the message.\n\
     How: right-click the message → Reply → type `@bot this is spam`";
pub const REFERENCED_NOT_FOUND: &str = "❌ Could not find the referenced message.";
pub const REFERENCED_FORBIDDEN: &str = "❌ I don't have permission to read that message.";
pub const REFERENCED_FETCH_FAILED: &str = "❌ Failed to fetch the referenced message.";
pub const CANNOT_REPORT_BOT: &str = "❌ You can't report the bot's messages.";
pub const CANNOT_REPORT_SELF: &str = "❌ You can't report your own messages.";

pub const ACKNOWLEDGED: &str = "✅ Report received, processing...";

pub const MEMBER_NOT_FOUND: &str = "❌ Could not find the reported user.";
pub const CONTEXT_FORBIDDEN: &str = "❌ I don't have permission to look up the reported user.";
pub const CONTEXT_FAILED: &str = "❌ Failed to look up the reported user.";

pub const BAN_FAILED: &str = "❌ Ban failed, please check the bot's permissions.";
pub const NO_VIOLATION: &str = "✅ No violation found, thanks for the report.";

/// Used when the report carries no text besides the mention.
pub const DEFAULT_REPORT_REASON: &str = "no reason provided";

pub fn banned(member_mention: &str) -> String {
    format!("✅ Banned {member_mention}.")
}

/// Fields shown to reviewers on an escalation.
pub struct EscalationNotice<'a> {
    pub gm_role_id: u64,
    pub reported_mention: &'a str,
    pub reporter_mention: &'a str,
    pub message_url: &'a str,
    pub reason: &'a str,
    pub judge_reasoning: &'a str,
}

impl EscalationNotice<'_> {
    /// Render, capped at `max_chars`.
    pub fn render(&self, max_chars: usize) -> String {
        let text = format!(
            "<@&{}> A report needs manual review.\n\
             Reported user: {}\n\
             Reporter: {}\n\
             Reported message: {}\n\
             Report reason: {}\n\
             LLM reasoning: {}",
            self.gm_role_id,
            self.reported_mention,
            self.reporter_mention,
            self.message_url,
            self.reason,
            self.judge_reasoning,
        );
        truncate_to_chars(&text, max_chars)
    }
}

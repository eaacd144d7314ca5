use super::context::History;
use super::report::UserProfile;
use chrono::{DateTime, Utc};
use std::fmt::Write;

pub const SYSTEM_PROMPT: &str = "You are a moderation assistant for a Discord community. \
You review user reports and decide how each one should be handled. \
Reply with a single JSON object and nothing else. \
The object must contain exactly these keys: \
\"decision\" (one of \"BAN\", \"INVALID_REPORT\", \"NEED_GM\"), \
\"confidence\" (a number between 0 and 1) and \
\"reasoning\" (a short explanation).";

const RULES: &str = "\
Decide one of:
- BAN: the reported message clearly breaks the rules (spam, scams, phishing links, \
harassment, hate speech, explicit content) and the user's history supports it.
- INVALID_REPORT: the message is ordinary conversation and the report has no basis.
- NEED_GM: anything uncertain, borderline or needing human judgement.
When in doubt, choose NEED_GM.";

const OUTPUT_INSTRUCTION: &str = "\
Respond with JSON only, in this form:
{\"decision\": \"BAN|INVALID_REPORT|NEED_GM\", \"confidence\": 0.0, \"reasoning\": \"...\"}";

/// Everything the judge sees about one report.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub reported_message: &'a str,
    pub report_reason: &'a str,
    pub profile: &'a UserProfile,
    pub history: &'a History,
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn display_content(content: &str) -> &str {
    if content.trim().is_empty() {
        "(empty message)"
    } else {
        content
    }
}

impl PromptContext<'_> {
    /// Render the user prompt. Same context, same text.
    pub fn build_prompt(&self) -> String {
        let profile = self.profile;
        let mut out = String::new();

        out.push_str("## Reported message\n");
        let _ = writeln!(out, "{}\n", display_content(self.reported_message));

        out.push_str("## Report reason\n");
        let _ = writeln!(out, "{}\n", self.report_reason);

        out.push_str("## Reported user\n");
        let _ = writeln!(out, "- ID: {}", profile.id);
        let _ = writeln!(out, "- Name: {} ({})", profile.display_name, profile.name);
        let _ = writeln!(out, "- Account created: {}", format_time(profile.created_at));
        let _ = writeln!(
            out,
            "- Joined server: {}",
            profile.joined_at.map_or_else(|| "unknown".to_string(), format_time)
        );
        let _ = writeln!(out, "- Bot: {}", if profile.bot { "yes" } else { "no" });
        let roles = if profile.roles.is_empty() {
            "(no roles)".to_string()
        } else {
            profile.roles.join(", ")
        };
        let _ = writeln!(out, "- Roles: {roles}\n");

        out.push_str("## Recent messages from this user\n");
        match self.history {
            History::Unavailable => out.push_str("(history unavailable)\n"),
            History::Available(items) if items.is_empty() => out.push_str("(no history)\n"),
            History::Available(items) => {
                for item in items {
                    let _ = writeln!(
                        out,
                        "- [{}] {}",
                        format_time(item.timestamp),
                        display_content(&item.content)
                    );
                }
            }
        }
        out.push('\n');

        out.push_str("## Rules\n");
        out.push_str(RULES);
        out.push_str("\n\n");
        out.push_str(OUTPUT_INSTRUCTION);
        out
    }
}

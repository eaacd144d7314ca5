use super::Config;
use std::path::PathBuf;

/// First non-empty value among `keys`.
fn env_first(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).is_ok_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Some(token) = env_first(&["LLM_GUARD_DISCORD_TOKEN", "DISCORD_TOKEN"]) {
            self.discord.bot_token = token;
        }

        if let Some(role) = env_first(&["LLM_GUARD_GM_ROLE_ID", "DISCORD_GM_ROLE_ID"])
            && let Ok(role_id) = role.trim().parse::<u64>()
        {
            self.discord.gm_role_id = role_id;
        }

        if let Some(key) = env_first(&["LLM_GUARD_LLM_API_KEY", "LLM_API_KEY"]) {
            self.llm.api_key = Some(key);
        }

        if let Some(base_url) = env_first(&["LLM_GUARD_LLM_BASE_URL", "LLM_BASE_URL"]) {
            self.llm.base_url = base_url;
        }

        if let Some(model) = env_first(&["LLM_GUARD_LLM_MODEL", "LLM_MODEL"]) {
            self.llm.model = model;
        }

        if env_flag("LLM_DEBUG_RAW") {
            self.llm.debug_raw = true;
        }

        if let Some(path) = env_first(&["LLM_GUARD_DATABASE_PATH"]) {
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(limit) = env_first(&["LLM_GUARD_HISTORY_LIMIT", "HISTORY_MESSAGE_LIMIT"])
            && let Ok(limit) = limit.trim().parse::<usize>()
            && limit > 0
        {
            self.moderation.history_message_limit = limit;
        }

        if let Some(days) = env_first(&["LLM_GUARD_BAN_DELETE_DAYS", "BAN_DELETE_DAYS"])
            && let Ok(days) = days.trim().parse::<u8>()
        {
            self.moderation.ban_delete_days = days;
        }
    }
}

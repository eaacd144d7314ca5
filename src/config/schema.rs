use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub moderation: ModerationConfig,

    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let guard_dir = home.join(".llm-guard");

        Self {
            workspace_dir: guard_dir.join("workspace"),
            config_path: guard_dir.join("config.toml"),
            discord: DiscordConfig::default(),
            llm: LlmConfig::default(),
            database: DatabaseConfig::default(),
            moderation: ModerationConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

impl Config {
    /// SQLite file holding the report log and the liveness row.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| self.workspace_dir.join("data").join("guard.db"))
    }

    /// Reject configurations the bot cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discord.bot_token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "discord.bot_token is not set (config.toml or DISCORD_TOKEN)".into(),
            ));
        }
        if self.discord.gm_role_id == 0 {
            return Err(ConfigError::Validation(
                "discord.gm_role_id is not set (config.toml or DISCORD_GM_ROLE_ID)".into(),
            ));
        }
        if self.llm.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "llm.api_key is not set (config.toml or LLM_API_KEY)".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Validation(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.moderation.history_message_limit == 0 {
            return Err(ConfigError::Validation(
                "moderation.history_message_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ── Discord ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Reviewer role mentioned on escalations.
    #[serde(default)]
    pub gm_role_id: u64,
    /// Only handle reports from this guild when set.
    #[serde(default)]
    pub guild_id: Option<u64>,
    #[serde(default)]
    pub intents: Option<u64>,
    #[serde(default = "default_activity_name")]
    pub activity_name: String,
}

fn default_activity_name() -> String {
    "reports | @me".into()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            gm_role_id: 0,
            guild_id: None,
            intents: None,
            activity_name: default_activity_name(),
        }
    }
}

// ── LLM judge ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f64,
    /// Per-request timeout; expiry counts as a failed call.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    /// Log raw model output at debug level.
    #[serde(default)]
    pub debug_raw: bool,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_llm_model() -> String {
    "gpt-4o".into()
}

fn default_llm_temperature() -> f64 {
    0.2
}

fn default_llm_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            timeout_secs: default_llm_timeout_secs(),
            debug_raw: false,
        }
    }
}

// ── Database ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Defaults to `<workspace>/data/guard.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ── Moderation ───────────────────────────────────────────────────

/// Discord refuses ban message purges longer than a week.
pub const MAX_BAN_DELETE_DAYS: u8 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    #[serde(default = "default_history_message_limit")]
    pub history_message_limit: usize,
    #[serde(default = "default_ban_delete_days")]
    pub ban_delete_days: u8,
    /// Upper bound for the escalation notice body.
    #[serde(default = "default_escalation_max_chars")]
    pub escalation_max_chars: usize,
    /// Delete the collected recent messages before banning.
    #[serde(default = "default_true")]
    pub purge_recent_messages: bool,
}

fn default_history_message_limit() -> usize {
    10
}

fn default_ban_delete_days() -> u8 {
    7
}

fn default_escalation_max_chars() -> usize {
    1900
}

fn default_true() -> bool {
    true
}

impl ModerationConfig {
    pub fn effective_ban_delete_days(&self) -> u8 {
        self.ban_delete_days.min(MAX_BAN_DELETE_DAYS)
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            history_message_limit: default_history_message_limit(),
            ban_delete_days: default_ban_delete_days(),
            escalation_max_chars: default_escalation_max_chars(),
            purge_recent_messages: true,
        }
    }
}

// ── Heartbeat ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub interval_secs: u64,
    /// The bot counts as online while its last heartbeat is younger than this.
    #[serde(default = "default_online_ttl_secs")]
    pub online_ttl_secs: u64,
}

fn default_heartbeat_interval_secs() -> u64 {
    60
}

fn default_online_ttl_secs() -> u64 {
    120
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_heartbeat_interval_secs(),
            online_ttl_secs: default_online_ttl_secs(),
        }
    }
}

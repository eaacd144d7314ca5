#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use llm_guard::config::Config;
use llm_guard::error::PlatformError;
use llm_guard::llm::{CompletionRequest, Provider, ResponseFormat};
use llm_guard::platform::{
    AllowedMentions, ChannelKind, ChannelMessage, ChatPlatform, HistorySource, Member, UserRef,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GUILD: u64 = 1;
pub const CHANNEL: u64 = 2;
pub const BOT: u64 = 777;
pub const REPORTER: u64 = 5;
pub const REPORTED: u64 = 6;
pub const REPORTED_MSG: u64 = 300;
pub const REPORT_MSG: u64 = 400;
pub const GM_ROLE: u64 = 42;

/// A side effect requested from the fake platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Reply {
        channel_id: u64,
        message_id: u64,
        content: String,
    },
    Send {
        channel_id: u64,
        content: String,
        mentions: AllowedMentions,
    },
    Delete {
        channel_id: u64,
        message_id: u64,
    },
    Ban {
        guild_id: u64,
        user_id: u64,
        delete_message_days: u8,
    },
}

pub fn user(id: u64, name: &str) -> UserRef {
    UserRef::new(id, name)
}

pub fn message(id: u64, author: UserRef, content: &str) -> ChannelMessage {
    ChannelMessage {
        id,
        channel_id: CHANNEL,
        guild_id: Some(GUILD),
        author,
        content: content.to_string(),
        timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        mentions: Vec::new(),
        referenced_message_id: None,
    }
}

/// `@bot <reason>` sent as a reply to the reported message.
pub fn report_message(reason: &str) -> ChannelMessage {
    let mut report = message(
        REPORT_MSG,
        user(REPORTER, "alice"),
        &format!("<@{BOT}> {reason}"),
    );
    report.mentions = vec![BOT];
    report.referenced_message_id = Some(REPORTED_MSG);
    report
}

pub fn reported_message() -> ChannelMessage {
    message(REPORTED_MSG, user(REPORTED, "mallory"), "free nitro at totally-legit.example")
}

pub fn member(id: u64, name: &str) -> Member {
    Member {
        user: user(id, name),
        display_name: name.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 12, 30, 0, 0, 0).unwrap(),
        joined_at: Some(Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap()),
        roles: Vec::new(),
    }
}

/// In-memory platform with scripted lookups and recorded side effects.
pub struct FakePlatform {
    bot_id: u64,
    messages: HashMap<u64, Result<ChannelMessage, PlatformError>>,
    members: HashMap<u64, Member>,
    member_error: Option<PlatformError>,
    channel_kind: ChannelKind,
    /// Newest first.
    history: Vec<ChannelMessage>,
    history_error: Option<PlatformError>,
    page_size: usize,
    fail_send: Option<PlatformError>,
    fail_reply: Option<PlatformError>,
    fail_ban: Option<PlatformError>,
    fail_delete: Option<PlatformError>,
    calls: Mutex<Vec<Call>>,
    /// `(before, limit)` of every history page requested.
    page_requests: Mutex<Vec<(Option<u64>, usize)>>,
}

impl FakePlatform {
    /// A guild with the reporter, the reported member and the reported
    /// message already in place.
    pub fn new() -> Self {
        let mut platform = Self {
            bot_id: BOT,
            messages: HashMap::new(),
            members: HashMap::new(),
            member_error: None,
            channel_kind: ChannelKind::Text,
            history: Vec::new(),
            history_error: None,
            page_size: 100,
            fail_send: None,
            fail_reply: None,
            fail_ban: None,
            fail_delete: None,
            calls: Mutex::new(Vec::new()),
            page_requests: Mutex::new(Vec::new()),
        };
        platform
            .messages
            .insert(REPORTED_MSG, Ok(reported_message()));
        platform.members.insert(REPORTER, member(REPORTER, "alice"));
        platform.members.insert(REPORTED, member(REPORTED, "mallory"));
        platform
    }

    pub fn with_message(mut self, id: u64, result: Result<ChannelMessage, PlatformError>) -> Self {
        self.messages.insert(id, result);
        self
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.insert(member.user.id, member);
        self
    }

    pub fn without_member(mut self, id: u64) -> Self {
        self.members.remove(&id);
        self
    }

    pub fn with_member_error(mut self, error: PlatformError) -> Self {
        self.member_error = Some(error);
        self
    }

    pub fn with_channel_kind(mut self, kind: ChannelKind) -> Self {
        self.channel_kind = kind;
        self
    }

    pub fn with_history(mut self, history: Vec<ChannelMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_history_error(mut self, error: PlatformError) -> Self {
        self.history_error = Some(error);
        self
    }

    pub fn failing_send(mut self, error: PlatformError) -> Self {
        self.fail_send = Some(error);
        self
    }

    pub fn failing_reply(mut self, error: PlatformError) -> Self {
        self.fail_reply = Some(error);
        self
    }

    pub fn failing_ban(mut self, error: PlatformError) -> Self {
        self.fail_ban = Some(error);
        self
    }

    pub fn failing_delete(mut self, error: PlatformError) -> Self {
        self.fail_delete = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Reply { content, .. } => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn sent(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send { content, .. } => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn page_requests(&self) -> Vec<(Option<u64>, usize)> {
        self.page_requests.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl HistorySource for FakePlatform {
    fn max_page_size(&self) -> usize {
        self.page_size
    }

    async fn page(
        &self,
        _channel_id: u64,
        before: Option<u64>,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, PlatformError> {
        self.page_requests.lock().unwrap().push((before, limit));
        if let Some(error) = &self.history_error {
            return Err(error.clone());
        }
        let start = match before {
            None => 0,
            Some(id) => self
                .history
                .iter()
                .position(|m| m.id == id)
                .map_or(self.history.len(), |i| i + 1),
        };
        Ok(self
            .history
            .iter()
            .skip(start)
            .take(limit.min(self.page_size))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    fn bot_user_id(&self) -> u64 {
        self.bot_id
    }

    async fn fetch_message(
        &self,
        _channel_id: u64,
        message_id: u64,
    ) -> Result<ChannelMessage, PlatformError> {
        self.messages
            .get(&message_id)
            .cloned()
            .unwrap_or(Err(PlatformError::NotFound))
    }

    async fn fetch_member(&self, _guild_id: u64, user_id: u64) -> Result<Member, PlatformError> {
        if let Some(error) = &self.member_error {
            return Err(error.clone());
        }
        self.members
            .get(&user_id)
            .cloned()
            .ok_or(PlatformError::NotFound)
    }

    async fn channel_kind(&self, _channel_id: u64) -> Result<ChannelKind, PlatformError> {
        Ok(self.channel_kind)
    }

    fn history_source(&self, kind: ChannelKind) -> Option<&dyn HistorySource> {
        kind.has_history().then_some(self as &dyn HistorySource)
    }

    async fn send_message(
        &self,
        channel_id: u64,
        content: &str,
        mentions: &AllowedMentions,
    ) -> Result<u64, PlatformError> {
        self.record(Call::Send {
            channel_id,
            content: content.to_string(),
            mentions: mentions.clone(),
        });
        match &self.fail_send {
            Some(error) => Err(error.clone()),
            None => Ok(9_000),
        }
    }

    async fn reply(
        &self,
        channel_id: u64,
        message_id: u64,
        content: &str,
    ) -> Result<(), PlatformError> {
        self.record(Call::Reply {
            channel_id,
            message_id,
            content: content.to_string(),
        });
        match &self.fail_reply {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError> {
        self.record(Call::Delete {
            channel_id,
            message_id,
        });
        match &self.fail_delete {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn ban_member(
        &self,
        guild_id: u64,
        user_id: u64,
        delete_message_days: u8,
    ) -> Result<(), PlatformError> {
        self.record(Call::Ban {
            guild_id,
            user_id,
            delete_message_days,
        });
        match &self.fail_ban {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Replays canned judge replies; `Err` entries simulate failed calls.
pub struct ScriptedProvider {
    replies: Mutex<Vec<Result<String, String>>>,
    formats: Mutex<Vec<ResponseFormat>>,
    delay: Duration,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
        let mut replies: Vec<Result<String, String>> = replies
            .into_iter()
            .map(|reply| reply.map(str::to_string).map_err(str::to_string))
            .collect();
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            formats: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Every reply arrives after `delay`, like a slow model.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn formats(&self) -> Vec<ResponseFormat> {
        self.formats.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> anyhow::Result<String> {
        self.formats.lock().unwrap().push(request.response_format);
        let reply = self.replies.lock().unwrap().pop();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match reply {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no scripted reply left")),
        }
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.discord.bot_token = "token".into();
    config.discord.gm_role_id = GM_ROLE;
    config.llm.api_key = Some("sk-test".into());
    config.moderation.history_message_limit = 3;
    config
}

pub async fn orchestrator(
    platform: Arc<FakePlatform>,
    provider: Arc<ScriptedProvider>,
) -> (llm_guard::moderation::Orchestrator, llm_guard::audit::AuditStore) {
    let store = llm_guard::audit::AuditStore::in_memory().await.unwrap();
    let orchestrator = llm_guard::moderation::Orchestrator::new(
        &test_config(),
        platform,
        provider,
        store.clone(),
    );
    (orchestrator, store)
}

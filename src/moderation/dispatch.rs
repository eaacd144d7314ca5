use super::messages::{self, EscalationNotice};
use super::report::{ActionOutcome, Decision, Transition, Verdict};
use crate::audit::AuditStore;
use crate::config::{DiscordConfig, ModerationConfig};
use crate::error::DispatchError;
use crate::platform::{AllowedMentions, ChatPlatform};
use std::sync::Arc;
use uuid::Uuid;

/// Where and against whom a verdict is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTarget {
    /// `None` when the report row could not be created.
    pub report_id: Option<Uuid>,
    pub guild_id: u64,
    pub channel_id: u64,
    /// The reporter's message; outcome notices reply to it.
    pub report_message_id: u64,
    pub reporter_id: u64,
    pub reported_user_id: u64,
    pub reported_message_id: u64,
    pub reported_message_url: String,
    pub report_reason: String,
    /// Ids of the reported user's recent messages in `channel_id`.
    pub recent_message_ids: Vec<u64>,
}

/// Applies a verdict and records the outcome on the report.
pub struct ActionDispatcher {
    platform: Arc<dyn ChatPlatform>,
    audit: AuditStore,
    gm_role_id: u64,
    ban_delete_days: u8,
    escalation_max_chars: usize,
    purge_recent: bool,
}

impl ActionDispatcher {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        audit: AuditStore,
        discord: &DiscordConfig,
        moderation: &ModerationConfig,
    ) -> Self {
        Self {
            platform,
            audit,
            gm_role_id: discord.gm_role_id,
            ban_delete_days: moderation.effective_ban_delete_days(),
            escalation_max_chars: moderation.escalation_max_chars,
            purge_recent: moderation.purge_recent_messages,
        }
    }

    /// Only an undelivered escalation is an error; every other failure is
    /// folded into the returned outcome.
    pub async fn dispatch(
        &self,
        decision: &Decision,
        target: &DispatchTarget,
    ) -> Result<ActionOutcome, DispatchError> {
        let outcome = match decision.verdict {
            Verdict::Ban => self.ban(target).await,
            Verdict::InvalidReport => self.dismiss(target).await,
            Verdict::NeedGm => match self.escalate(decision, target).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    let outcome = ActionOutcome::failed(Verdict::NeedGm, error.to_string());
                    self.record(target, &outcome).await;
                    return Err(DispatchError::EscalationUndelivered(error));
                }
            },
        };
        self.record(target, &outcome).await;
        Ok(outcome)
    }

    async fn ban(&self, target: &DispatchTarget) -> ActionOutcome {
        if self.purge_recent {
            self.purge(target).await;
        }

        let outcome = match self
            .platform
            .ban_member(target.guild_id, target.reported_user_id, self.ban_delete_days)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    guild_id = target.guild_id,
                    user_id = target.reported_user_id,
                    "member banned"
                );
                ActionOutcome::succeeded(Verdict::Ban)
            }
            Err(error) => {
                tracing::warn!(
                    guild_id = target.guild_id,
                    user_id = target.reported_user_id,
                    %error,
                    "ban failed"
                );
                ActionOutcome::failed(Verdict::Ban, format!("ban failed: {error}"))
            }
        };

        let notice = if outcome.success {
            messages::banned(&format!("<@{}>", target.reported_user_id))
        } else {
            messages::BAN_FAILED.to_string()
        };
        self.notify(target, &notice).await;
        outcome
    }

    /// Best effort; a message that cannot be deleted is skipped.
    async fn purge(&self, target: &DispatchTarget) {
        let mut ids = Vec::with_capacity(target.recent_message_ids.len() + 1);
        ids.push(target.reported_message_id);
        for id in &target.recent_message_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }

        for message_id in ids {
            if let Err(error) = self
                .platform
                .delete_message(target.channel_id, message_id)
                .await
            {
                tracing::warn!(
                    channel_id = target.channel_id,
                    message_id,
                    %error,
                    "failed to delete reported user's message"
                );
            }
        }
    }

    async fn dismiss(&self, target: &DispatchTarget) -> ActionOutcome {
        match self
            .platform
            .reply(target.channel_id, target.report_message_id, messages::NO_VIOLATION)
            .await
        {
            Ok(()) => ActionOutcome::succeeded(Verdict::InvalidReport),
            Err(error) => {
                tracing::warn!(channel_id = target.channel_id, %error, "dismissal notice failed");
                ActionOutcome::failed(Verdict::InvalidReport, format!("notice failed: {error}"))
            }
        }
    }

    async fn escalate(
        &self,
        decision: &Decision,
        target: &DispatchTarget,
    ) -> Result<ActionOutcome, crate::error::PlatformError> {
        let reported = format!("<@{}>", target.reported_user_id);
        let reporter = format!("<@{}>", target.reporter_id);
        let notice = EscalationNotice {
            gm_role_id: self.gm_role_id,
            reported_mention: &reported,
            reporter_mention: &reporter,
            message_url: &target.reported_message_url,
            reason: &target.report_reason,
            judge_reasoning: &decision.reasoning,
        }
        .render(self.escalation_max_chars);

        let mentions = AllowedMentions {
            roles: vec![self.gm_role_id],
            users: vec![target.reporter_id, target.reported_user_id],
        };
        self.platform
            .send_message(target.channel_id, &notice, &mentions)
            .await
            .map(|_| ActionOutcome::succeeded(Verdict::NeedGm))
    }

    async fn notify(&self, target: &DispatchTarget, content: &str) {
        if let Err(error) = self
            .platform
            .reply(target.channel_id, target.report_message_id, content)
            .await
        {
            tracing::warn!(channel_id = target.channel_id, %error, "outcome notice failed");
        }
    }

    async fn record(&self, target: &DispatchTarget, outcome: &ActionOutcome) {
        let Some(report_id) = target.report_id else {
            return;
        };
        match self.audit.record_action(report_id, outcome).await {
            Ok(Transition::Applied) => {}
            Ok(Transition::Ignored) => tracing::warn!(
                report_id = %report_id,
                "action not recorded, report was not awaiting an action"
            ),
            Err(error) => tracing::warn!(
                report_id = %report_id,
                %error,
                "failed to record action outcome"
            ),
        }
    }
}

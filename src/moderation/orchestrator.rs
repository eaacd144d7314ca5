use super::context::{CollectedContext, ContextCollector};
use super::dispatch::{ActionDispatcher, DispatchTarget};
use super::engine::DecisionEngine;
use super::intake::{self, AcceptedReport, Intake};
use super::messages;
use super::prompt::PromptContext;
use super::report::{ActionOutcome, Decision, ReportDraft, Transition};
use crate::audit::AuditStore;
use crate::config::Config;
use crate::error::{ContextError, DispatchError};
use crate::llm::Provider;
use crate::platform::{ChannelMessage, ChatPlatform};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

/// How one incoming message was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Ignored,
    /// The requester got a rejection; nothing was stored.
    Rejected(&'static str),
    Processed {
        report_id: Option<Uuid>,
        decision: Decision,
        outcome: ActionOutcome,
    },
}

/// Runs each report through intake, context, judge and dispatch.
pub struct Orchestrator {
    platform: Arc<dyn ChatPlatform>,
    audit: AuditStore,
    collector: ContextCollector,
    engine: DecisionEngine,
    dispatcher: ActionDispatcher,
    history_limit: usize,
    /// In-flight report pipelines, drained on shutdown.
    pipelines: TaskTracker,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        platform: Arc<dyn ChatPlatform>,
        provider: Arc<dyn Provider>,
        audit: AuditStore,
    ) -> Self {
        Self {
            collector: ContextCollector::new(Arc::clone(&platform)),
            engine: DecisionEngine::new(provider, &config.llm),
            dispatcher: ActionDispatcher::new(
                Arc::clone(&platform),
                audit.clone(),
                &config.discord,
                &config.moderation,
            ),
            history_limit: config.moderation.history_message_limit,
            pipelines: TaskTracker::new(),
            platform,
            audit,
        }
    }

    /// Consume messages until the sender side closes. Each report runs in
    /// its own tracked task; see [`Orchestrator::drain`].
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<ChannelMessage>) {
        while let Some(message) = rx.recv().await {
            let orchestrator = Arc::clone(&self);
            self.pipelines.spawn(async move {
                if let Err(error) = orchestrator.handle_message(&message).await {
                    tracing::error!(
                        channel_id = message.channel_id,
                        message_id = message.id,
                        %error,
                        "report pipeline failed"
                    );
                }
            });
        }
        tracing::info!("report channel closed, orchestrator stopping");
    }

    /// Wait for every report pipeline already started to finish. Stop the
    /// `run` loop first; reports arriving afterwards are still tracked.
    pub async fn drain(&self) {
        self.pipelines.close();
        let in_flight = self.pipelines.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "waiting for report pipelines to finish");
        }
        self.pipelines.wait().await;
    }

    pub async fn handle_message(
        &self,
        message: &ChannelMessage,
    ) -> Result<PipelineOutcome, DispatchError> {
        let accepted = match intake::evaluate(self.platform.as_ref(), message).await {
            Intake::Ignore => return Ok(PipelineOutcome::Ignored),
            Intake::Reject(text) => {
                self.reply(message, text).await;
                return Ok(PipelineOutcome::Rejected(text));
            }
            Intake::Accept(accepted) => accepted,
        };

        self.reply(message, messages::ACKNOWLEDGED).await;

        let context = match self
            .collector
            .collect(
                accepted.guild_id,
                accepted.reported.author.id,
                accepted.reported.channel_id,
                self.history_limit,
            )
            .await
        {
            Ok(context) => context,
            Err(error) => {
                let text = context_rejection(&error);
                tracing::info!(
                    user_id = accepted.reported.author.id,
                    %error,
                    "context collection failed"
                );
                self.reply(message, text).await;
                return Ok(PipelineOutcome::Rejected(text));
            }
        };

        let draft = build_draft(&accepted, &context);
        let report_id = match self.audit.create(&draft).await {
            Ok(id) => {
                tracing::info!(report_id = %id, guild_id = draft.guild_id, "report created");
                Some(id)
            }
            Err(error) => {
                tracing::warn!(%error, "failed to create report row");
                None
            }
        };

        let decision = self
            .engine
            .decide(&PromptContext {
                reported_message: &accepted.reported.content,
                report_reason: &accepted.reason,
                profile: &context.profile,
                history: &context.history,
            })
            .await;
        tracing::info!(
            report_id = ?report_id,
            verdict = %decision.verdict,
            confidence = decision.confidence(),
            "judge decided"
        );

        if let Some(id) = report_id {
            self.record_decision(id, &decision).await;
        }

        let target = DispatchTarget {
            report_id,
            guild_id: accepted.guild_id,
            channel_id: accepted.report.channel_id,
            report_message_id: accepted.report.id,
            reporter_id: accepted.report.author.id,
            reported_user_id: accepted.reported.author.id,
            reported_message_id: accepted.reported.id,
            reported_message_url: draft.reported_message_url,
            report_reason: accepted.reason,
            recent_message_ids: context
                .history
                .items()
                .iter()
                .map(|item| item.message_id)
                .collect(),
        };
        let outcome = self.dispatcher.dispatch(&decision, &target).await?;

        Ok(PipelineOutcome::Processed {
            report_id,
            decision,
            outcome,
        })
    }

    async fn record_decision(&self, id: Uuid, decision: &Decision) {
        match self.audit.record_decision(id, decision).await {
            Ok(Transition::Applied) => {}
            Ok(Transition::Ignored) => {
                tracing::warn!(report_id = %id, "decision not recorded, report was not pending");
            }
            Err(error) => tracing::warn!(report_id = %id, %error, "failed to record decision"),
        }
    }

    async fn reply(&self, message: &ChannelMessage, text: &str) {
        if let Err(error) = self
            .platform
            .reply(message.channel_id, message.id, text)
            .await
        {
            tracing::warn!(
                channel_id = message.channel_id,
                message_id = message.id,
                %error,
                "reply to reporter failed"
            );
        }
    }
}

fn context_rejection(error: &ContextError) -> &'static str {
    match error {
        ContextError::NotFound => messages::MEMBER_NOT_FOUND,
        ContextError::Forbidden => messages::CONTEXT_FORBIDDEN,
        ContextError::Platform(_) => messages::CONTEXT_FAILED,
    }
}

fn build_draft(accepted: &AcceptedReport, context: &CollectedContext) -> ReportDraft {
    ReportDraft {
        guild_id: accepted.guild_id,
        channel_id: accepted.report.channel_id,
        reporter_id: accepted.report.author.id,
        reporter_name: accepted.report.author.name.clone(),
        reported_user_id: accepted.reported.author.id,
        reported_user_name: context.profile.name.clone(),
        reported_message_id: accepted.reported.id,
        reported_message_content: accepted.reported.content.clone(),
        reported_message_url: accepted.reported.permalink(),
        report_reason: accepted.reason.clone(),
        history: context.history.items().to_vec(),
    }
}

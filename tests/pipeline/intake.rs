use super::support::{
    BOT, FakePlatform, GUILD, REPORTED, REPORTED_MSG, REPORTER, ScriptedProvider, message,
    orchestrator, report_message, user,
};
use llm_guard::error::PlatformError;
use llm_guard::moderation::intake::{self, Intake};
use llm_guard::moderation::{PipelineOutcome, messages};
use llm_guard::platform::ChannelMessage;
use std::sync::Arc;

/// Run one message through a pipeline whose judge must never be reached.
async fn rejected_with(
    platform: FakePlatform,
    report: &ChannelMessage,
) -> (PipelineOutcome, Arc<FakePlatform>) {
    let platform = Arc::new(platform);
    let provider = Arc::new(ScriptedProvider::new(Vec::new()));
    let (orchestrator, store) = orchestrator(Arc::clone(&platform), Arc::clone(&provider)).await;

    let outcome = orchestrator.handle_message(report).await.unwrap();

    assert!(provider.formats().is_empty(), "judge must not be called");
    assert!(store.list_recent(10).await.unwrap().is_empty());
    (outcome, platform)
}

#[tokio::test]
async fn report_without_reply_gets_usage_hint() {
    let mut report = report_message("spam");
    report.referenced_message_id = None;

    let (outcome, platform) = rejected_with(FakePlatform::new(), &report).await;
    assert_eq!(outcome, PipelineOutcome::Rejected(messages::NOT_A_REPLY));
    assert_eq!(platform.replies(), vec![messages::NOT_A_REPLY.to_string()]);
}

#[tokio::test]
async fn referenced_message_lookup_failures_are_rejected() {
    let cases = [
        (PlatformError::NotFound, messages::REFERENCED_NOT_FOUND),
        (PlatformError::Forbidden, messages::REFERENCED_FORBIDDEN),
        (
            PlatformError::Transport("reset".into()),
            messages::REFERENCED_FETCH_FAILED,
        ),
    ];
    for (error, expected) in cases {
        let platform = FakePlatform::new().with_message(REPORTED_MSG, Err(error));
        let (outcome, _) = rejected_with(platform, &report_message("spam")).await;
        assert_eq!(outcome, PipelineOutcome::Rejected(expected));
    }
}

#[tokio::test]
async fn cannot_report_self_or_bot() {
    let own = FakePlatform::new().with_message(
        REPORTED_MSG,
        Ok(message(REPORTED_MSG, user(REPORTER, "alice"), "my own words")),
    );
    let (outcome, _) = rejected_with(own, &report_message("spam")).await;
    assert_eq!(outcome, PipelineOutcome::Rejected(messages::CANNOT_REPORT_SELF));

    let bot = FakePlatform::new().with_message(
        REPORTED_MSG,
        Ok(message(REPORTED_MSG, user(BOT, "guard"), "✅ Report received")),
    );
    let (outcome, _) = rejected_with(bot, &report_message("spam")).await;
    assert_eq!(outcome, PipelineOutcome::Rejected(messages::CANNOT_REPORT_BOT));
}

#[tokio::test]
async fn unaddressed_messages_are_ignored_silently() {
    let mut no_mention = report_message("spam");
    no_mention.mentions.clear();

    let mut direct = report_message("spam");
    direct.guild_id = None;

    let mut own = report_message("spam");
    own.author = user(BOT, "guard");

    for msg in [no_mention, direct, own] {
        let (outcome, platform) = rejected_with(FakePlatform::new(), &msg).await;
        assert_eq!(outcome, PipelineOutcome::Ignored);
        assert!(platform.calls().is_empty());
    }
}

#[tokio::test]
async fn missing_member_stops_after_acknowledgement() {
    let platform = FakePlatform::new().without_member(REPORTED);
    let (outcome, platform) = rejected_with(platform, &report_message("spam")).await;
    assert_eq!(outcome, PipelineOutcome::Rejected(messages::MEMBER_NOT_FOUND));
    assert_eq!(
        platform.replies(),
        vec![
            messages::ACKNOWLEDGED.to_string(),
            messages::MEMBER_NOT_FOUND.to_string()
        ]
    );
}

#[tokio::test]
async fn forbidden_member_lookup_is_rejected() {
    let platform = FakePlatform::new().with_member_error(PlatformError::Forbidden);
    let (outcome, _) = rejected_with(platform, &report_message("spam")).await;
    assert_eq!(outcome, PipelineOutcome::Rejected(messages::CONTEXT_FORBIDDEN));
}

#[tokio::test]
async fn accepted_report_carries_reason_and_guild() {
    let mut reported = message(REPORTED_MSG, user(REPORTED, "mallory"), "click me");
    reported.guild_id = None;
    let platform = FakePlatform::new().with_message(REPORTED_MSG, Ok(reported));

    let report = report_message("  phishing  ");
    let Intake::Accept(accepted) = intake::evaluate(&platform, &report).await else {
        panic!("report should be accepted");
    };
    assert_eq!(accepted.reason, "phishing");
    assert_eq!(accepted.guild_id, GUILD);
    assert_eq!(accepted.reported.guild_id, Some(GUILD));
    assert_eq!(accepted.reported.author.id, REPORTED);
    assert!(platform.calls().is_empty());
}

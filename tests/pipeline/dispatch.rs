use super::support::{
    CHANNEL, Call, FakePlatform, GM_ROLE, GUILD, REPORT_MSG, REPORTED, REPORTED_MSG, REPORTER,
    test_config,
};
use llm_guard::audit::AuditStore;
use llm_guard::config::Config;
use llm_guard::error::PlatformError;
use llm_guard::moderation::{
    ActionDispatcher, Decision, DispatchTarget, ReportDraft, ReportStatus, Verdict, messages,
};
use llm_guard::platform::AllowedMentions;
use std::sync::Arc;
use uuid::Uuid;

fn target(report_id: Option<Uuid>) -> DispatchTarget {
    DispatchTarget {
        report_id,
        guild_id: GUILD,
        channel_id: CHANNEL,
        report_message_id: REPORT_MSG,
        reporter_id: REPORTER,
        reported_user_id: REPORTED,
        reported_message_id: REPORTED_MSG,
        reported_message_url: format!(
            "https://discord.com/channels/{GUILD}/{CHANNEL}/{REPORTED_MSG}"
        ),
        report_reason: "scam link".into(),
        recent_message_ids: vec![REPORTED_MSG, 305, 303],
    }
}

fn draft() -> ReportDraft {
    ReportDraft {
        guild_id: GUILD,
        channel_id: CHANNEL,
        reporter_id: REPORTER,
        reporter_name: "alice".into(),
        reported_user_id: REPORTED,
        reported_user_name: "mallory".into(),
        reported_message_id: REPORTED_MSG,
        reported_message_content: "free nitro".into(),
        reported_message_url: "https://discord.com/channels/1/2/300".into(),
        report_reason: "scam link".into(),
        history: Vec::new(),
    }
}

/// A report that has reached LLM_DONE with `decision`.
async fn decided_report(store: &AuditStore, decision: &Decision) -> Uuid {
    let id = store.create(&draft()).await.unwrap();
    store.record_decision(id, decision).await.unwrap();
    id
}

async fn setup(
    platform: FakePlatform,
    config: &Config,
) -> (ActionDispatcher, Arc<FakePlatform>, AuditStore) {
    let platform = Arc::new(platform);
    let store = AuditStore::in_memory().await.unwrap();
    let dispatcher = ActionDispatcher::new(
        platform.clone(),
        store.clone(),
        &config.discord,
        &config.moderation,
    );
    (dispatcher, platform, store)
}

#[tokio::test]
async fn ban_survives_purge_failures() {
    let (dispatcher, platform, store) = setup(
        FakePlatform::new().failing_delete(PlatformError::Forbidden),
        &test_config(),
    )
    .await;
    let decision = Decision::new(Verdict::Ban, 0.9, "spam");
    let id = decided_report(&store, &decision).await;

    let outcome = dispatcher.dispatch(&decision, &target(Some(id))).await.unwrap();
    assert!(outcome.success);

    let calls = platform.calls();
    let deleted: Vec<u64> = calls
        .iter()
        .filter_map(|c| match c {
            Call::Delete { message_id, .. } => Some(*message_id),
            _ => None,
        })
        .collect();
    assert_eq!(deleted, vec![REPORTED_MSG, 305, 303]);
    assert!(calls.contains(&Call::Ban {
        guild_id: GUILD,
        user_id: REPORTED,
        delete_message_days: 7,
    }));

    let report = store.get(id).await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Done);
}

#[tokio::test]
async fn purge_can_be_disabled_and_days_are_clamped() {
    let mut config = test_config();
    config.moderation.purge_recent_messages = false;
    config.moderation.ban_delete_days = 30;
    let (dispatcher, platform, _store) = setup(FakePlatform::new(), &config).await;

    dispatcher
        .dispatch(&Decision::new(Verdict::Ban, 1.0, "spam"), &target(None))
        .await
        .unwrap();

    let calls = platform.calls();
    assert!(!calls.iter().any(|c| matches!(c, Call::Delete { .. })));
    assert!(calls.contains(&Call::Ban {
        guild_id: GUILD,
        user_id: REPORTED,
        delete_message_days: 7,
    }));
}

#[tokio::test]
async fn failed_ban_is_recorded_and_reported() {
    let (dispatcher, platform, store) = setup(
        FakePlatform::new().failing_ban(PlatformError::Forbidden),
        &test_config(),
    )
    .await;
    let decision = Decision::new(Verdict::Ban, 0.9, "spam");
    let id = decided_report(&store, &decision).await;

    let outcome = dispatcher.dispatch(&decision, &target(Some(id))).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(platform.replies(), vec![messages::BAN_FAILED.to_string()]);

    let report = store.get(id).await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.action_taken, Some(Verdict::Ban));
    assert!(
        report
            .error_message
            .as_deref()
            .is_some_and(|e| e.starts_with("ban failed"))
    );
}

#[tokio::test]
async fn dismissal_success_follows_notice_delivery() {
    let decision = Decision::new(Verdict::InvalidReport, 0.8, "banter");

    let (dispatcher, platform, store) = setup(FakePlatform::new(), &test_config()).await;
    let id = decided_report(&store, &decision).await;
    let outcome = dispatcher.dispatch(&decision, &target(Some(id))).await.unwrap();
    assert!(outcome.success);
    assert_eq!(platform.replies(), vec![messages::NO_VIOLATION.to_string()]);
    assert_eq!(
        store.get(id).await.unwrap().unwrap().status,
        ReportStatus::Done
    );

    let (dispatcher, _platform, store) = setup(
        FakePlatform::new().failing_reply(PlatformError::Transport("reset".into())),
        &test_config(),
    )
    .await;
    let id = decided_report(&store, &decision).await;
    let outcome = dispatcher.dispatch(&decision, &target(Some(id))).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(
        store.get(id).await.unwrap().unwrap().status,
        ReportStatus::Failed
    );
}

#[tokio::test]
async fn escalation_notice_is_bounded_and_pings_only_its_parties() {
    let mut config = test_config();
    config.moderation.escalation_max_chars = 120;
    let (dispatcher, platform, _store) = setup(FakePlatform::new(), &config).await;

    let decision = Decision::escalate("x".repeat(1000));
    let outcome = dispatcher.dispatch(&decision, &target(None)).await.unwrap();
    assert!(outcome.success);

    let sent = platform.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].chars().count() <= 120);
    assert!(sent[0].starts_with(&format!("<@&{GM_ROLE}>")));
    let calls = platform.calls();
    let Call::Send {
        channel_id,
        mentions,
        ..
    } = &calls[0]
    else {
        panic!("expected a channel message");
    };
    assert_eq!(*channel_id, CHANNEL);
    assert_eq!(
        mentions,
        &AllowedMentions {
            roles: vec![GM_ROLE],
            users: vec![REPORTER, REPORTED],
        }
    );
}

#[tokio::test]
async fn action_on_undecided_report_leaves_it_pending() {
    let (dispatcher, _platform, store) = setup(FakePlatform::new(), &test_config()).await;
    let id = store.create(&draft()).await.unwrap();

    dispatcher
        .dispatch(
            &Decision::new(Verdict::InvalidReport, 0.5, "r"),
            &target(Some(id)),
        )
        .await
        .unwrap();

    let report = store.get(id).await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Pending);
    assert!(report.action_taken.is_none());
    assert!(report.resolved_at.is_none());
}

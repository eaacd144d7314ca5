use super::support::{
    CHANNEL, Call, FakePlatform, GM_ROLE, GUILD, REPORTED, REPORTER, ScriptedProvider,
    message, orchestrator, report_message, user,
};
use llm_guard::error::{DispatchError, PlatformError};
use llm_guard::llm::ResponseFormat;
use llm_guard::moderation::messages;
use llm_guard::moderation::{PipelineOutcome, ReportStatus, Verdict};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn ban_verdict_bans_notifies_and_closes_report() {
    let platform = Arc::new(FakePlatform::new().with_history(vec![
        message(305, user(REPORTED, "mallory"), "dm me for nitro"),
        message(304, user(REPORTER, "alice"), "hi all"),
        message(303, user(REPORTED, "mallory"), "buy followers"),
    ]));
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(
        r#"{"decision":"BAN","confidence":0.95,"reasoning":"phishing link"}"#,
    )]));
    let (orchestrator, store) = orchestrator(Arc::clone(&platform), Arc::clone(&provider)).await;

    let result = orchestrator
        .handle_message(&report_message("scam link"))
        .await
        .unwrap();

    let PipelineOutcome::Processed {
        report_id: Some(report_id),
        decision,
        outcome,
    } = result
    else {
        panic!("expected a processed report");
    };
    assert_eq!(decision.verdict, Verdict::Ban);
    assert!(outcome.success);
    assert_eq!(provider.formats(), vec![ResponseFormat::JsonObject]);

    assert_eq!(
        platform.replies(),
        vec![
            messages::ACKNOWLEDGED.to_string(),
            messages::banned(&format!("<@{REPORTED}>")),
        ]
    );
    let calls = platform.calls();
    let ban = Call::Ban {
        guild_id: GUILD,
        user_id: REPORTED,
        delete_message_days: 7,
    };
    let ban_index = calls.iter().position(|c| *c == ban).expect("ban issued");
    for message_id in [300, 305, 303] {
        let delete = Call::Delete {
            channel_id: CHANNEL,
            message_id,
        };
        let index = calls.iter().position(|c| *c == delete).expect("purged");
        assert!(index < ban_index);
    }

    let report = store.get(report_id).await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Done);
    assert_eq!(report.report_reason, "scam link");
    assert_eq!(report.llm_decision, Some(Verdict::Ban));
    assert_eq!(report.action_taken, Some(Verdict::Ban));
    assert_eq!(report.action_success, Some(true));
    assert!(report.resolved_at.is_some());
    assert_eq!(report.reporter_name, "alice");
    assert_eq!(report.reported_user_name, "mallory");
    assert_eq!(
        report.reported_message_url,
        format!("https://discord.com/channels/{GUILD}/{CHANNEL}/300")
    );
    let history: Vec<u64> = report.history.iter().map(|h| h.message_id).collect();
    assert_eq!(history, vec![305, 303]);
}

#[tokio::test]
async fn model_failing_twice_escalates_to_reviewers() {
    let platform = Arc::new(FakePlatform::new());
    let provider = Arc::new(ScriptedProvider::new(vec![
        Err("connection reset"),
        Err("timed out"),
    ]));
    let (orchestrator, store) = orchestrator(Arc::clone(&platform), Arc::clone(&provider)).await;

    let result = orchestrator
        .handle_message(&report_message("scam link"))
        .await
        .unwrap();

    let PipelineOutcome::Processed {
        report_id: Some(report_id),
        decision,
        outcome,
    } = result
    else {
        panic!("expected a processed report");
    };
    assert_eq!(decision.verdict, Verdict::NeedGm);
    assert!(decision.confidence().abs() < f64::EPSILON);
    assert_eq!(decision.reasoning, "model call failed");
    assert!(outcome.success);
    assert_eq!(
        provider.formats(),
        vec![ResponseFormat::JsonObject, ResponseFormat::Text]
    );

    let sent = platform.sent();
    assert_eq!(sent.len(), 1);
    let notice = &sent[0];
    assert!(notice.starts_with(&format!("<@&{GM_ROLE}>")));
    assert!(notice.contains(&format!("<@{REPORTED}>")));
    assert!(notice.contains(&format!("<@{REPORTER}>")));
    assert!(notice.contains("https://discord.com/channels/1/2/300"));
    assert!(notice.contains("scam link"));
    assert!(notice.contains("model call failed"));
    assert!(
        !platform
            .calls()
            .iter()
            .any(|c| matches!(c, Call::Ban { .. }))
    );

    let report = store.get(report_id).await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Done);
    assert_eq!(report.llm_decision, Some(Verdict::NeedGm));
    assert_eq!(report.llm_confidence, Some(0.0));
    assert_eq!(report.action_taken, Some(Verdict::NeedGm));
}

#[tokio::test]
async fn undelivered_escalation_fails_report_and_propagates() {
    let platform = Arc::new(FakePlatform::new().failing_send(PlatformError::Forbidden));
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(
        r#"{"decision":"NEED_GM","confidence":0.4,"reasoning":"borderline"}"#,
    )]));
    let (orchestrator, store) = orchestrator(Arc::clone(&platform), provider).await;

    let err = orchestrator
        .handle_message(&report_message("scam link"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::EscalationUndelivered(PlatformError::Forbidden)
    ));

    let reports = store.list_recent(10).await.unwrap();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.action_taken, Some(Verdict::NeedGm));
    assert_eq!(report.action_success, Some(false));
    assert!(
        report
            .error_message
            .as_deref()
            .is_some_and(|e| e.contains("missing permission"))
    );
}

#[tokio::test]
async fn invalid_report_is_dismissed() {
    let platform = Arc::new(FakePlatform::new());
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(
        "Looks like a normal chat to me. INVALID_REPORT",
    )]));
    let (orchestrator, store) = orchestrator(Arc::clone(&platform), provider).await;

    let result = orchestrator
        .handle_message(&report_message("<@!777> rude"))
        .await
        .unwrap();
    let PipelineOutcome::Processed {
        report_id: Some(report_id),
        decision,
        ..
    } = result
    else {
        panic!("expected a processed report");
    };
    assert_eq!(decision.verdict, Verdict::InvalidReport);
    assert_eq!(decision.reasoning, "non-JSON fallback");
    assert_eq!(
        platform.replies().last().map(String::as_str),
        Some(messages::NO_VIOLATION)
    );

    let report = store.get(report_id).await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Done);
    assert_eq!(report.report_reason, "rude");
}

#[tokio::test]
async fn unavailable_audit_store_does_not_block_pipeline() {
    let platform = Arc::new(FakePlatform::new());
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(
        r#"{"decision":"INVALID_REPORT","confidence":0.8,"reasoning":"banter"}"#,
    )]));
    let (orchestrator, store) = orchestrator(Arc::clone(&platform), provider).await;
    store.close().await;

    let outcome = orchestrator
        .handle_message(&report_message("rude"))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        PipelineOutcome::Processed {
            report_id: None,
            ..
        }
    ));
    assert_eq!(
        platform.replies(),
        vec![
            messages::ACKNOWLEDGED.to_string(),
            messages::NO_VIOLATION.to_string()
        ]
    );
}

#[tokio::test]
async fn drain_waits_for_reports_still_being_judged() {
    let platform = Arc::new(FakePlatform::new());
    let provider = Arc::new(
        ScriptedProvider::new(vec![Ok(
            r#"{"decision":"BAN","confidence":0.9,"reasoning":"phishing"}"#,
        )])
        .with_delay(Duration::from_millis(200)),
    );
    let (orchestrator, store) = orchestrator(Arc::clone(&platform), provider).await;
    let orchestrator = Arc::new(orchestrator);

    let (tx, rx) = mpsc::channel(4);
    let run = tokio::spawn(Arc::clone(&orchestrator).run(rx));
    tx.send(report_message("scam link")).await.unwrap();
    drop(tx);
    run.await.unwrap();

    orchestrator.drain().await;

    let reports = store.list_recent(10).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, ReportStatus::Done);
    assert!(platform.calls().iter().any(|call| matches!(
        call,
        Call::Ban {
            user_id: REPORTED,
            ..
        }
    )));
}

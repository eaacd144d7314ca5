use super::support::{CHANNEL, FakePlatform, GUILD, REPORTED, REPORTER, member, message, user};
use llm_guard::error::{ContextError, PlatformError};
use llm_guard::moderation::{ContextCollector, History};
use llm_guard::platform::ChannelKind;
use std::sync::Arc;

fn timeline() -> Vec<llm_guard::platform::ChannelMessage> {
    (0..12u64)
        .rev()
        .map(|i| {
            let author = if i % 2 == 0 {
                user(REPORTED, "mallory")
            } else {
                user(REPORTER, "alice")
            };
            message(500 + i, author, &format!("message {i}"))
        })
        .collect()
}

#[tokio::test]
async fn collects_profile_and_bounded_history() {
    let mut reported = member(REPORTED, "mallory");
    reported.display_name = "Mal".into();
    reported.roles = vec!["Member".into()];
    let platform = Arc::new(
        FakePlatform::new()
            .with_member(reported)
            .with_history(timeline()),
    );
    let collector = ContextCollector::new(platform.clone());

    let context = collector.collect(GUILD, REPORTED, CHANNEL, 3).await.unwrap();

    assert_eq!(context.profile.id, REPORTED);
    assert_eq!(context.profile.display_name, "Mal");
    assert_eq!(context.profile.roles, vec!["Member".to_string()]);
    assert!(!context.profile.bot);

    let History::Available(items) = &context.history else {
        panic!("text channel should have history");
    };
    let ids: Vec<u64> = items.iter().map(|i| i.message_id).collect();
    assert_eq!(ids, vec![510, 508, 506]);
    assert_eq!(items[0].content, "message 10");
    assert_eq!(
        items[0].url,
        format!("https://discord.com/channels/{GUILD}/{CHANNEL}/510")
    );
    assert_eq!(platform.page_requests(), vec![(None, 50)]);
}

#[tokio::test]
async fn scan_stops_at_ceiling() {
    let mut history: Vec<_> = (0..60u64)
        .map(|i| message(2_000 - i, user(REPORTER, "alice"), "chatter"))
        .collect();
    history.push(message(1_000, user(REPORTED, "mallory"), "too old"));
    let platform = Arc::new(FakePlatform::new().with_page_size(20).with_history(history));
    let collector = ContextCollector::new(platform.clone());

    let context = collector.collect(GUILD, REPORTED, CHANNEL, 5).await.unwrap();
    assert_eq!(context.history, History::Available(Vec::new()));
    assert_eq!(
        platform.page_requests(),
        vec![(None, 20), (Some(1_981), 20), (Some(1_961), 10)]
    );
}

#[tokio::test]
async fn scan_stops_once_enough_matches_are_found() {
    let history: Vec<_> = (0..200u64)
        .map(|i| message(5_000 - i, user(REPORTED, "mallory"), "spam"))
        .collect();
    let platform = Arc::new(FakePlatform::new().with_history(history));
    let collector = ContextCollector::new(platform.clone());

    let context = collector.collect(GUILD, REPORTED, CHANNEL, 40).await.unwrap();
    assert_eq!(context.history.items().len(), 40);
    assert_eq!(context.history.items()[0].message_id, 5_000);
    assert_eq!(platform.page_requests(), vec![(None, 100)]);
}

#[tokio::test]
async fn later_pages_are_read_only_while_matches_are_missing() {
    let platform = Arc::new(
        FakePlatform::new()
            .with_page_size(4)
            .with_history(timeline()),
    );
    let collector = ContextCollector::new(platform.clone());

    let context = collector.collect(GUILD, REPORTED, CHANNEL, 3).await.unwrap();
    let ids: Vec<u64> = context.history.items().iter().map(|i| i.message_id).collect();
    assert_eq!(ids, vec![510, 508, 506]);
    assert_eq!(platform.page_requests(), vec![(None, 4), (Some(508), 4)]);
}

#[tokio::test]
async fn channel_without_timeline_is_unavailable() {
    let platform = Arc::new(
        FakePlatform::new()
            .with_channel_kind(ChannelKind::Forum)
            .with_history(timeline()),
    );
    let collector = ContextCollector::new(platform.clone());

    let context = collector.collect(GUILD, REPORTED, CHANNEL, 3).await.unwrap();
    assert_eq!(context.history, History::Unavailable);
    assert!(platform.page_requests().is_empty());
}

#[tokio::test]
async fn lookup_failures_are_typed() {
    let platform = Arc::new(FakePlatform::new().without_member(REPORTED));
    let err = ContextCollector::new(platform)
        .collect(GUILD, REPORTED, CHANNEL, 3)
        .await
        .unwrap_err();
    assert_eq!(err, ContextError::NotFound);

    let platform = Arc::new(FakePlatform::new().with_history_error(PlatformError::Forbidden));
    let err = ContextCollector::new(platform)
        .collect(GUILD, REPORTED, CHANNEL, 3)
        .await
        .unwrap_err();
    assert_eq!(err, ContextError::Forbidden);
}

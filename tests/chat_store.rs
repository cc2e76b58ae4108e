//! Behavior of the team chat store: ordering, send latency, validation
//! no-ops, channel switching and teardown.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

use collabforge_sync::backend::types::collections;
use collabforge_sync::backend::{Backend, InMemoryBackend};
use collabforge_sync::client::notify::{Notice, NoticeLevel, Notifier};
use collabforge_sync::client::stores::{ChatPhase, ChatStore, ProfileResolver};

fn setup() -> (
    Arc<InMemoryBackend>,
    Arc<dyn Backend>,
    Notifier,
    UnboundedReceiver<Notice>,
) {
    let backend = Arc::new(InMemoryBackend::new());
    let shared: Arc<dyn Backend> = backend.clone();
    let (notifier, notices) = Notifier::channel();
    (backend, shared, notifier, notices)
}

async fn wait_until(mut cond: impl FnMut() -> bool, what: &str) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("timed out waiting for {}", what);
}

fn message_row(id: &str, team_id: &str, user_id: &str, body: &str, created_at: &str) -> serde_json::Value {
    json!({
        "id": id,
        "team_id": team_id,
        "user_id": user_id,
        "message": body,
        "created_at": created_at,
    })
}

async fn seed_message(backend: &Arc<dyn Backend>, row: serde_json::Value) {
    backend
        .insert(collections::TEAM_MESSAGES, row)
        .await
        .expect("seed message");
}

#[tokio::test]
async fn initial_fetch_is_ascending_by_timestamp() {
    let (_raw, backend, notifier, _notices) = setup();
    // Seeded out of chronological order on purpose.
    seed_message(&backend, message_row("m2", "t1", "u1", "second", "2025-06-01T10:01:00Z")).await;
    seed_message(&backend, message_row("m1", "t1", "u1", "first", "2025-06-01T10:00:00Z")).await;
    seed_message(&backend, message_row("m9", "t2", "u1", "elsewhere", "2025-06-01T09:00:00Z")).await;

    let mut chat = ChatStore::new(backend, notifier);
    chat.bind("t1", "u1").await;
    wait_until(|| chat.phase() == ChatPhase::Ready, "chat ready").await;

    let bodies: Vec<String> = chat.messages().iter().map(|m| m.message.clone()).collect();
    assert_eq!(bodies, vec!["first".to_string(), "second".to_string()]);
}

#[tokio::test]
async fn feed_appends_keep_timestamps_non_decreasing() {
    let (_raw, backend, notifier, _notices) = setup();
    seed_message(&backend, message_row("m1", "t1", "u1", "a", "2025-06-01T10:00:00Z")).await;

    let mut chat = ChatStore::new(backend.clone(), notifier);
    chat.bind("t1", "u1").await;
    wait_until(|| chat.phase() == ChatPhase::Ready, "chat ready").await;

    seed_message(&backend, message_row("m2", "t1", "u2", "b", "2025-06-01T10:05:00Z")).await;
    seed_message(&backend, message_row("m3", "t1", "u1", "c", "2025-06-01T10:06:00Z")).await;
    wait_until(|| chat.messages().len() == 3, "feed deliveries").await;

    let messages = chat.messages();
    for pair in messages.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
    }
}

#[tokio::test]
async fn send_does_not_append_synchronously() {
    let (_raw, backend, notifier, _notices) = setup();
    let mut chat = ChatStore::new(backend, notifier);
    chat.bind("t1", "u1").await;
    wait_until(|| chat.phase() == ChatPhase::Ready, "chat ready").await;

    chat.send("hello").await;
    // Visible only once the feed delivers the insert, never before.
    assert_eq!(chat.messages().len(), 0);

    wait_until(|| chat.messages().len() == 1, "feed delivery of own send").await;
    assert_eq!(chat.messages()[0].message, "hello");
}

#[tokio::test]
async fn invalid_sends_issue_zero_backend_calls() {
    let (raw, backend, notifier, _notices) = setup();

    let mut chat = ChatStore::new(backend.clone(), notifier.clone());
    chat.bind("t1", "u1").await;
    wait_until(|| chat.phase() == ChatPhase::Ready, "chat ready").await;

    let calls_before = raw.call_count();
    chat.send("").await;
    chat.send("   ").await;
    assert_eq!(raw.call_count(), calls_before);

    // No bound team or user at all.
    let unbound = ChatStore::new(backend, notifier);
    unbound.send("hello").await;
    assert_eq!(raw.call_count(), calls_before);
    assert_eq!(unbound.phase(), ChatPhase::Unbound);
}

#[tokio::test]
async fn switching_channels_clears_the_previous_history() {
    let (_raw, backend, notifier, _notices) = setup();
    seed_message(&backend, message_row("a1", "team-a", "u1", "from a", "2025-06-01T10:00:00Z")).await;

    let mut chat = ChatStore::new(backend.clone(), notifier);
    chat.bind("team-a", "u1").await;
    wait_until(|| chat.messages().len() == 1, "team-a history").await;

    chat.bind("team-b", "u1").await;
    // Cleared immediately, before team-b's first message can arrive.
    assert_eq!(chat.messages().len(), 0);
    wait_until(|| chat.phase() == ChatPhase::Ready, "team-b ready").await;
    assert_eq!(chat.messages().len(), 0);

    seed_message(&backend, message_row("b1", "team-b", "u2", "from b", "2025-06-01T11:00:00Z")).await;
    wait_until(|| chat.messages().len() == 1, "team-b delivery").await;
    assert_eq!(chat.messages()[0].team_id, "team-b");
}

#[tokio::test]
async fn unbound_store_ignores_later_feed_events() {
    let (_raw, backend, notifier, _notices) = setup();
    let mut chat = ChatStore::new(backend.clone(), notifier);
    chat.bind("t1", "u1").await;
    wait_until(|| chat.phase() == ChatPhase::Ready, "chat ready").await;

    chat.unbind();
    seed_message(&backend, message_row("m1", "t1", "u2", "late", "2025-06-01T10:00:00Z")).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(chat.phase(), ChatPhase::Unbound);
    assert_eq!(chat.messages().len(), 0);
}

#[tokio::test]
async fn duplicate_and_out_of_order_deliveries_append_anyway() {
    let (_raw, backend, notifier, _notices) = setup();
    let mut chat = ChatStore::new(backend.clone(), notifier);
    chat.bind("t1", "u1").await;
    wait_until(|| chat.phase() == ChatPhase::Ready, "chat ready").await;

    seed_message(&backend, message_row("m1", "t1", "u1", "x", "2025-06-01T10:00:00Z")).await;
    // Same id again, then an older timestamp: both land at the tail untouched.
    seed_message(&backend, message_row("m1", "t1", "u1", "x", "2025-06-01T10:00:00Z")).await;
    seed_message(&backend, message_row("m0", "t1", "u1", "older", "2025-06-01T09:00:00Z")).await;
    wait_until(|| chat.messages().len() == 3, "all deliveries").await;

    let messages = chat.messages();
    assert_eq!(messages[0].id, "m1");
    assert_eq!(messages[1].id, "m1");
    assert_eq!(messages[2].id, "m0");
}

#[tokio::test]
async fn failed_send_posts_a_transient_notice() {
    let (raw, backend, notifier, mut notices) = setup();
    let mut chat = ChatStore::new(backend, notifier);
    chat.bind("t1", "u1").await;
    wait_until(|| chat.phase() == ChatPhase::Ready, "chat ready").await;

    raw.fail_collection(collections::TEAM_MESSAGES).await;
    chat.send("doomed").await;

    let notice = notices.try_recv().expect("send failure notice");
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.text, "Failed to send message");
    assert_eq!(chat.messages().len(), 0);
}

#[tokio::test]
async fn history_fetch_failure_leaves_an_empty_ready_list() {
    let (raw, backend, notifier, mut notices) = setup();
    raw.fail_collection(collections::TEAM_MESSAGES).await;

    let mut chat = ChatStore::new(backend, notifier);
    chat.bind("t1", "u1").await;
    wait_until(|| chat.phase() == ChatPhase::Ready, "chat ready").await;

    // Empty, no automatic retry, and no toast for the history fetch.
    assert_eq!(chat.messages().len(), 0);
    assert!(notices.try_recv().is_err());
}

#[tokio::test]
async fn sent_message_displays_under_resolved_author() {
    let (_raw, backend, notifier, _notices) = setup();
    backend
        .insert(
            collections::PROFILES,
            json!({"user_id": "u1", "display_name": "Ada", "avatar_url": null}),
        )
        .await
        .unwrap();

    let mut chat = ChatStore::new(backend.clone(), notifier);
    chat.bind("T1", "u1").await;
    wait_until(|| chat.phase() == ChatPhase::Ready, "chat ready").await;
    assert_eq!(chat.messages().len(), 0);

    chat.send("hi").await;
    wait_until(|| chat.messages().len() == 1, "delivery").await;

    let message = &chat.messages()[0];
    assert_eq!(message.team_id, "T1");
    assert_eq!(message.user_id, "u1");
    assert_eq!(message.message, "hi");

    let resolver = ProfileResolver::new(backend);
    let profiles = resolver.resolve(&[message.user_id.clone()]).await;
    assert_eq!(
        profiles.get("u1").and_then(|p| p.display_name.clone()),
        Some("Ada".to_string())
    );
}

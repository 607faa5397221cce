use chrono::Utc;
use wt_intelligence::{ChatRole, ConversationStore, ProjectContext};

fn context(files: usize) -> ProjectContext {
    ProjectContext {
        file_count: files,
        dir_count: 0,
        files: (0..files).map(|i| format!("f{i}.rs")).collect(),
        loaded_at: Utc::now(),
    }
}

#[tokio::test]
async fn append_creates_conversation_implicitly() {
    let store = ConversationStore::default();
    store.append("s1", ChatRole::User, "hello").await;
    store.append("s1", ChatRole::Assistant, "hi").await;

    let history = store.history("s1").await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, ChatRole::User);
    assert_eq!(history[1].content, "hi");
    assert_eq!(store.active_count().await, 1);
}

#[tokio::test]
async fn unknown_session_has_empty_history() {
    let store = ConversationStore::default();
    assert!(store.history("nobody").await.is_empty());
    assert!(store.get("nobody").await.is_none());
    assert!(!store.clear("nobody").await);
}

#[tokio::test]
async fn start_resets_existing_conversation() {
    let store = ConversationStore::default();
    store.append("s1", ChatRole::User, "old").await;

    let fresh = store.start("s1").await;
    assert!(fresh.messages.is_empty());
    assert!(store.history("s1").await.is_empty());
}

#[tokio::test]
async fn ensure_reports_creation_once() {
    let store = ConversationStore::default();
    assert!(store.ensure("s1").await);
    assert!(!store.ensure("s1").await);
}

#[tokio::test]
async fn recent_returns_tail_in_order() {
    let store = ConversationStore::default();
    for i in 0..5 {
        store.append("s1", ChatRole::User, format!("m{i}")).await;
    }
    let recent: Vec<_> = store
        .recent("s1", 3)
        .await
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(recent, vec!["m2", "m3", "m4"]);
    assert_eq!(store.recent("s1", 50).await.len(), 5);
}

#[tokio::test]
async fn project_context_is_set_only_once() {
    let store = ConversationStore::default();
    assert!(!store.set_project_context("missing", context(1)).await);

    store.ensure("s1").await;
    assert!(store.set_project_context("s1", context(2)).await);
    assert!(!store.set_project_context("s1", context(9)).await);
    assert_eq!(store.project_context("s1").await.unwrap().file_count, 2);
}

#[tokio::test]
async fn least_recently_used_session_is_evicted() {
    let store = ConversationStore::new(2);
    store.start("a").await;
    store.start("b").await;
    // Touch "a" so "b" becomes the eviction candidate.
    store.append("a", ChatRole::User, "still here").await;
    store.start("c").await;

    assert_eq!(store.active_count().await, 2);
    assert!(store.get("a").await.is_some());
    assert!(store.get("b").await.is_none());
    assert!(store.get("c").await.is_some());
}

#[tokio::test]
async fn clear_removes_session() {
    let store = ConversationStore::default();
    store.append("s1", ChatRole::User, "bye").await;
    assert!(store.clear("s1").await);
    assert_eq!(store.active_count().await, 0);
}

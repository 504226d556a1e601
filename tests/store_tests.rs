//! Integration tests for the todo store adapter.
//!
//! Tests exercise `InMemoryTodoStore` through the `TodoStore` and
//! `ProfileStore` traits: write semantics, server timestamps, owner-scoped
//! live queries with full-snapshot delivery, single-error termination, and
//! scoped release of subscriptions.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use todo_sync::error::StoreError;
use todo_sync::store::backend::{Document, DocumentBackend};
use todo_sync::store::memory::InMemoryTodoStore;
use todo_sync::store::{ProfileStore, SnapshotEvent, StoreConfig, Subscription, TodoStore};
use todo_sync::types::{Priority, ProviderUser, Todo, TodoDraft, TodoPatch, UserIdentity};

const WAIT: Duration = Duration::from_secs(2);

async fn next_event(sub: &mut Subscription) -> Option<SnapshotEvent> {
    tokio::time::timeout(WAIT, sub.next())
        .await
        .expect("timed out waiting for a snapshot event")
}

async fn next_snapshot(sub: &mut Subscription) -> Vec<Todo> {
    match next_event(sub).await {
        Some(SnapshotEvent::Snapshot(todos)) => todos,
        other => panic!("expected a snapshot, got {other:?}"),
    }
}

fn titles(todos: &[Todo]) -> Vec<&str> {
    todos.iter().map(|t| t.title.as_str()).collect()
}

fn raw(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("test documents are objects"),
    }
}

// ─── Writes ─────────────────────────────────────────────────────────────────

mod write_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_add_assigns_defaults_and_server_timestamps() {
        let store = InMemoryTodoStore::new();
        let due = Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();
        let id = store
            .add(
                "alice",
                &TodoDraft::new("Pay rent")
                    .with_priority(Priority::High)
                    .with_due_date(due),
            )
            .await
            .unwrap();

        let mut sub = store.subscribe("alice").await.unwrap();
        let todos = next_snapshot(&mut sub).await;
        assert_eq!(todos.len(), 1);
        let todo = &todos[0];
        assert_eq!(todo.id, id);
        assert_eq!(todo.owner_id, "alice");
        assert!(!todo.completed);
        assert_eq!(todo.priority, Priority::High);
        assert_eq!(todo.due_date, Some(due));
        assert_eq!(todo.created_at, todo.updated_at);
    }

    #[tokio::test]
    async fn test_update_merges_and_refreshes_updated_at() {
        let store = InMemoryTodoStore::new();
        let id = store
            .add("alice", &TodoDraft::new("Draft").with_description("notes"))
            .await
            .unwrap();
        let before = store.backend().get("todos", &id).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        store
            .update(&id, &TodoPatch::new().title("Final"))
            .await
            .unwrap();

        let after = store.backend().get("todos", &id).await.unwrap().unwrap();
        assert_eq!(after["title"], "Final");
        assert_eq!(after["description"], "notes");
        assert_eq!(after["createdAt"], before["createdAt"]);
        assert_ne!(after["updatedAt"], before["updatedAt"]);
    }

    #[tokio::test]
    async fn test_update_missing_todo_is_not_found() {
        let store = InMemoryTodoStore::new();
        let err = store
            .set_completed("missing", true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = InMemoryTodoStore::new();
        let id = store.add("alice", &TodoDraft::new("x")).await.unwrap();
        store.remove(&id).await.unwrap();
        store.remove(&id).await.unwrap();
        assert!(store.backend().is_empty());
    }

    #[tokio::test]
    async fn test_set_due_date_none_removes_field() {
        let store = InMemoryTodoStore::new();
        let id = store
            .add("alice", &TodoDraft::new("x").with_due_date(Utc::now()))
            .await
            .unwrap();
        store.set_due_date(&id, None).await.unwrap();
        store.set_priority(&id, Priority::Low).await.unwrap();

        let doc = store.backend().get("todos", &id).await.unwrap().unwrap();
        assert!(!doc.contains_key("dueDate"));
        assert_eq!(doc["priority"], "low");
    }

    #[tokio::test]
    async fn test_denied_writes_surface_permission_error() {
        let store = InMemoryTodoStore::new();
        store.backend().set_writes_denied(true);
        let err = store.add("alice", &TodoDraft::new("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_custom_collection_names() {
        let store = InMemoryTodoStore::new().with_config(StoreConfig {
            todos_collection: "tasks".to_string(),
            users_collection: "people".to_string(),
        });
        let id = store.add("alice", &TodoDraft::new("x")).await.unwrap();
        assert!(store.backend().get("tasks", &id).await.unwrap().is_some());
        assert!(store.backend().get("todos", &id).await.unwrap().is_none());
    }
}

// ─── Live Queries ───────────────────────────────────────────────────────────

mod subscription_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_snapshots_are_complete_and_newest_first() {
        let store = InMemoryTodoStore::new();
        let backend = store.backend();
        backend.put_raw(
            "todos",
            "t1",
            raw(json!({"userId": "alice", "title": "first", "createdAt": "2024-01-01T00:00:00Z"})),
        );
        backend.put_raw(
            "todos",
            "t2",
            raw(json!({"userId": "alice", "title": "second",
                       "createdAt": {"seconds": 1_704_153_600, "nanoseconds": 0}})),
        );

        let mut sub = store.subscribe("alice").await.unwrap();
        assert_eq!(titles(&next_snapshot(&mut sub).await), vec!["second", "first"]);

        store.add("alice", &TodoDraft::new("third")).await.unwrap();
        assert_eq!(
            titles(&next_snapshot(&mut sub).await),
            vec!["third", "second", "first"]
        );
    }

    #[tokio::test]
    async fn test_other_owners_do_not_trigger_snapshots() {
        let store = InMemoryTodoStore::new();
        let mut sub = store.subscribe("alice").await.unwrap();
        assert!(next_snapshot(&mut sub).await.is_empty());

        store.add("bob", &TodoDraft::new("bob's")).await.unwrap();
        let quiet = tokio::time::timeout(Duration::from_millis(100), sub.next()).await;
        assert!(quiet.is_err(), "bob's write must not reach alice");

        store.add("alice", &TodoDraft::new("alice's")).await.unwrap();
        assert_eq!(titles(&next_snapshot(&mut sub).await), vec!["alice's"]);
    }

    #[tokio::test]
    async fn test_delete_delivers_snapshot_without_the_todo() {
        let store = InMemoryTodoStore::new();
        let keep = store.add("alice", &TodoDraft::new("keep")).await.unwrap();
        let gone = store.add("alice", &TodoDraft::new("gone")).await.unwrap();
        let mut sub = store.subscribe("alice").await.unwrap();
        assert_eq!(next_snapshot(&mut sub).await.len(), 2);

        store.remove(&gone).await.unwrap();
        let todos = next_snapshot(&mut sub).await;
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].id, keep);
    }

    #[tokio::test]
    async fn test_revoked_listeners_deliver_one_error() {
        let store = InMemoryTodoStore::new();
        let mut sub = store.subscribe("alice").await.unwrap();
        next_snapshot(&mut sub).await;

        store
            .backend()
            .revoke_listeners("todos", StoreError::PermissionDenied("rules".into()));

        assert_eq!(
            next_event(&mut sub).await,
            Some(SnapshotEvent::Error(StoreError::PermissionDenied(
                "rules".into()
            )))
        );
        assert!(sub.is_dead());
        assert_eq!(next_event(&mut sub).await, None);

        // Later writes never reach a dead subscription.
        store.add("alice", &TodoDraft::new("late")).await.unwrap();
        assert_eq!(next_event(&mut sub).await, None);
    }

    #[tokio::test]
    async fn test_undecodable_document_ends_subscription_with_error() {
        let store = InMemoryTodoStore::new();
        let mut sub = store.subscribe("alice").await.unwrap();
        next_snapshot(&mut sub).await;

        store.backend().put_raw(
            "todos",
            "broken",
            raw(json!({"userId": "alice", "createdAt": "2024-01-01T00:00:00Z"})),
        );
        assert!(matches!(
            next_event(&mut sub).await,
            Some(SnapshotEvent::Error(StoreError::Decode { .. }))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_fails_when_offline() {
        let store = InMemoryTodoStore::new();
        store.backend().set_available(false);
        let err = store.subscribe("alice").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.backend().live_listeners(), 0);
    }

    #[tokio::test]
    async fn test_dropping_subscription_stops_live_query() {
        let store = InMemoryTodoStore::new();
        let sub = store.subscribe("alice").await.unwrap();
        assert_eq!(store.backend().live_listeners(), 1);

        drop(sub);
        tokio::time::timeout(WAIT, async {
            while store.backend().live_listeners() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("live query was not released");
    }

    #[tokio::test]
    async fn test_store_is_usable_as_trait_object() {
        let store: Arc<dyn TodoStore> = Arc::new(InMemoryTodoStore::new());
        let id = store.add("alice", &TodoDraft::new("x")).await.unwrap();
        let mut sub = store.subscribe("alice").await.unwrap();
        assert_eq!(sub.owner_id(), "alice");
        assert_eq!(next_snapshot(&mut sub).await[0].id, id);
        sub.unsubscribe();
    }
}

// ─── Profiles ───────────────────────────────────────────────────────────────

mod profile_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_profile_is_merged_into_users_collection() {
        let store = InMemoryTodoStore::new();
        let user = UserIdentity::from_provider(&ProviderUser::new("u1", "grace@example.com"));

        store.ensure_profile(&user).await.unwrap();
        store.ensure_profile(&user).await.unwrap();

        let doc = store.backend().get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc["uid"], "u1");
        assert_eq!(doc["email"], "grace@example.com");
        assert_eq!(doc["displayName"], "grace");
        assert!(!doc.contains_key("photoURL"));
        assert!(doc["createdAt"].get("seconds").is_some());
        assert_eq!(store.backend().len(), 1);
    }

    #[tokio::test]
    async fn test_profile_merge_keeps_unrelated_fields() {
        let store = InMemoryTodoStore::new();
        store
            .backend()
            .put_raw("users", "u1", raw(json!({"theme": "dark"})));
        let user = UserIdentity::from_provider(
            &ProviderUser::new("u1", "a@b.c").with_photo_url("https://img/a.png"),
        );
        store.ensure_profile(&user).await.unwrap();

        let doc = store.backend().get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc["theme"], "dark");
        assert_eq!(doc["photoURL"], "https://img/a.png");
    }
}

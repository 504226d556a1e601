//! In-memory document backend and todo store.
//!
//! [`InMemoryBackend`] provides a thread-safe [`DocumentBackend`]
//! implementation using `DashMap<String, Document>` keyed by
//! `{collection}/{id}`, plus a broadcast change feed. It is a dumb document
//! store with no domain logic.
//!
//! [`InMemoryTodoStore`] is a thin wrapper around
//! [`GenericTodoStore<InMemoryBackend>`](crate::store::generic::GenericTodoStore)
//! with a zero-argument `new()` constructor, builder methods, and a `Default`
//! impl.
//!
//! # Failure Injection
//!
//! The backend can simulate the service failures a real deployment sees:
//!
//! - [`set_available(false)`](InMemoryBackend::set_available) fails every
//!   operation with [`StoreError::Unavailable`].
//! - [`set_writes_denied(true)`](InMemoryBackend::set_writes_denied) fails
//!   writes with [`StoreError::PermissionDenied`].
//! - [`revoke_listeners`](InMemoryBackend::revoke_listeners) terminates every
//!   live query on a collection.
//!
//! # Examples
//!
//! ```
//! use todo_sync::store::memory::InMemoryTodoStore;
//! use todo_sync::store::StoreConfig;
//!
//! let store = InMemoryTodoStore::new().with_config(StoreConfig::default());
//! assert!(store.backend().is_empty());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::store::backend::{
    is_server_timestamp, ChangeEvent, Direction, Document, DocumentBackend, MergeMode, Query,
};
use crate::store::document::{parse_timestamp, StoreTimestamp};
use crate::store::generic::GenericTodoStore;
use crate::store::profile::ProfileStore;
use crate::types::{TodoDraft, TodoPatch, UserIdentity};

use super::{StoreConfig, Subscription, TodoStore};

/// Buffered change notifications per feed receiver.
const CHANGE_FEED_CAPACITY: usize = 256;

// ---- InMemoryBackend: dumb document store using DashMap ----

/// Thread-safe in-memory document backend using [`DashMap`].
///
/// Server-timestamp sentinels are resolved to the wire timestamp shape at
/// write time, the way the managed service stores them.
///
/// # Examples
///
/// ```
/// use todo_sync::store::memory::InMemoryBackend;
/// use todo_sync::store::generic::GenericTodoStore;
///
/// let store = GenericTodoStore::new(InMemoryBackend::new());
/// assert!(store.backend().is_empty());
/// ```
#[derive(Debug)]
pub struct InMemoryBackend {
    data: DashMap<String, Document>,
    feed: broadcast::Sender<ChangeEvent>,
    available: AtomicBool,
    writes_denied: AtomicBool,
}

impl InMemoryBackend {
    /// Creates an empty in-memory backend.
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            data: DashMap::new(),
            feed,
            available: AtomicBool::new(true),
            writes_denied: AtomicBool::new(false),
        }
    }

    /// Returns the number of documents stored across all collections.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the backend contains no documents.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Simulates the service going offline (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Makes every write fail with [`StoreError::PermissionDenied`].
    pub fn set_writes_denied(&self, denied: bool) {
        self.writes_denied.store(denied, Ordering::SeqCst);
    }

    /// Terminates every live query on `collection` with `error`.
    pub fn revoke_listeners(&self, collection: &str, error: StoreError) {
        let _ = self.feed.send(ChangeEvent::ListenersRevoked {
            collection: collection.to_string(),
            error,
        });
    }

    /// Number of open change-feed receivers, i.e. live queries still running.
    pub fn live_listeners(&self) -> usize {
        self.feed.receiver_count()
    }

    /// Writes a raw document, bypassing sentinel resolution.
    ///
    /// Lets tests seed documents with arbitrary timestamp shapes.
    pub fn put_raw(&self, collection: &str, id: &str, doc: Document) {
        self.data.insert(key(collection, id), doc);
        self.notify(collection, id);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("backend offline".to_string()))
        }
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        self.check_available()?;
        if self.writes_denied.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied(
                "writes are not allowed".to_string(),
            ));
        }
        Ok(())
    }

    fn notify(&self, collection: &str, id: &str) {
        // No receivers simply means no live queries.
        let _ = self.feed.send(ChangeEvent::Changed {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn key(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

fn resolve_sentinels(fields: Document, now: DateTime<Utc>) -> Document {
    fields
        .into_iter()
        .map(|(name, value)| {
            if is_server_timestamp(&value) {
                (name, StoreTimestamp::wire_value(now))
            } else {
                (name, value)
            }
        })
        .collect()
}

fn apply_merge(target: &mut Document, fields: Document) {
    for (name, value) in fields {
        if value.is_null() {
            target.remove(&name);
        } else {
            target.insert(name, value);
        }
    }
}

#[async_trait]
impl DocumentBackend for InMemoryBackend {
    async fn insert(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        self.check_writable()?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut doc = Document::new();
        apply_merge(&mut doc, resolve_sentinels(fields, Utc::now()));
        self.data.insert(key(collection, &id), doc);
        self.notify(collection, &id);
        Ok(id)
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        mode: MergeMode,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let fields = resolve_sentinels(fields, Utc::now());
        {
            let doc_key = key(collection, id);
            match mode {
                MergeMode::Update => {
                    let mut entry =
                        self.data
                            .get_mut(&doc_key)
                            .ok_or_else(|| StoreError::NotFound {
                                collection: collection.to_string(),
                                id: id.to_string(),
                            })?;
                    apply_merge(entry.value_mut(), fields);
                },
                MergeMode::Upsert => {
                    let mut entry = self.data.entry(doc_key).or_default();
                    apply_merge(entry.value_mut(), fields);
                },
            }
        }
        self.notify(collection, id);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.check_writable()?;
        let existed = self.data.remove(&key(collection, id)).is_some();
        if existed {
            self.notify(collection, id);
        }
        Ok(existed)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_available()?;
        Ok(self
            .data
            .get(&key(collection, id))
            .map(|entry| entry.value().clone()))
    }

    async fn query(&self, query: &Query) -> Result<Vec<(String, Document)>, StoreError> {
        self.check_available()?;
        let prefix = format!("{}/", query.collection);
        let mut matches: Vec<(DateTime<Utc>, String, Document)> = self
            .data
            .iter()
            .filter_map(|entry| {
                let id = entry.key().strip_prefix(&prefix)?;
                let doc = entry.value();
                if doc.get(&query.filter_field) != Some(&query.filter_value) {
                    return None;
                }
                let order = doc.get(&query.order_field).and_then(parse_timestamp)?;
                Some((order, id.to_string(), doc.clone()))
            })
            .collect();

        matches.sort_by(|a, b| {
            let ord = a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1));
            match query.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });
        Ok(matches
            .into_iter()
            .map(|(_, id, doc)| (id, doc))
            .collect())
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

// ---- InMemoryTodoStore: thin wrapper around GenericTodoStore<InMemoryBackend> ----

/// Thread-safe in-memory todo store using [`GenericTodoStore`] with
/// [`InMemoryBackend`].
///
/// Implements [`TodoStore`] and [`ProfileStore`] by forwarding to the inner
/// store.
///
/// # Examples
///
/// ```
/// use todo_sync::store::memory::InMemoryTodoStore;
/// use todo_sync::store::TodoStore;
/// use todo_sync::types::TodoDraft;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = InMemoryTodoStore::new();
/// let id = store.add("owner-1", &TodoDraft::new("Buy milk")).await.unwrap();
/// store.set_completed(&id, true).await.unwrap();
/// # });
/// ```
#[derive(Debug)]
pub struct InMemoryTodoStore {
    inner: GenericTodoStore<InMemoryBackend>,
}

impl InMemoryTodoStore {
    /// Creates a new in-memory todo store with default collection names.
    pub fn new() -> Self {
        Self {
            inner: GenericTodoStore::new(InMemoryBackend::new()),
        }
    }

    /// Sets the store configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.inner = self.inner.with_config(config);
        self
    }

    /// Returns the underlying backend, for inspection and failure injection.
    pub fn backend(&self) -> &InMemoryBackend {
        self.inner.backend()
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        self.inner.config()
    }
}

impl Default for InMemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---- Delegation impls ----

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn add(&self, owner_id: &str, draft: &TodoDraft) -> Result<String, StoreError> {
        self.inner.add(owner_id, draft).await
    }

    async fn update(&self, id: &str, patch: &TodoPatch) -> Result<(), StoreError> {
        self.inner.update(id, patch).await
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.inner.remove(id).await
    }

    async fn subscribe(&self, owner_id: &str) -> Result<Subscription, StoreError> {
        self.inner.subscribe(owner_id).await
    }
}

#[async_trait]
impl ProfileStore for InMemoryTodoStore {
    async fn ensure_profile(&self, user: &UserIdentity) -> Result<(), StoreError> {
        self.inner.ensure_profile(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test documents are objects"),
        }
    }

    #[tokio::test]
    async fn insert_resolves_server_timestamps() {
        let backend = InMemoryBackend::new();
        let id = backend
            .insert(
                "todos",
                doc(json!({"title": "x", "createdAt": {"$serverTimestamp": true}})),
            )
            .await
            .unwrap();
        let stored = backend.get("todos", &id).await.unwrap().unwrap();
        assert!(stored["createdAt"].get("seconds").is_some());
        assert!(parse_timestamp(&stored["createdAt"]).is_some());
    }

    #[tokio::test]
    async fn update_requires_existing_document_but_upsert_creates() {
        let backend = InMemoryBackend::new();
        let err = backend
            .merge("users", "u1", doc(json!({"a": 1})), MergeMode::Update)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        backend
            .merge("users", "u1", doc(json!({"a": 1})), MergeMode::Upsert)
            .await
            .unwrap();
        backend
            .merge("users", "u1", doc(json!({"b": 2, "a": null})), MergeMode::Update)
            .await
            .unwrap();
        let stored = backend.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(Value::Object(stored), json!({"b": 2}));
    }

    #[tokio::test]
    async fn query_filters_orders_and_skips_unordered_documents() {
        let backend = InMemoryBackend::new();
        backend.put_raw(
            "todos",
            "old",
            doc(json!({"userId": "a", "createdAt": "2024-01-01T00:00:00Z"})),
        );
        backend.put_raw(
            "todos",
            "new",
            doc(json!({"userId": "a", "createdAt": {"seconds": 1_800_000_000, "nanoseconds": 0}})),
        );
        backend.put_raw("todos", "pending", doc(json!({"userId": "a"})));
        backend.put_raw(
            "todos",
            "other",
            doc(json!({"userId": "b", "createdAt": "2024-01-02T00:00:00Z"})),
        );

        let q = Query::where_eq("todos", "userId", json!("a"));
        let ids: Vec<String> = backend
            .query(&q)
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["new".to_string(), "old".to_string()]);
    }

    #[tokio::test]
    async fn offline_and_denied_backends_fail() {
        let backend = InMemoryBackend::new();
        backend.set_writes_denied(true);
        assert!(matches!(
            backend.insert("todos", Document::new()).await,
            Err(StoreError::PermissionDenied(_))
        ));
        backend.set_available(false);
        assert!(matches!(
            backend.get("todos", "x").await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn delete_reports_existence_and_notifies_once() {
        let backend = InMemoryBackend::new();
        let mut feed = backend.changes();
        let id = backend.insert("todos", Document::new()).await.unwrap();
        assert!(backend.delete("todos", &id).await.unwrap());
        assert!(!backend.delete("todos", &id).await.unwrap());

        assert!(matches!(feed.recv().await, Ok(ChangeEvent::Changed { .. })));
        assert!(matches!(feed.recv().await, Ok(ChangeEvent::Changed { .. })));
        assert!(feed.try_recv().is_err());
    }
}

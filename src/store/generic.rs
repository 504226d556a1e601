//! Generic todo store with all domain logic delegating to a [`DocumentBackend`].
//!
//! [`GenericTodoStore`] implements every adapter operation (todo encoding,
//! server timestamps, owner-scoped live queries with full-snapshot delivery,
//! profile provisioning) on top of any [`DocumentBackend`] implementation.
//!
//! Backends remain dumb document stores; all intelligence lives here.
//!
//! # Live Queries
//!
//! [`subscribe`](GenericTodoStore::subscribe) runs the owner query once,
//! delivers the result as the first snapshot, and then spawns a watcher
//! task on the backend's change feed. Every change to the todos collection
//! re-runs the query and delivers the full result set if it differs from the
//! last delivered one. A failed re-query, or listeners revoked by the
//! service, delivers one [`SnapshotEvent::Error`] and ends the watcher.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::store::backend::{ChangeEvent, Direction, DocumentBackend, MergeMode, Query};
use crate::store::document::{
    decode_todo, encode_draft, encode_patch, FIELD_CREATED_AT, FIELD_OWNER,
};
use crate::store::{SnapshotEvent, StoreConfig, Subscription};
use crate::types::{Todo, TodoDraft, TodoPatch};

/// Generic todo store that delegates all storage to a [`DocumentBackend`].
///
/// # Type Parameters
///
/// * `B` - A [`DocumentBackend`] implementation (in-memory, managed service, etc.)
#[derive(Debug)]
pub struct GenericTodoStore<B: DocumentBackend> {
    backend: Arc<B>,
    config: StoreConfig,
}

impl<B: DocumentBackend + 'static> GenericTodoStore<B> {
    /// Creates a new store over `backend` with the default configuration.
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            config: StoreConfig::default(),
        }
    }

    /// Sets the store configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn owner_query(&self, owner_id: &str) -> Query {
        Query::where_eq(
            self.config.todos_collection.as_str(),
            FIELD_OWNER,
            Value::from(owner_id),
        )
        .order_by(FIELD_CREATED_AT, Direction::Descending)
    }

    /// Creates a todo owned by `owner_id` and returns its store-assigned id.
    ///
    /// `completed` starts `false`; `createdAt` and `updatedAt` are
    /// server-assigned.
    pub async fn add(&self, owner_id: &str, draft: &TodoDraft) -> Result<String, StoreError> {
        let doc = encode_draft(owner_id, draft);
        let id = self
            .backend
            .insert(&self.config.todos_collection, doc)
            .await?;
        tracing::debug!(owner_id, todo_id = %id, "todo added");
        Ok(id)
    }

    /// Merges `patch` into an existing todo and refreshes `updatedAt`.
    ///
    /// Ownership is not checked here; callers only hold ids from their own
    /// snapshots.
    pub async fn update(&self, id: &str, patch: &TodoPatch) -> Result<(), StoreError> {
        self.backend
            .merge(
                &self.config.todos_collection,
                id,
                encode_patch(patch),
                MergeMode::Update,
            )
            .await?;
        tracing::debug!(todo_id = id, "todo updated");
        Ok(())
    }

    /// Deletes a todo. Deleting an already-deleted id succeeds.
    pub async fn remove(&self, id: &str) -> Result<(), StoreError> {
        let existed = self
            .backend
            .delete(&self.config.todos_collection, id)
            .await?;
        if !existed {
            tracing::debug!(todo_id = id, "remove of missing todo ignored");
        }
        Ok(())
    }

    /// Opens a live query over the owner's todos, newest first.
    ///
    /// The returned [`Subscription`] yields the initial snapshot immediately
    /// and a fresh full snapshot after every change. Dropping it stops the
    /// watcher.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the initial query fails.
    pub async fn subscribe(&self, owner_id: &str) -> Result<Subscription, StoreError> {
        let query = self.owner_query(owner_id);
        // Subscribe to the feed before the initial read so no change slips
        // between the two.
        let changes = self.backend.changes();
        let initial = run_query(self.backend.as_ref(), &query).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive until this function returns.
        let _ = tx.send(SnapshotEvent::Snapshot(initial.clone()));

        let cancel = CancellationToken::new();
        let watcher = Watcher {
            backend: Arc::clone(&self.backend),
            query,
            last: initial,
            tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(watcher.run(changes));
        tracing::debug!(owner_id, "todo subscription opened");

        Ok(Subscription::new(owner_id, rx, move || cancel.cancel()))
    }
}

async fn run_query<B: DocumentBackend + ?Sized>(
    backend: &B,
    query: &Query,
) -> Result<Vec<Todo>, StoreError> {
    backend
        .query(query)
        .await?
        .iter()
        .map(|(id, doc)| decode_todo(id, doc))
        .collect()
}

struct Watcher<B: DocumentBackend> {
    backend: Arc<B>,
    query: Query,
    last: Vec<Todo>,
    tx: mpsc::UnboundedSender<SnapshotEvent>,
    cancel: CancellationToken,
}

impl<B: DocumentBackend> Watcher<B> {
    async fn run(mut self, mut changes: broadcast::Receiver<ChangeEvent>) {
        loop {
            let event = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = self.tx.closed() => break,
                event = changes.recv() => event,
            };
            match event {
                Ok(ChangeEvent::Changed { collection, .. }) => {
                    if collection == self.query.collection && !self.refresh().await {
                        break;
                    }
                },
                Ok(ChangeEvent::ListenersRevoked { collection, error }) => {
                    if collection == self.query.collection {
                        tracing::warn!(error = %error, "live query revoked by service");
                        let _ = self.tx.send(SnapshotEvent::Error(error));
                        break;
                    }
                },
                // Full-snapshot delivery makes missed notifications harmless.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "change feed lagged; re-running query");
                    if !self.refresh().await {
                        break;
                    }
                },
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!(collection = %self.query.collection, "todo subscription closed");
    }

    /// Re-runs the query and delivers a changed result. Returns `false` once
    /// the subscription is dead.
    async fn refresh(&mut self) -> bool {
        match run_query(self.backend.as_ref(), &self.query).await {
            Ok(todos) => {
                if todos != self.last {
                    self.last = todos.clone();
                    return self.tx.send(SnapshotEvent::Snapshot(todos)).is_ok();
                }
                true
            },
            Err(error) => {
                tracing::warn!(error = %error, "live query failed");
                let _ = self.tx.send(SnapshotEvent::Error(error));
                false
            },
        }
    }
}

//! Task store adapter: trait, generic implementation, and supporting types.
//!
//! # Architecture
//!
//! The store has three layers:
//!
//! 1. **[`TodoStore`]** -- A type-erasure interface for use with
//!    `Arc<dyn TodoStore>` in [`TodoSyncContext`](crate::sync::TodoSyncContext).
//!
//! 2. **[`GenericTodoStore<B>`](generic::GenericTodoStore)** -- All domain
//!    logic (todo encoding, server timestamps, owner-scoped live queries,
//!    profile provisioning). Has a blanket `TodoStore` impl.
//!
//! 3. **[`DocumentBackend`]** -- Dumb document-store trait that backends
//!    implement. No domain logic.
//!
//! To create a store: `GenericTodoStore::new(backend)` and wrap in
//! `Arc<dyn TodoStore>`.
//!
//! # Subscriptions
//!
//! [`TodoStore::subscribe`] returns a [`Subscription`]: a scoped handle over
//! a channel of [`SnapshotEvent`]s. Every event carries the complete current
//! result set, never a diff. At most one [`SnapshotEvent::Error`] is
//! delivered, after which the subscription is dead. Dropping the handle (or
//! calling [`Subscription::unsubscribe`]) releases the live query exactly
//! once.

pub mod backend;
pub mod document;
pub mod generic;
pub mod memory;
pub mod profile;

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use tokio::sync::mpsc;

pub use backend::{DocumentBackend, MergeMode};
pub use profile::ProfileStore;

use crate::error::StoreError;
use crate::types::{Priority, Todo, TodoDraft, TodoPatch};

/// Collection names used by the store.
///
/// # Defaults
///
/// | Setting             | Default   |
/// |---------------------|-----------|
/// | `todos_collection`  | `"todos"` |
/// | `users_collection`  | `"users"` |
///
/// # Examples
///
/// ```
/// use todo_sync::store::StoreConfig;
///
/// let config = StoreConfig::default();
/// assert_eq!(config.todos_collection, "todos");
/// assert_eq!(config.users_collection, "users");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Collection holding todo documents.
    pub todos_collection: String,
    /// Collection holding user profile documents.
    pub users_collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            todos_collection: "todos".to_string(),
            users_collection: "users".to_string(),
        }
    }
}

/// One delivery from a live query.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    /// The complete, ordered result set.
    Snapshot(Vec<Todo>),
    /// The live query failed; no further events follow.
    Error(StoreError),
}

/// A live query handle.
///
/// Yields [`SnapshotEvent`]s through [`next`](Self::next) or as a
/// [`Stream`]. The release callback runs exactly once, on
/// [`unsubscribe`](Self::unsubscribe) or drop, whichever comes first.
///
/// # Examples
///
/// ```
/// use tokio::sync::mpsc;
/// use todo_sync::store::{SnapshotEvent, Subscription};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let (tx, rx) = mpsc::unbounded_channel();
/// let mut sub = Subscription::new("owner-1", rx, || {});
/// tx.send(SnapshotEvent::Snapshot(vec![])).unwrap();
/// assert_eq!(sub.next().await, Some(SnapshotEvent::Snapshot(vec![])));
/// sub.unsubscribe();
/// # });
/// ```
pub struct Subscription {
    owner_id: String,
    events: mpsc::UnboundedReceiver<SnapshotEvent>,
    release: Option<Box<dyn FnOnce() + Send>>,
    dead: bool,
}

impl Subscription {
    /// Wraps an event channel and its release callback.
    pub fn new(
        owner_id: impl Into<String>,
        events: mpsc::UnboundedReceiver<SnapshotEvent>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            events,
            release: Some(Box::new(release)),
            dead: false,
        }
    }

    /// The owner this live query is scoped to.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Returns `true` once an error was delivered or the producer went away.
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Waits for the next event. Returns `None` once the subscription is dead.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        if self.dead {
            return None;
        }
        let event = self.events.recv().await;
        self.observe(event)
    }

    fn observe(&mut self, event: Option<SnapshotEvent>) -> Option<SnapshotEvent> {
        match &event {
            Some(SnapshotEvent::Error(_)) | None => {
                self.dead = true;
                self.events.close();
            },
            Some(SnapshotEvent::Snapshot(_)) => {},
        }
        event
    }

    /// Releases the live query.
    pub fn unsubscribe(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            tracing::debug!(owner_id = %self.owner_id, "todo subscription released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("owner_id", &self.owner_id)
            .field("dead", &self.dead)
            .field("released", &self.release.is_none())
            .finish()
    }
}

impl Stream for Subscription {
    type Item = SnapshotEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.dead {
            return Poll::Ready(None);
        }
        match this.events.poll_recv(cx) {
            Poll::Ready(event) => Poll::Ready(this.observe(event)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Type-erasure interface for todo storage.
///
/// A blanket implementation is provided for
/// [`GenericTodoStore<B>`](generic::GenericTodoStore), so any generic store
/// satisfies this trait.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Creates a todo for `owner_id` and returns the store-assigned id.
    ///
    /// # Errors
    ///
    /// - [`StoreError::PermissionDenied`] / [`StoreError::Unavailable`] if the
    ///   service rejects the write.
    async fn add(&self, owner_id: &str, draft: &TodoDraft) -> Result<String, StoreError>;

    /// Merges `patch` into a todo and refreshes `updatedAt`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the todo does not exist.
    async fn update(&self, id: &str, patch: &TodoPatch) -> Result<(), StoreError>;

    /// Deletes a todo. Deleting a missing id is not an error.
    async fn remove(&self, id: &str) -> Result<(), StoreError>;

    /// Sets the completion flag.
    async fn set_completed(&self, id: &str, completed: bool) -> Result<(), StoreError> {
        self.update(id, &TodoPatch::new().completed(completed)).await
    }

    /// Sets the priority.
    async fn set_priority(&self, id: &str, priority: Priority) -> Result<(), StoreError> {
        self.update(id, &TodoPatch::new().priority(priority)).await
    }

    /// Sets or clears the due date.
    async fn set_due_date(
        &self,
        id: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let patch = match due_date {
            Some(due) => TodoPatch::new().due_date(due),
            None => TodoPatch::new().clear_due_date(),
        };
        self.update(id, &patch).await
    }

    /// Opens a live query over the owner's todos ordered by `createdAt`
    /// descending.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the live query cannot be established.
    async fn subscribe(&self, owner_id: &str) -> Result<Subscription, StoreError>;
}

// ---- Blanket impl for GenericTodoStore<B> ----

#[async_trait]
impl<B: DocumentBackend + 'static> TodoStore for generic::GenericTodoStore<B> {
    async fn add(&self, owner_id: &str, draft: &TodoDraft) -> Result<String, StoreError> {
        self.add(owner_id, draft).await
    }

    async fn update(&self, id: &str, patch: &TodoPatch) -> Result<(), StoreError> {
        self.update(id, patch).await
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.remove(id).await
    }

    async fn subscribe(&self, owner_id: &str) -> Result<Subscription, StoreError> {
        self.subscribe(owner_id).await
    }
}

//! The todo sync context: a local mirror of the signed-in user's todos.
//!
//! A driver task owns the only live [`Subscription`]. It reacts to two
//! inputs, in priority order:
//!
//! 1. session changes from the [`SessionBridge`](crate::session::SessionBridge)
//!    channel, which close the current subscription and open one for the new
//!    owner;
//! 2. snapshot events from the current subscription, which replace the
//!    mirror.
//!
//! Session changes are always handled before pending snapshot events, and
//! the previous subscription is released before the next one is requested,
//! so a snapshot for one user can never land in another user's mirror.
//!
//! Mutations write through the [`TodoStore`] and never touch the mirror; the
//! effect shows up with the next pushed snapshot.

use std::future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{StoreError, TodoError};
use crate::session::SessionState;
use crate::store::{SnapshotEvent, Subscription, TodoStore};
use crate::sync::state::{
    SyncState, ADD_FAILED, DELETE_FAILED, LOAD_FAILED, TOGGLE_FAILED, UPDATE_FAILED,
};
use crate::types::{Todo, TodoDraft, TodoPatch, UserIdentity};
use crate::validation::{normalize_draft, normalize_patch};

/// Keeps a local mirror of the current user's todos in sync with the store.
///
/// Dependencies are passed in explicitly: a [`TodoStore`] and a session
/// channel (see [`SessionBridge::subscribe`](crate::session::SessionBridge::subscribe)).
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use todo_sync::session::{InMemoryIdentityProvider, SessionBridge};
/// use todo_sync::store::memory::InMemoryTodoStore;
/// use todo_sync::sync::TodoSyncContext;
/// use todo_sync::types::TodoDraft;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let provider = Arc::new(InMemoryIdentityProvider::new());
/// provider.register("ada@example.com", "hunter22");
/// let bridge = SessionBridge::new(provider.clone());
/// let sync = TodoSyncContext::new(Arc::new(InMemoryTodoStore::new()), bridge.subscribe());
///
/// provider.sign_in_as("ada@example.com").unwrap();
/// sync.add_todo(TodoDraft::new("Water plants")).await.unwrap();
///
/// let state = sync.wait_for(|s| s.todos.len() == 1).await;
/// assert_eq!(state.todos[0].title, "Water plants");
/// # });
/// ```
pub struct TodoSyncContext {
    store: Arc<dyn TodoStore>,
    session: watch::Receiver<SessionState>,
    state: Arc<watch::Sender<SyncState>>,
    shutdown: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for TodoSyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoSyncContext")
            .field("state", &*self.state.borrow())
            .field("shut_down", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl TodoSyncContext {
    /// Creates the context and spawns its driver task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(store: Arc<dyn TodoStore>, session: watch::Receiver<SessionState>) -> Self {
        // A known user counts as loading until the driver's first snapshot.
        let initial = {
            let current = session.borrow();
            let owner_id = current.user.as_ref().map(|user| user.id.clone());
            SyncState {
                loading: current.resolving || owner_id.is_some(),
                owner_id,
                ..SyncState::default()
            }
        };
        let state = Arc::new(watch::Sender::new(initial));
        let shutdown = CancellationToken::new();

        let driver = Driver {
            store: Arc::clone(&store),
            session: session.clone(),
            state: Arc::clone(&state),
            shutdown: shutdown.clone(),
            active: None,
            owner: None,
        };
        let driver = tokio::spawn(driver.run());

        Self {
            store,
            session,
            state,
            shutdown,
            driver: Some(driver),
        }
    }

    /// The current state.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// The current mirror.
    pub fn todos(&self) -> Vec<Todo> {
        self.state.borrow().todos.clone()
    }

    /// `true` while waiting for the session or the first snapshot.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// The last recorded failure message.
    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// A receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Waits until `predicate` holds for the state and returns that state.
    ///
    /// Returns the last state if the driver stops first.
    pub async fn wait_for(&self, mut predicate: impl FnMut(&SyncState) -> bool) -> SyncState {
        let mut rx = self.state.subscribe();
        let result = rx.wait_for(|state| predicate(state)).await.map(|s| s.clone());
        match result {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    fn signed_in_user(&self) -> Option<UserIdentity> {
        self.session.borrow().user.clone()
    }

    fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    fn record<T>(&self, message: &'static str, result: Result<T, StoreError>) -> Result<T, TodoError> {
        result.map_err(|error| {
            tracing::warn!(error = %error, "{message}");
            self.state
                .send_modify(|state| state.error = Some(message.to_string()));
            TodoError::Store(error)
        })
    }

    /// Adds a todo for the signed-in user and returns its id.
    ///
    /// The title is trimmed and must not be empty.
    ///
    /// # Errors
    ///
    /// - [`TodoError::Validation`] if the title is blank; the store is not
    ///   called.
    /// - [`TodoError::NotSignedIn`] if no user is signed in.
    /// - [`TodoError::Store`] if the write fails.
    pub async fn add_todo(&self, draft: TodoDraft) -> Result<String, TodoError> {
        let draft = normalize_draft(draft)?;
        let user = self.signed_in_user().ok_or(TodoError::NotSignedIn)?;
        self.clear_error();
        let result = self.store.add(&user.id, &draft).await;
        self.record(ADD_FAILED, result)
    }

    /// Applies a partial update to a todo.
    ///
    /// # Errors
    ///
    /// - [`TodoError::Validation`] if the patch is empty or sets a blank
    ///   title.
    /// - [`TodoError::Store`] if the write fails.
    pub async fn update_todo(&self, id: &str, patch: TodoPatch) -> Result<(), TodoError> {
        let patch = normalize_patch(patch)?;
        self.clear_error();
        let result = self.store.update(id, &patch).await;
        self.record(UPDATE_FAILED, result)
    }

    /// Deletes a todo. Deleting a todo that is already gone succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Store`] if the store rejects the delete.
    pub async fn delete_todo(&self, id: &str) -> Result<(), TodoError> {
        self.clear_error();
        let result = self.store.remove(id).await;
        self.record(DELETE_FAILED, result)
    }

    /// Flips the completion flag of a todo in the mirror.
    ///
    /// # Errors
    ///
    /// - [`TodoError::NotFound`] if the todo is not in the mirror; the error
    ///   message is recorded and the store is not called.
    /// - [`TodoError::Store`] if the write fails.
    pub async fn toggle_todo(&self, id: &str) -> Result<(), TodoError> {
        self.clear_error();
        let current = self.state.borrow().find(id).map(|todo| todo.completed);
        let Some(completed) = current else {
            tracing::warn!(todo_id = %id, "{TOGGLE_FAILED}");
            self.state
                .send_modify(|state| state.error = Some(TOGGLE_FAILED.to_string()));
            return Err(TodoError::NotFound {
                todo_id: id.to_string(),
            });
        };
        let result = self.store.set_completed(id, !completed).await;
        self.record(TOGGLE_FAILED, result)
    }

    /// Stops the driver and releases the live subscription.
    ///
    /// In-flight mutations are not cancelled.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                tracing::warn!(error = %e, "todo sync driver ended abnormally");
            }
        }
    }
}

impl Drop for TodoSyncContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

enum Step {
    Shutdown,
    SessionChanged,
    Event(Option<SnapshotEvent>),
}

struct Driver {
    store: Arc<dyn TodoStore>,
    session: watch::Receiver<SessionState>,
    state: Arc<watch::Sender<SyncState>>,
    shutdown: CancellationToken,
    active: Option<Subscription>,
    owner: Option<String>,
}

impl Driver {
    async fn run(mut self) {
        let initial = self.session.borrow_and_update().clone();
        self.apply_session(initial).await;

        loop {
            let step = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => Step::Shutdown,
                changed = self.session.changed() => match changed {
                    Ok(()) => Step::SessionChanged,
                    Err(_) => Step::Shutdown,
                },
                event = next_event(self.active.as_mut()) => Step::Event(event),
            };
            match step {
                Step::Shutdown => break,
                Step::SessionChanged => {
                    let session = self.session.borrow_and_update().clone();
                    self.apply_session(session).await;
                },
                Step::Event(event) => self.apply_event(event),
            }
        }

        self.release();
        tracing::debug!("todo sync driver stopped");
    }

    fn release(&mut self) {
        if let Some(subscription) = self.active.take() {
            subscription.unsubscribe();
        }
    }

    async fn apply_session(&mut self, session: SessionState) {
        if session.resolving {
            return;
        }
        let next_owner = session.user.map(|user| user.id);
        if next_owner == self.owner {
            // Same user again: keep the current subscription, dead or alive.
            if next_owner.is_none() {
                self.state
                    .send_if_modified(|state| std::mem::replace(&mut state.loading, false));
            }
            return;
        }

        // Close before open: the old subscription is gone before the new
        // one is requested.
        self.release();
        self.owner.clone_from(&next_owner);
        let loading = next_owner.is_some();
        self.state
            .send_modify(|state| state.reset_for(next_owner.clone(), loading));

        let Some(owner_id) = next_owner else {
            tracing::debug!("signed out; mirror cleared");
            return;
        };
        match self.store.subscribe(&owner_id).await {
            Ok(subscription) => {
                tracing::debug!(owner_id = %owner_id, "todo subscription active");
                self.active = Some(subscription);
            },
            Err(error) => {
                tracing::warn!(owner_id = %owner_id, error = %error, "todo subscription failed");
                self.mark_dead(error);
            },
        }
    }

    fn apply_event(&mut self, event: Option<SnapshotEvent>) {
        match event {
            Some(SnapshotEvent::Snapshot(todos)) => {
                tracing::debug!(count = todos.len(), "todo snapshot received");
                self.state.send_modify(|state| state.replace_mirror(todos));
            },
            Some(SnapshotEvent::Error(error)) => {
                tracing::warn!(error = %error, "todo subscription error");
                self.release();
                self.mark_dead(error);
            },
            None => {
                tracing::debug!("todo subscription ended");
                self.release();
            },
        }
    }

    /// Records a terminal live-query error. The mirror is kept.
    fn mark_dead(&self, error: StoreError) {
        self.state.send_modify(|state| {
            state.subscription_error = Some(error);
            state.error = Some(LOAD_FAILED.to_string());
            state.loading = false;
        });
    }
}

async fn next_event(active: Option<&mut Subscription>) -> Option<SnapshotEvent> {
    match active {
        Some(subscription) => subscription.next().await,
        None => future::pending().await,
    }
}

//! Published state of a [`TodoSyncContext`](crate::sync::TodoSyncContext).

use crate::error::StoreError;
use crate::types::Todo;

/// Message recorded when the live query fails.
pub const LOAD_FAILED: &str = "Failed to load todos.";
/// Message recorded when adding a todo fails.
pub const ADD_FAILED: &str = "Failed to add todo.";
/// Message recorded when updating a todo fails.
pub const UPDATE_FAILED: &str = "Failed to update todo.";
/// Message recorded when deleting a todo fails.
pub const DELETE_FAILED: &str = "Failed to delete todo.";
/// Message recorded when toggling a todo fails.
pub const TOGGLE_FAILED: &str = "Failed to change todo status.";

/// Snapshot of the sync context's observable state.
///
/// `todos` is the mirror: always exactly the last snapshot pushed by the
/// store for `owner_id`, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    /// Owner the mirror belongs to; `None` when signed out.
    pub owner_id: Option<String>,
    /// The mirror.
    pub todos: Vec<Todo>,
    /// `true` while the session is resolving or the first snapshot for the
    /// current owner has not arrived.
    pub loading: bool,
    /// Human-readable message of the last failure, cleared when the next
    /// mutation starts.
    pub error: Option<String>,
    /// Terminal live-query error. Sticky until the owner changes.
    pub subscription_error: Option<StoreError>,
    /// Bumped every time the mirror is replaced or cleared.
    pub revision: u64,
}

impl SyncState {
    /// Looks up a todo in the mirror.
    pub fn find(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    /// `true` if the live query for the current owner has died.
    pub fn is_subscription_dead(&self) -> bool {
        self.subscription_error.is_some()
    }

    pub(crate) fn replace_mirror(&mut self, todos: Vec<Todo>) {
        self.todos = todos;
        self.loading = false;
        self.revision += 1;
    }

    pub(crate) fn reset_for(&mut self, owner_id: Option<String>, loading: bool) {
        self.owner_id = owner_id;
        self.todos.clear();
        self.loading = loading;
        self.error = None;
        self.subscription_error = None;
        self.revision += 1;
    }
}

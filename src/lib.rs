//! Reactive sync layer for per-user todo lists.
//!
//! This crate keeps a local, in-memory mirror of the signed-in user's todos
//! consistent with a remote document store that pushes full snapshots, and
//! derives the filtered, sorted list that is actually shown.
//!
//! # Overview
//!
//! Control flows in one direction:
//!
//! ```text
//! identity change -> (re)subscribe -> store pushes snapshot
//!     -> mirror replaced -> derived view recomputed
//! ```
//!
//! Mutations write through the store and are never applied to the mirror
//! directly; their effect arrives with the next snapshot.
//!
//! # Module Organization
//!
//! - [`types`] - Users, todos, and filter/sort configuration
//! - [`session`] - Identity provider boundary, session bridge, credential actions
//! - [`store`] - Todo store trait, live subscriptions, document backends
//! - [`sync`] - The sync context owning the mirror
//! - [`view`] - Derived view, memoization, statistics
//! - [`validation`] - Input checks run before any external call
//! - [`error`] - Error types
//! - [`config`] - TOML and environment configuration
//! - `logging` - Subscriber installation (feature `logging`)
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use todo_sync::config::SyncConfig;
//! use todo_sync::session::{InMemoryIdentityProvider, SessionBridge};
//! use todo_sync::store::memory::InMemoryTodoStore;
//! use todo_sync::sync::TodoSyncContext;
//! use todo_sync::types::{TodoDraft, TodoFilters};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let config = SyncConfig::default();
//! let provider = Arc::new(InMemoryIdentityProvider::new());
//! let store = Arc::new(InMemoryTodoStore::new().with_config(config.store_config()));
//!
//! let bridge = SessionBridge::new(provider.clone());
//! let actions = config.credential_actions(provider.clone(), store.clone());
//! let sync = TodoSyncContext::new(store.clone(), bridge.subscribe());
//! let mut view = config.memoized_view().unwrap();
//!
//! actions.sign_up("ada@example.com", "hunter22").await.unwrap();
//! sync.add_todo(TodoDraft::new("Write the report")).await.unwrap();
//!
//! let state = sync.wait_for(|s| !s.todos.is_empty()).await;
//! let todos = view.get(state.revision, &state.todos, &TodoFilters::default());
//! assert_eq!(todos[0].title, "Write the report");
//! # });
//! ```

pub mod config;
pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod session;
pub mod store;
pub mod sync;
pub mod types;
pub mod validation;
pub mod view;

// Re-exports for ergonomic access
pub use config::SyncConfig;
pub use error::{AuthFlowError, CredentialError, StoreError, TodoError};
pub use session::{CredentialActions, SessionBridge, SessionState};
pub use store::{SnapshotEvent, Subscription, TodoStore};
pub use sync::{SyncState, TodoSyncContext};
pub use types::{Priority, Todo, TodoDraft, TodoFilters, TodoPatch, UserIdentity};
pub use view::{derive_view, derive_view_at, MemoizedView};

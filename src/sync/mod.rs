//! Task sync context.
//!
//! [`TodoSyncContext`] owns the local mirror of the signed-in user's todos.
//! It follows the session channel, holds exactly one live store
//! subscription per owner, and publishes [`SyncState`] on a watch channel.

pub mod context;
pub mod state;

pub use context::TodoSyncContext;
pub use state::SyncState;

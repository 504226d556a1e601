//! Session bridge: the origin of "who is signed in".
//!
//! [`SessionBridge`] registers one listener with the identity provider and
//! republishes each event as a normalized [`SessionState`] on a
//! [`tokio::sync::watch`] channel. Consumers hold a receiver instead of
//! reaching for a global.

use std::sync::Arc;

use tokio::sync::watch;

use crate::session::provider::{IdentityProvider, ListenerHandle};
use crate::types::UserIdentity;

/// Published session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// The signed-in user, or `None`.
    pub user: Option<UserIdentity>,
    /// `true` until the provider reports the initial session state.
    pub resolving: bool,
}

impl SessionState {
    /// The state before the provider has reported anything.
    pub fn resolving() -> Self {
        Self {
            user: None,
            resolving: true,
        }
    }

    /// A resolved state.
    pub fn resolved(user: Option<UserIdentity>) -> Self {
        Self {
            user,
            resolving: false,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::resolving()
    }
}

/// Bridges identity provider notifications into a [`watch`] channel.
///
/// The provider listener stays registered for exactly the lifetime of the
/// bridge.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use todo_sync::session::{InMemoryIdentityProvider, SessionBridge};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let provider = Arc::new(InMemoryIdentityProvider::new());
/// let bridge = SessionBridge::new(provider.clone());
/// assert!(!bridge.is_resolving());
/// assert!(bridge.current_user().is_none());
///
/// provider.register("ada@example.com", "hunter22");
/// provider.sign_in_as("ada@example.com").unwrap();
/// assert_eq!(bridge.current_user().unwrap().email, "ada@example.com");
/// # });
/// ```
#[derive(Debug)]
pub struct SessionBridge {
    state: watch::Receiver<SessionState>,
    _listener: ListenerHandle,
}

impl SessionBridge {
    /// Registers a listener with `provider` and starts publishing.
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (tx, rx) = watch::channel(SessionState::resolving());
        let listener = provider.on_session_change(Box::new(move |user| {
            let user = user.as_ref().map(UserIdentity::from_provider);
            match &user {
                Some(identity) => tracing::debug!(user_id = %identity.id, "session changed"),
                None => tracing::debug!("session ended"),
            }
            // Every event fully replaces the previous identity.
            tx.send_replace(SessionState::resolved(user));
        }));
        Self {
            state: rx,
            _listener: listener,
        }
    }

    /// The current identity, if any.
    pub fn current_user(&self) -> Option<UserIdentity> {
        self.state.borrow().user.clone()
    }

    /// `true` until the provider has reported the initial session state.
    pub fn is_resolving(&self) -> bool {
        self.state.borrow().resolving
    }

    /// The current session state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// A receiver for session changes, for dependency injection into
    /// [`TodoSyncContext`](crate::sync::TodoSyncContext).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Waits until the initial session state is known and returns it.
    pub async fn wait_resolved(&self) -> SessionState {
        let mut rx = self.state.clone();
        let result = rx
            .wait_for(|state| !state.resolving)
            .await
            .map(|state| state.clone());
        match result {
            Ok(state) => state,
            // The sender lives in the provider listener; if it is gone the
            // last published value is final.
            Err(_) => rx.borrow().clone(),
        }
    }
}

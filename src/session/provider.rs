//! Identity provider boundary.
//!
//! The identity provider is an external collaborator. This module only
//! describes the contract the rest of the crate relies on: a session-change
//! notification stream and single-round-trip credential calls.

use std::fmt;

use async_trait::async_trait;

use crate::error::CredentialError;
use crate::types::ProviderUser;

/// Callback invoked with the provider's user object on every session change.
///
/// `None` means signed out.
pub type SessionListener = Box<dyn Fn(Option<ProviderUser>) + Send + Sync>;

/// Registration of a [`SessionListener`].
///
/// Deregisters the listener on drop, so the registration cannot outlive its
/// owner.
pub struct ListenerHandle {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ListenerHandle {
    /// Creates a handle that runs `release` when dropped.
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Deregisters the listener now.
    pub fn remove(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// The identity provider's client API.
///
/// Every credential call is a single asynchronous round trip. Successful
/// calls also fire the registered session listeners, the same way the
/// provider's own session stream does.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Registers `listener`.
    ///
    /// The provider invokes it once the initial session state is known and
    /// again after every sign-in or sign-out.
    fn on_session_change(&self, listener: SessionListener) -> ListenerHandle;

    /// Creates an email/password account and signs it in.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderUser, CredentialError>;

    /// Signs in with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser, CredentialError>;

    /// Runs federated sign-in in a popup and returns its result.
    async fn sign_in_with_popup(&self) -> Result<ProviderUser, CredentialError>;

    /// Starts a federated sign-in that leaves the application.
    async fn begin_redirect_sign_in(&self) -> Result<(), CredentialError>;

    /// Retrieves the result of a redirect sign-in after control returns.
    ///
    /// Returns `None` if no redirect sign-in is pending.
    async fn redirect_result(&self) -> Result<Option<ProviderUser>, CredentialError>;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<(), CredentialError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn handle_releases_exactly_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let handle = ListenerHandle::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        handle.remove();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let c = Arc::clone(&count);
        drop(ListenerHandle::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}

//! In-memory identity provider.
//!
//! [`InMemoryIdentityProvider`] keeps accounts in a map and fires session
//! listeners synchronously, which makes session sequences fully
//! deterministic in tests. It mirrors the provider's observable rules:
//!
//! - a new listener is called once the initial session state is known
//!   (immediately, unless the provider was created with
//!   [`pending`](InMemoryIdentityProvider::pending));
//! - every successful sign-in, sign-up and sign-out notifies all listeners;
//! - error codes match the provider's wire codes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::error::{CredentialError, CredentialErrorCode};
use crate::session::provider::{IdentityProvider, ListenerHandle, SessionListener};
use crate::types::ProviderUser;
use crate::validation::MIN_PASSWORD_LENGTH;

type SharedListener = Arc<dyn Fn(Option<ProviderUser>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, SharedListener)>,
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    user: ProviderUser,
}

#[derive(Debug, Default)]
struct ProviderState {
    accounts: HashMap<String, Account>,
    current: Option<ProviderUser>,
    resolved: bool,
    federated: Option<ProviderUser>,
    redirect_pending: bool,
    fail_next: Option<CredentialError>,
}

/// Identity provider backed by in-process state.
///
/// # Examples
///
/// ```
/// use todo_sync::session::{IdentityProvider, InMemoryIdentityProvider};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let provider = InMemoryIdentityProvider::new();
/// let user = provider.create_account("ada@example.com", "hunter22").await.unwrap();
/// assert_eq!(provider.current_user().unwrap().uid, user.uid);
///
/// let err = provider.sign_in("ada@example.com", "wrong!!").await.unwrap_err();
/// assert_eq!(err.code.as_str(), "auth/wrong-password");
/// # });
/// ```
pub struct InMemoryIdentityProvider {
    state: Mutex<ProviderState>,
    listeners: Arc<Mutex<Listeners>>,
}

impl InMemoryIdentityProvider {
    /// Creates a provider whose initial state (signed out) is known at once.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProviderState {
                resolved: true,
                ..ProviderState::default()
            }),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Creates a provider that has not yet determined the initial session.
    ///
    /// Listeners are not called until [`resolve`](Self::resolve).
    pub fn pending() -> Self {
        Self {
            state: Mutex::new(ProviderState::default()),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Completes initial session detection with `user` (or signed out).
    pub fn resolve(&self, user: Option<ProviderUser>) {
        {
            let mut state = self.state.lock();
            state.resolved = true;
            state.current = user;
        }
        self.notify();
    }

    /// Adds an email/password account without signing it in.
    pub fn register(&self, email: &str, password: &str) -> ProviderUser {
        let user = new_user(email);
        self.state.lock().accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Signs in a registered account without checking its password.
    ///
    /// # Errors
    ///
    /// Returns `auth/user-not-found` if no account exists for `email`.
    pub fn sign_in_as(&self, email: &str) -> Result<ProviderUser, CredentialError> {
        let user = {
            let state = self.state.lock();
            state
                .accounts
                .get(email)
                .map(|account| account.user.clone())
                .ok_or_else(|| error(CredentialErrorCode::UserNotFound))?
        };
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    /// Sets the user returned by federated sign-in. Without one, federated
    /// sign-in fails with `auth/operation-not-allowed`.
    pub fn set_federated_user(&self, user: ProviderUser) {
        self.state.lock().federated = Some(user);
    }

    /// Makes the next credential call fail with `error`.
    pub fn fail_next_call(&self, error: CredentialError) {
        self.state.lock().fail_next = Some(error);
    }

    /// The currently signed-in user.
    pub fn current_user(&self) -> Option<ProviderUser> {
        self.state.lock().current.clone()
    }

    /// Number of registered session listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().entries.len()
    }

    fn take_failure(&self) -> Result<(), CredentialError> {
        match self.state.lock().fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn set_current(&self, user: Option<ProviderUser>) {
        self.state.lock().current = user;
        self.notify();
    }

    /// Calls every listener with the current user. No lock is held while
    /// listeners run.
    fn notify(&self) {
        let current = self.state.lock().current.clone();
        let listeners: Vec<SharedListener> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(current.clone());
        }
    }

    fn federated_user(&self) -> Result<ProviderUser, CredentialError> {
        self.state
            .lock()
            .federated
            .clone()
            .ok_or_else(|| error(CredentialErrorCode::OperationNotAllowed))
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryIdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryIdentityProvider")
            .field("state", &*self.state.lock())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

fn error(code: CredentialErrorCode) -> CredentialError {
    let message = code.as_str().to_string();
    CredentialError::new(code, message)
}

fn new_user(email: &str) -> ProviderUser {
    ProviderUser::new(uuid::Uuid::new_v4().simple().to_string(), email)
        .with_creation_time(Utc::now())
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn on_session_change(&self, listener: SessionListener) -> ListenerHandle {
        let listener: SharedListener = Arc::from(listener);
        let id = {
            let mut listeners = self.listeners.lock();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::clone(&listener)));
            id
        };

        let initial = {
            let state = self.state.lock();
            state.resolved.then(|| state.current.clone())
        };
        if let Some(current) = initial {
            listener(current);
        }

        let listeners = Arc::downgrade(&self.listeners);
        ListenerHandle::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.lock().entries.retain(|(entry, _)| *entry != id);
            }
        })
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderUser, CredentialError> {
        self.take_failure()?;
        let user = {
            let mut state = self.state.lock();
            if !email.contains('@') {
                return Err(error(CredentialErrorCode::InvalidEmail));
            }
            if password.chars().count() < MIN_PASSWORD_LENGTH {
                return Err(error(CredentialErrorCode::WeakPassword));
            }
            if state.accounts.contains_key(email) {
                return Err(error(CredentialErrorCode::EmailAlreadyInUse));
            }
            let user = new_user(email);
            state.accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    user: user.clone(),
                },
            );
            user
        };
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser, CredentialError> {
        self.take_failure()?;
        let user = {
            let state = self.state.lock();
            let account = state
                .accounts
                .get(email)
                .ok_or_else(|| error(CredentialErrorCode::UserNotFound))?;
            if account.password != password {
                return Err(error(CredentialErrorCode::WrongPassword));
            }
            account.user.clone()
        };
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in_with_popup(&self) -> Result<ProviderUser, CredentialError> {
        self.take_failure()?;
        let user = self.federated_user()?;
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    async fn begin_redirect_sign_in(&self) -> Result<(), CredentialError> {
        self.take_failure()?;
        self.federated_user()?;
        self.state.lock().redirect_pending = true;
        Ok(())
    }

    async fn redirect_result(&self) -> Result<Option<ProviderUser>, CredentialError> {
        self.take_failure()?;
        let pending = std::mem::take(&mut self.state.lock().redirect_pending);
        if !pending {
            return Ok(None);
        }
        let user = self.federated_user()?;
        self.set_current(Some(user.clone()));
        Ok(Some(user))
    }

    async fn sign_out(&self) -> Result<(), CredentialError> {
        self.take_failure()?;
        self.set_current(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener(count: &Arc<AtomicUsize>) -> SessionListener {
        let count = Arc::clone(count);
        Box::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn resolved_provider_calls_new_listener_immediately() {
        let provider = InMemoryIdentityProvider::new();
        let count = Arc::new(AtomicUsize::new(0));
        let _handle = provider.on_session_change(counting_listener(&count));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pending_provider_waits_for_resolve() {
        let provider = InMemoryIdentityProvider::pending();
        let count = Arc::new(AtomicUsize::new(0));
        let _handle = provider.on_session_change(counting_listener(&count));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        provider.resolve(None);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_handle_deregisters() {
        let provider = InMemoryIdentityProvider::new();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = provider.on_session_change(counting_listener(&count));
        assert_eq!(provider.listener_count(), 1);
        drop(handle);
        assert_eq!(provider.listener_count(), 0);
        provider.resolve(None);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn create_account_reports_provider_codes() {
        let provider = InMemoryIdentityProvider::new();
        let err = provider.create_account("nope", "hunter22").await.unwrap_err();
        assert_eq!(err.code, CredentialErrorCode::InvalidEmail);
        let err = provider.create_account("a@b.c", "123").await.unwrap_err();
        assert_eq!(err.code, CredentialErrorCode::WeakPassword);
        provider.create_account("a@b.c", "hunter22").await.unwrap();
        let err = provider.create_account("a@b.c", "hunter22").await.unwrap_err();
        assert_eq!(err.code, CredentialErrorCode::EmailAlreadyInUse);
    }

    #[tokio::test]
    async fn redirect_result_is_consumed_once() {
        let provider = InMemoryIdentityProvider::new();
        provider.set_federated_user(ProviderUser::new("fed", "fed@example.com"));
        assert_eq!(provider.redirect_result().await.unwrap(), None);
        provider.begin_redirect_sign_in().await.unwrap();
        assert!(provider.current_user().is_none());
        let user = provider.redirect_result().await.unwrap().unwrap();
        assert_eq!(user.uid, "fed");
        assert_eq!(provider.redirect_result().await.unwrap(), None);
    }

    #[tokio::test]
    async fn injected_failure_applies_to_one_call() {
        let provider = InMemoryIdentityProvider::new();
        provider.set_federated_user(ProviderUser::new("fed", "fed@example.com"));
        provider.fail_next_call(CredentialError::from_code("auth/popup-blocked"));
        assert!(provider.sign_in_with_popup().await.is_err());
        assert!(provider.sign_in_with_popup().await.is_ok());
    }
}

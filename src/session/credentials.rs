//! Credential actions: sign-up, sign-in, federated sign-in, sign-out.
//!
//! Each action is one round trip to the identity provider with no local
//! state. Sign-up and federated sign-in follow up with a profile write
//! through a [`ProfileStore`]; a failure of that write is reported as
//! [`AuthFlowError::ProfileProvisioning`], never as an authentication
//! failure, because the session is already valid at that point.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AuthFlowError, CredentialError};
use crate::session::provider::IdentityProvider;
use crate::store::ProfileStore;
use crate::types::{ProviderUser, UserIdentity};

/// How federated sign-in is carried out for a deployment.
///
/// The two strategies are alternatives; a [`CredentialActions`] instance
/// uses exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignInStrategy {
    /// The result comes back from the same call.
    #[default]
    Popup,
    /// Control leaves the application; the result is retrieved on return
    /// with [`CredentialActions::complete_redirect_sign_in`].
    Redirect,
}

impl fmt::Display for SignInStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Popup => f.write_str("popup"),
            Self::Redirect => f.write_str("redirect"),
        }
    }
}

/// Outcome of [`CredentialActions::sign_in_with_provider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSignIn {
    /// The user is signed in and the profile is provisioned.
    SignedIn(UserIdentity),
    /// A redirect sign-in started; call
    /// [`complete_redirect_sign_in`](CredentialActions::complete_redirect_sign_in)
    /// when control returns.
    RedirectStarted,
}

/// Stateless wrappers over the identity provider's credential calls.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use todo_sync::session::{CredentialActions, InMemoryIdentityProvider};
/// use todo_sync::store::memory::InMemoryTodoStore;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let provider = Arc::new(InMemoryIdentityProvider::new());
/// let actions = CredentialActions::new(provider, Arc::new(InMemoryTodoStore::new()));
///
/// let user = actions.sign_up("ada@example.com", "hunter22").await.unwrap();
/// assert_eq!(user.email, "ada@example.com");
/// actions.sign_out().await.unwrap();
/// # });
/// ```
#[derive(Clone)]
pub struct CredentialActions {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    strategy: SignInStrategy,
}

impl fmt::Debug for CredentialActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialActions")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl CredentialActions {
    /// Creates credential actions using the popup strategy.
    pub fn new(provider: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            provider,
            profiles,
            strategy: SignInStrategy::default(),
        }
    }

    /// Sets the federated sign-in strategy.
    pub fn with_strategy(mut self, strategy: SignInStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The federated sign-in strategy in use.
    pub fn strategy(&self) -> SignInStrategy {
        self.strategy
    }

    /// Creates an email/password account and provisions its profile.
    ///
    /// # Errors
    ///
    /// - [`AuthFlowError::Credential`] if the provider rejects the account.
    /// - [`AuthFlowError::ProfileProvisioning`] if the account was created
    ///   and signed in but the profile write failed.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<UserIdentity, AuthFlowError> {
        let user = self
            .provider
            .create_account(email, password)
            .await
            .map_err(|e| log_credential_failure("sign_up", e))?;
        tracing::info!(user_id = %user.uid, "account created");
        self.provision(&user).await
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFlowError::Credential`] if the provider rejects the
    /// credentials.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, AuthFlowError> {
        let user = self
            .provider
            .sign_in(email, password)
            .await
            .map_err(|e| log_credential_failure("sign_in", e))?;
        tracing::info!(user_id = %user.uid, "signed in");
        Ok(UserIdentity::from_provider(&user))
    }

    /// Runs federated sign-in with the configured strategy.
    ///
    /// Under [`SignInStrategy::Popup`] the user is signed in and provisioned
    /// before this returns. Under [`SignInStrategy::Redirect`] this only
    /// starts the flow.
    ///
    /// # Errors
    ///
    /// - [`AuthFlowError::Credential`] if the provider rejects the request
    ///   (popup blocked or closed, unauthorized domain, ...).
    /// - [`AuthFlowError::ProfileProvisioning`] if the popup sign-in
    ///   succeeded but the profile write failed.
    pub async fn sign_in_with_provider(&self) -> Result<ProviderSignIn, AuthFlowError> {
        match self.strategy {
            SignInStrategy::Popup => {
                let user = self
                    .provider
                    .sign_in_with_popup()
                    .await
                    .map_err(|e| log_credential_failure("sign_in_with_provider", e))?;
                tracing::info!(user_id = %user.uid, strategy = %self.strategy, "signed in with provider");
                self.provision(&user).await.map(ProviderSignIn::SignedIn)
            },
            SignInStrategy::Redirect => {
                self.provider
                    .begin_redirect_sign_in()
                    .await
                    .map_err(|e| log_credential_failure("sign_in_with_provider", e))?;
                tracing::info!(strategy = %self.strategy, "provider sign-in started");
                Ok(ProviderSignIn::RedirectStarted)
            },
        }
    }

    /// Retrieves the result of a redirect sign-in and provisions the profile.
    ///
    /// Returns `Ok(None)` if no redirect sign-in was pending.
    ///
    /// # Errors
    ///
    /// Same as [`sign_in_with_provider`](Self::sign_in_with_provider).
    pub async fn complete_redirect_sign_in(&self) -> Result<Option<UserIdentity>, AuthFlowError> {
        let Some(user) = self
            .provider
            .redirect_result()
            .await
            .map_err(|e| log_credential_failure("complete_redirect_sign_in", e))?
        else {
            return Ok(None);
        };
        tracing::info!(user_id = %user.uid, strategy = %self.strategy, "signed in with provider");
        self.provision(&user).await.map(Some)
    }

    /// Ends the current session.
    ///
    /// # Errors
    ///
    /// Returns the provider error if sign-out fails.
    pub async fn sign_out(&self) -> Result<(), CredentialError> {
        self.provider
            .sign_out()
            .await
            .map_err(|e| log_credential_failure("sign_out", e))?;
        tracing::info!("signed out");
        Ok(())
    }

    async fn provision(&self, user: &ProviderUser) -> Result<UserIdentity, AuthFlowError> {
        let identity = UserIdentity::from_provider(user);
        match self.profiles.ensure_profile(&identity).await {
            Ok(()) => Ok(identity),
            Err(source) => {
                tracing::warn!(
                    user_id = %identity.id,
                    error = %source,
                    "profile provisioning failed after sign-in"
                );
                Err(AuthFlowError::ProfileProvisioning {
                    user: identity,
                    source,
                })
            },
        }
    }
}

fn log_credential_failure(action: &'static str, error: CredentialError) -> CredentialError {
    tracing::warn!(action, code = %error.code, "credential action failed");
    error
}

//! Error types for todo sync operations.
//!
//! The taxonomy follows the layers of the crate:
//!
//! - [`StoreError`] - failures reported by the document store (writes,
//!   subscription setup, decoding of pushed documents).
//! - [`CredentialError`] - failures reported by the identity provider,
//!   carrying a distinguishable [`CredentialErrorCode`].
//! - [`AuthFlowError`] - the outcome of a credential action; separates an
//!   authentication failure from a profile-provisioning failure that happened
//!   after the session was already established.
//! - [`TodoError`] - the caller-facing error of
//!   [`TodoSyncContext`](crate::sync::TodoSyncContext) mutations.
//! - [`ConfigError`] - configuration loading and validation.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::types::UserIdentity;

/// Errors reported by the document store.
///
/// # Examples
///
/// ```
/// use todo_sync::error::StoreError;
///
/// let err = StoreError::NotFound {
///     collection: "todos".to_string(),
///     id: "abc".to_string(),
/// };
/// assert_eq!(err.to_string(), "document not found: todos/abc");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed document does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound {
        /// Collection that was addressed.
        collection: String,
        /// Document id that was addressed.
        id: String,
    },

    /// The service rejected the operation for the current credentials.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The service could not be reached or dropped the connection.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored document could not be decoded into a [`Todo`](crate::types::Todo).
    #[error("failed to decode document {id}: {reason}")]
    Decode {
        /// Id of the document that failed to decode.
        id: String,
        /// Why decoding failed.
        reason: String,
    },

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Provider-level error codes surfaced by credential operations.
///
/// Codes are parsed from the provider's wire representation (for example
/// `auth/email-already-in-use`). Unrecognized codes are preserved verbatim
/// in [`CredentialErrorCode::Unknown`].
///
/// # Examples
///
/// ```
/// use todo_sync::error::CredentialErrorCode;
///
/// let code: CredentialErrorCode = "auth/popup-blocked".parse().unwrap();
/// assert_eq!(code, CredentialErrorCode::PopupBlocked);
/// assert_eq!(code.as_str(), "auth/popup-blocked");
///
/// let code: CredentialErrorCode = "auth/something-new".parse().unwrap();
/// assert_eq!(code, CredentialErrorCode::Unknown("auth/something-new".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CredentialErrorCode {
    /// An account already exists for this email.
    EmailAlreadyInUse,
    /// The email address is malformed.
    InvalidEmail,
    /// The password does not meet the provider's strength rules.
    WeakPassword,
    /// The password does not match the account.
    WrongPassword,
    /// No account exists for this email.
    UserNotFound,
    /// The supplied credential is invalid or expired.
    InvalidCredential,
    /// The user closed the federated sign-in popup.
    PopupClosedByUser,
    /// The browser blocked the federated sign-in popup.
    PopupBlocked,
    /// Another popup request superseded this one.
    CancelledPopupRequest,
    /// The application origin is not authorized with the provider.
    UnauthorizedDomain,
    /// The sign-in method is disabled for this project.
    OperationNotAllowed,
    /// The provider could not be reached.
    NetworkRequestFailed,
    /// The provider throttled the request.
    TooManyRequests,
    /// Any code this crate does not recognize.
    Unknown(String),
}

impl CredentialErrorCode {
    /// Returns the provider wire code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::InvalidEmail => "auth/invalid-email",
            Self::WeakPassword => "auth/weak-password",
            Self::WrongPassword => "auth/wrong-password",
            Self::UserNotFound => "auth/user-not-found",
            Self::InvalidCredential => "auth/invalid-credential",
            Self::PopupClosedByUser => "auth/popup-closed-by-user",
            Self::PopupBlocked => "auth/popup-blocked",
            Self::CancelledPopupRequest => "auth/cancelled-popup-request",
            Self::UnauthorizedDomain => "auth/unauthorized-domain",
            Self::OperationNotAllowed => "auth/operation-not-allowed",
            Self::NetworkRequestFailed => "auth/network-request-failed",
            Self::TooManyRequests => "auth/too-many-requests",
            Self::Unknown(code) => code,
        }
    }
}

impl FromStr for CredentialErrorCode {
    type Err = std::convert::Infallible;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Ok(match code {
            "auth/email-already-in-use" => Self::EmailAlreadyInUse,
            "auth/invalid-email" => Self::InvalidEmail,
            "auth/weak-password" => Self::WeakPassword,
            "auth/wrong-password" => Self::WrongPassword,
            "auth/user-not-found" => Self::UserNotFound,
            "auth/invalid-credential" => Self::InvalidCredential,
            "auth/popup-closed-by-user" => Self::PopupClosedByUser,
            "auth/popup-blocked" => Self::PopupBlocked,
            "auth/cancelled-popup-request" => Self::CancelledPopupRequest,
            "auth/unauthorized-domain" => Self::UnauthorizedDomain,
            "auth/operation-not-allowed" => Self::OperationNotAllowed,
            "auth/network-request-failed" => Self::NetworkRequestFailed,
            "auth/too-many-requests" => Self::TooManyRequests,
            other => Self::Unknown(other.to_string()),
        })
    }
}

impl fmt::Display for CredentialErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error reported by the identity provider.
///
/// Never retried automatically. Use [`user_message`](Self::user_message)
/// for text suitable to show next to a sign-in form.
///
/// # Examples
///
/// ```
/// use todo_sync::error::{CredentialError, CredentialErrorCode};
///
/// let err = CredentialError::from_code("auth/weak-password");
/// assert_eq!(err.code, CredentialErrorCode::WeakPassword);
/// assert_eq!(err.user_message(), "The password is too weak.");
///
/// let err = CredentialError::from_code("auth/quota-exceeded");
/// assert_eq!(err.user_message(), "Authentication failed. Please try again.");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("credential error {code}: {message}")]
pub struct CredentialError {
    /// The distinguishable provider code.
    pub code: CredentialErrorCode,
    /// The provider's diagnostic message.
    pub message: String,
}

impl CredentialError {
    /// Creates an error with an explicit diagnostic message.
    pub fn new(code: CredentialErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates an error from a provider wire code, using the code as the message.
    pub fn from_code(code: &str) -> Self {
        let parsed = match code.parse() {
            Ok(parsed) => parsed,
            Err(never) => match never {},
        };
        Self::new(parsed, code)
    }

    /// Maps the error code to a user-facing message.
    ///
    /// Unrecognized codes fall back to a generic message.
    pub fn user_message(&self) -> &'static str {
        match self.code {
            CredentialErrorCode::EmailAlreadyInUse => "This email address is already in use.",
            CredentialErrorCode::InvalidEmail => "The email address is not valid.",
            CredentialErrorCode::WeakPassword => "The password is too weak.",
            CredentialErrorCode::WrongPassword
            | CredentialErrorCode::UserNotFound
            | CredentialErrorCode::InvalidCredential => "Incorrect email or password.",
            CredentialErrorCode::PopupClosedByUser => "Sign-in was cancelled.",
            CredentialErrorCode::PopupBlocked => {
                "The sign-in popup was blocked. Please allow popups and try again."
            },
            CredentialErrorCode::CancelledPopupRequest => "Another sign-in popup is already open.",
            CredentialErrorCode::UnauthorizedDomain => {
                "This domain is not authorized for sign-in."
            },
            CredentialErrorCode::OperationNotAllowed => "This sign-in method is not enabled.",
            CredentialErrorCode::NetworkRequestFailed => {
                "Network error. Check your connection and try again."
            },
            CredentialErrorCode::TooManyRequests => "Too many attempts. Please try again later.",
            CredentialErrorCode::Unknown(_) => "Authentication failed. Please try again.",
        }
    }
}

/// The outcome of a failed credential action.
///
/// `ProfileProvisioning` means authentication succeeded and the session is
/// valid, but the follow-up profile write failed. Callers decide whether to
/// retry on the next sign-in or surface a warning.
#[derive(Error, Debug)]
pub enum AuthFlowError {
    /// The identity provider rejected the request.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The session is valid but the profile document could not be written.
    #[error("signed in as {} but profile provisioning failed: {source}", .user.id)]
    ProfileProvisioning {
        /// The identity that was established.
        user: UserIdentity,
        /// Why the profile write failed.
        source: StoreError,
    },
}

impl AuthFlowError {
    /// Returns `true` if the session was established despite the error.
    pub fn session_established(&self) -> bool {
        matches!(self, Self::ProfileProvisioning { .. })
    }
}

/// Errors returned by [`TodoSyncContext`](crate::sync::TodoSyncContext) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// Input was rejected before reaching the store.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation needs a signed-in user.
    #[error("no user is signed in")]
    NotSignedIn,

    /// The todo is not present in the local mirror.
    #[error("todo not found: {todo_id}")]
    NotFound {
        /// The id that was looked up.
        todo_id: String,
    },

    /// The store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path of the configuration file.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`SyncConfig`](crate::config::SyncConfig).
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// A value is present but unusable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

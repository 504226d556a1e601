//! Session handling: who is signed in, and how they sign in.
//!
//! - [`IdentityProvider`] is the boundary to the external identity service.
//! - [`SessionBridge`] turns provider notifications into a
//!   [`watch`](tokio::sync::watch) channel of [`SessionState`].
//! - [`CredentialActions`] wraps sign-up, sign-in, federated sign-in and
//!   sign-out, including profile provisioning.
//! - [`InMemoryIdentityProvider`] is a self-contained provider for tests and
//!   local runs.

pub mod bridge;
pub mod credentials;
pub mod memory;
pub mod provider;

pub use bridge::{SessionBridge, SessionState};
pub use credentials::{CredentialActions, ProviderSignIn, SignInStrategy};
pub use memory::InMemoryIdentityProvider;
pub use provider::{IdentityProvider, ListenerHandle, SessionListener};

//! Data model for users, todos, and view configuration.
//!
//! - [`user`] - [`UserIdentity`] and the provider-native [`ProviderUser`]
//! - [`todo`] - [`Todo`], [`Priority`], and the write-side [`TodoDraft`] / [`TodoPatch`]
//! - [`filter`] - filter/sort configuration consumed by the derived view

pub mod filter;
pub mod todo;
pub mod user;

pub use filter::*;
pub use todo::*;
pub use user::*;

//! User profile provisioning.
//!
//! After a successful sign-up or first federated sign-in, a profile document
//! keyed by the user id is merge-written to the users collection:
//!
//! ```text
//! { uid, email, displayName, photoURL?, createdAt }
//! ```
//!
//! `displayName` falls back to the local part of the email. `createdAt` is a
//! server timestamp. The write is a merge so repeating it is harmless.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::store::backend::{server_timestamp, Document, DocumentBackend, MergeMode};
use crate::store::document::FIELD_CREATED_AT;
use crate::store::generic::GenericTodoStore;
use crate::types::UserIdentity;

/// Writes user profile documents.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Creates or merges the profile document for `user`.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the write is rejected.
    async fn ensure_profile(&self, user: &UserIdentity) -> Result<(), StoreError>;
}

/// Encodes the profile document for `user`.
///
/// # Examples
///
/// ```
/// use todo_sync::store::profile::encode_profile;
/// use todo_sync::types::{ProviderUser, UserIdentity};
///
/// let user = UserIdentity::from_provider(&ProviderUser::new("u1", "lin@example.com"));
/// let doc = encode_profile(&user);
/// assert_eq!(doc["displayName"], "lin");
/// assert!(!doc.contains_key("photoURL"));
/// ```
pub fn encode_profile(user: &UserIdentity) -> Document {
    let mut doc = Map::new();
    doc.insert("uid".to_string(), Value::from(user.id.as_str()));
    doc.insert("email".to_string(), Value::from(user.email.as_str()));
    doc.insert(
        "displayName".to_string(),
        Value::from(user.display_name_or_email_local()),
    );
    if let Some(photo) = &user.photo_url {
        doc.insert("photoURL".to_string(), Value::from(photo.as_str()));
    }
    doc.insert(FIELD_CREATED_AT.to_string(), server_timestamp());
    doc
}

#[async_trait]
impl<B: DocumentBackend + 'static> ProfileStore for GenericTodoStore<B> {
    async fn ensure_profile(&self, user: &UserIdentity) -> Result<(), StoreError> {
        self.backend()
            .merge(
                &self.config().users_collection,
                &user.id,
                encode_profile(user),
                MergeMode::Upsert,
            )
            .await?;
        tracing::info!(user_id = %user.id, "user profile provisioned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::is_server_timestamp;
    use crate::types::ProviderUser;

    #[test]
    fn profile_keeps_explicit_display_name_and_photo() {
        let user = UserIdentity::from_provider(
            &ProviderUser::new("u1", "a@b.c")
                .with_display_name("Ada Lovelace")
                .with_photo_url("https://img/ada.png"),
        );
        let doc = encode_profile(&user);
        assert_eq!(doc["uid"], "u1");
        assert_eq!(doc["email"], "a@b.c");
        assert_eq!(doc["displayName"], "Ada Lovelace");
        assert_eq!(doc["photoURL"], "https://img/ada.png");
        assert!(is_server_timestamp(&doc["createdAt"]));
    }
}

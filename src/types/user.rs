//! User identity types.
//!
//! [`ProviderUser`] is what the identity provider hands out on each session
//! change. [`UserIdentity`] is the normalized, immutable snapshot the rest of
//! the crate works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user object as delivered by the identity provider.
///
/// Every field except `uid` may be missing depending on how the account was
/// created (email/password accounts have no photo, federated accounts may
/// hide the email, and so on).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUser {
    /// Provider-assigned stable user id.
    pub uid: String,
    /// Email address, if the provider exposes one.
    pub email: Option<String>,
    /// Display name, if set.
    pub display_name: Option<String>,
    /// Profile photo URL, if set.
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    /// When the account was created, if the provider reports it.
    pub creation_time: Option<DateTime<Utc>>,
}

impl ProviderUser {
    /// Creates a provider user with only an id and email.
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: Some(email.into()),
            display_name: None,
            photo_url: None,
            creation_time: None,
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the photo URL.
    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// Sets the account creation time.
    pub fn with_creation_time(mut self, at: DateTime<Utc>) -> Self {
        self.creation_time = Some(at);
        self
    }
}

/// The normalized identity of the signed-in user.
///
/// Built fresh from the provider's user object on every session change and
/// never mutated afterwards.
///
/// # Examples
///
/// ```
/// use todo_sync::types::{ProviderUser, UserIdentity};
///
/// let user = ProviderUser::new("uid-1", "ada@example.com").with_display_name("");
/// let identity = UserIdentity::from_provider(&user);
/// assert_eq!(identity.id, "uid-1");
/// assert_eq!(identity.email, "ada@example.com");
/// // Empty strings from the provider are treated as absent.
/// assert!(identity.display_name.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// Stable user id; also the owner id of the user's todos.
    pub id: String,
    /// Email address (empty if the provider exposes none).
    pub email: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Profile photo URL.
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

impl UserIdentity {
    /// Normalizes a provider user object.
    ///
    /// A missing creation time falls back to the current instant.
    pub fn from_provider(user: &ProviderUser) -> Self {
        Self {
            id: user.uid.clone(),
            email: user.email.clone().unwrap_or_default(),
            display_name: non_empty(user.display_name.as_deref()),
            photo_url: non_empty(user.photo_url.as_deref()),
            created_at: user.creation_time.unwrap_or_else(Utc::now),
        }
    }

    /// Returns the display name, or the local part of the email if unset.
    ///
    /// ```
    /// use todo_sync::types::{ProviderUser, UserIdentity};
    ///
    /// let identity = UserIdentity::from_provider(&ProviderUser::new("u", "grace@example.com"));
    /// assert_eq!(identity.display_name_or_email_local(), "grace");
    /// ```
    pub fn display_name_or_email_local(&self) -> &str {
        match &self.display_name {
            Some(name) => name,
            None => self.email.split('@').next().unwrap_or_default(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn from_provider_keeps_all_fields() {
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let user = ProviderUser::new("abc", "a@b.c")
            .with_display_name("Ada")
            .with_photo_url("https://img/1.png")
            .with_creation_time(created);
        let identity = UserIdentity::from_provider(&user);
        assert_eq!(identity.id, "abc");
        assert_eq!(identity.display_name.as_deref(), Some("Ada"));
        assert_eq!(identity.photo_url.as_deref(), Some("https://img/1.png"));
        assert_eq!(identity.created_at, created);
    }

    #[test]
    fn missing_email_becomes_empty_string() {
        let mut user = ProviderUser::new("abc", "x");
        user.email = None;
        let identity = UserIdentity::from_provider(&user);
        assert_eq!(identity.email, "");
        assert_eq!(identity.display_name_or_email_local(), "");
    }

    #[test]
    fn serializes_with_photo_url_casing() {
        let identity = UserIdentity::from_provider(
            &ProviderUser::new("abc", "a@b.c").with_photo_url("p"),
        );
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["photoURL"], "p");
        assert!(json.get("createdAt").is_some());
    }
}

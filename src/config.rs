//! Sync configuration.
//!
//! Configuration can be loaded from:
//! 1. TOML file (`.todo-sync.toml`)
//! 2. Environment variables (with `TODO_SYNC_` prefix)
//!
//! Environment variables override TOML configuration.
//!
//! # Example TOML Configuration
//!
//! ```toml
//! [todo_sync]
//! sign_in_strategy = "redirect"
//! week_start = "monday"
//! log_filter = "todo_sync=debug"
//!
//! [todo_sync.backend]
//! project_id = "my-todo-app"
//! api_key = "AIza..."
//! auth_domain = "my-todo-app.firebaseapp.com"
//! app_id = "1:123:web:abc"
//!
//! [todo_sync.collections]
//! todos = "todos"
//! users = "users"
//! ```

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::{CredentialActions, IdentityProvider, SignInStrategy};
use crate::store::{ProfileStore, StoreConfig};
use crate::view::MemoizedView;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".todo-sync.toml";

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Connection credentials for the managed service.
    pub backend: BackendConfig,

    /// Federated sign-in strategy: "popup" or "redirect".
    pub sign_in_strategy: SignInStrategy,

    /// Collection names.
    pub collections: CollectionsConfig,

    /// First day of the week for the "this week" filter.
    pub week_start: String,

    /// Default tracing filter directive, used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            sign_in_strategy: SignInStrategy::Popup,
            collections: CollectionsConfig::default(),
            week_start: "sunday".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from file and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. TOML configuration file
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be parsed, or
    /// if the result does not validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(CONFIG_FILE) {
            Ok(contents) => Self::from_toml(&contents)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, and the errors
    /// of [`from_toml`](Self::from_toml) and [`validate`](Self::validate).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        let mut config = Self::from_toml(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or mistyped values.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct FullConfig {
            #[serde(default)]
            todo_sync: SyncConfig,
        }

        let full: FullConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(full.todo_sync)
    }

    /// Apply `TODO_SYNC_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// Unparseable values are ignored and the previous value is kept.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Backend credentials
        if let Some(v) = lookup("TODO_SYNC_PROJECT_ID") {
            self.backend.project_id = v;
        }
        if let Some(v) = lookup("TODO_SYNC_API_KEY") {
            self.backend.api_key = v;
        }
        if let Some(v) = lookup("TODO_SYNC_AUTH_DOMAIN") {
            self.backend.auth_domain = v;
        }
        if let Some(v) = lookup("TODO_SYNC_APP_ID") {
            self.backend.app_id = v;
        }

        if let Some(v) = lookup("TODO_SYNC_SIGN_IN_STRATEGY") {
            match v.to_ascii_lowercase().as_str() {
                "popup" => self.sign_in_strategy = SignInStrategy::Popup,
                "redirect" => self.sign_in_strategy = SignInStrategy::Redirect,
                other => tracing::warn!(value = other, "ignoring unknown sign-in strategy"),
            }
        }

        // Collections
        if let Some(v) = lookup("TODO_SYNC_TODOS_COLLECTION") {
            self.collections.todos = v;
        }
        if let Some(v) = lookup("TODO_SYNC_USERS_COLLECTION") {
            self.collections.users = v;
        }

        if let Some(v) = lookup("TODO_SYNC_WEEK_START") {
            self.week_start = v;
        }
        if let Some(v) = lookup("TODO_SYNC_LOG_FILTER") {
            self.log_filter = v;
        }
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty collection name or an
    /// unknown weekday.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collections.todos.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "collections.todos",
                reason: "collection name must not be empty".to_string(),
            });
        }
        if self.collections.users.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "collections.users",
                reason: "collection name must not be empty".to_string(),
            });
        }
        self.week_start()?;
        Ok(())
    }

    /// The configured first day of the week.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `week_start` is not a weekday name.
    pub fn week_start(&self) -> Result<Weekday, ConfigError> {
        Weekday::from_str(self.week_start.trim()).map_err(|_| ConfigError::Invalid {
            field: "week_start",
            reason: format!("'{}' is not a weekday", self.week_start),
        })
    }

    /// Collection names for the store.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            todos_collection: self.collections.todos.clone(),
            users_collection: self.collections.users.clone(),
        }
    }

    /// Credential actions using the configured sign-in strategy.
    pub fn credential_actions(
        &self,
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
    ) -> CredentialActions {
        CredentialActions::new(provider, profiles).with_strategy(self.sign_in_strategy)
    }

    /// An empty view cache using the configured first day of the week.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `week_start` is not a weekday name.
    pub fn memoized_view(&self) -> Result<MemoizedView, ConfigError> {
        Ok(MemoizedView::new().with_week_start(self.week_start()?))
    }
}

/// Connection credentials for the managed service, supplied out of band.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project identifier.
    pub project_id: String,
    /// Public API key.
    pub api_key: String,
    /// Domain used by the identity provider.
    pub auth_domain: String,
    /// Application identifier.
    pub app_id: String,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("project_id", &self.project_id)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("auth_domain", &self.auth_domain)
            .field("app_id", &self.app_id)
            .finish()
    }
}

/// Collection names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionsConfig {
    /// Collection holding todos.
    pub todos: String,
    /// Collection holding user profiles.
    pub users: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        let store = StoreConfig::default();
        Self {
            todos: store.todos_collection,
            users: store.users_collection,
        }
    }
}

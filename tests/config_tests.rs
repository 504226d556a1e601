//! Configuration loading from files.

use std::io::Write;
use std::sync::Arc;

use chrono::Weekday;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use todo_sync::config::SyncConfig;
use todo_sync::error::ConfigError;
use todo_sync::session::{InMemoryIdentityProvider, SignInStrategy};
use todo_sync::store::memory::InMemoryTodoStore;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_from_file_reads_all_sections() {
    let file = write_config(
        r#"
[todo_sync]
sign_in_strategy = "redirect"
week_start = "monday"

[todo_sync.backend]
project_id = "demo"
api_key = "secret-key"

[todo_sync.collections]
todos = "tasks"
"#,
    );

    let config = SyncConfig::from_file(file.path()).unwrap();
    assert_eq!(config.sign_in_strategy, SignInStrategy::Redirect);
    assert_eq!(config.week_start().unwrap(), Weekday::Mon);
    assert_eq!(config.backend.project_id, "demo");

    let store = config.store_config();
    assert_eq!(store.todos_collection, "tasks");
    assert_eq!(store.users_collection, "users");

    let debug = format!("{:?}", config.backend);
    assert!(!debug.contains("secret-key"));
}

#[test]
fn test_from_file_missing_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SyncConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_from_file_rejects_invalid_values() {
    let file = write_config("[todo_sync]\nweek_start = \"someday\"\n");
    let err = SyncConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "week_start", .. }));
}

#[test]
fn test_from_file_rejects_malformed_toml() {
    let file = write_config("[todo_sync\nweek_start = ");
    let err = SyncConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_config_drives_credential_actions_and_view() {
    let file = write_config("[todo_sync]\nsign_in_strategy = \"redirect\"\nweek_start = \"monday\"\n");
    let config = SyncConfig::from_file(file.path()).unwrap();

    let actions = config.credential_actions(
        Arc::new(InMemoryIdentityProvider::new()),
        Arc::new(InMemoryTodoStore::new()),
    );
    assert_eq!(actions.strategy(), SignInStrategy::Redirect);

    let view = config.memoized_view().unwrap();
    assert_eq!(view.week_start(), Weekday::Mon);
    assert_eq!(view.recomputations(), 0);
}

#[test]
fn test_memoized_view_rejects_bad_week_start() {
    let mut config = SyncConfig::default();
    config.week_start = "someday".to_string();
    let err = config.memoized_view().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "week_start", .. }));
}

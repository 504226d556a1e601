//! Subscriber installation for applications embedding the sync layer.
//!
//! The library itself only emits `tracing` events. Hosts that do not install
//! their own subscriber can call [`init_logging`].

use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_filter` is used (for
/// example [`SyncConfig::log_filter`](crate::config::SyncConfig::log_filter)),
/// falling back to `info` if it does not parse.
///
/// Returns `false` if a global subscriber was already installed, so repeated
/// calls are harmless.
///
/// # Examples
///
/// ```
/// let first = todo_sync::logging::init_logging("todo_sync=debug");
/// let second = todo_sync::logging::init_logging("todo_sync=debug");
/// assert!(!(first && second));
/// ```
pub fn init_logging(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

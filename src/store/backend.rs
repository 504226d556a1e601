//! Low-level document backend trait and supporting types.
//!
//! The [`DocumentBackend`] trait is the contract of the managed document
//! service: keyed documents grouped in collections, server-assigned ids and
//! timestamps, an equality-filtered and timestamp-ordered query, and a change
//! feed from which live queries are built.
//!
//! Domain logic (todo encoding, validation, live-query snapshot delivery)
//! does **not** belong here. Backends are dumb document stores; domain logic
//! lives in [`GenericTodoStore`](crate::store::generic::GenericTodoStore).
//!
//! # Field Semantics
//!
//! Documents are JSON objects ([`Document`]). Two values are special on
//! writes:
//!
//! - [`server_timestamp()`] is a sentinel the backend replaces with its own
//!   clock, encoded as a wire timestamp (`{"seconds": .., "nanoseconds": ..}`).
//! - `null` in a merge write deletes the field.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::StoreError;

/// A stored document: a JSON object of fields.
pub type Document = Map<String, Value>;

/// Key of the server-timestamp sentinel object.
pub const SERVER_TIMESTAMP_SENTINEL: &str = "$serverTimestamp";

/// Returns the sentinel value that a backend resolves to its own clock.
///
/// # Examples
///
/// ```
/// use todo_sync::store::backend::{is_server_timestamp, server_timestamp};
///
/// assert!(is_server_timestamp(&server_timestamp()));
/// assert!(!is_server_timestamp(&serde_json::json!("2024-01-01T00:00:00Z")));
/// ```
pub fn server_timestamp() -> Value {
    let mut sentinel = Map::new();
    sentinel.insert(SERVER_TIMESTAMP_SENTINEL.to_string(), Value::Bool(true));
    Value::Object(sentinel)
}

/// Returns `true` if `value` is the server-timestamp sentinel.
pub fn is_server_timestamp(value: &Value) -> bool {
    value.as_object().is_some_and(|map| {
        map.len() == 1 && map.get(SERVER_TIMESTAMP_SENTINEL) == Some(&Value::Bool(true))
    })
}

/// How a merge write treats a missing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// The document must exist; missing documents fail with
    /// [`StoreError::NotFound`].
    Update,
    /// Create the document if missing (set-with-merge).
    Upsert,
}

/// Sort direction of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Oldest/smallest first.
    Ascending,
    /// Newest/largest first.
    Descending,
}

/// An equality filter on one field plus an order on one timestamp field.
///
/// Documents missing the order field are excluded from the result, the way
/// managed document stores treat an `orderBy` on an absent field.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection to query.
    pub collection: String,
    /// Field compared for equality.
    pub filter_field: String,
    /// Value the filter field must equal.
    pub filter_value: Value,
    /// Timestamp field to order by.
    pub order_field: String,
    /// Order direction.
    pub direction: Direction,
}

impl Query {
    /// Creates a query on `collection` where `field == value`.
    pub fn where_eq(collection: impl Into<String>, field: impl Into<String>, value: Value) -> Self {
        Self {
            collection: collection.into(),
            filter_field: field.into(),
            filter_value: value,
            order_field: "createdAt".to_string(),
            direction: Direction::Descending,
        }
    }

    /// Sets the ordering.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_field = field.into();
        self.direction = direction;
        self
    }
}

/// A notification from the backend's change feed.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A document in `collection` was written or deleted.
    Changed {
        /// The collection that changed.
        collection: String,
        /// The document that changed.
        id: String,
    },
    /// The service terminated every live listener on `collection`.
    ListenersRevoked {
        /// The affected collection.
        collection: String,
        /// Why the listeners were terminated.
        error: StoreError,
    },
}

/// Document backend for todo and profile persistence.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; live queries hold the backend
/// from a spawned task.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Inserts a new document and returns its generated id.
    ///
    /// # Errors
    ///
    /// - [`StoreError::PermissionDenied`] or [`StoreError::Unavailable`] if
    ///   the service rejects the write.
    async fn insert(&self, collection: &str, fields: Document) -> Result<String, StoreError>;

    /// Merges `fields` into a document. Present fields overwrite, absent
    /// fields are untouched, `null` fields are deleted.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if `mode` is [`MergeMode::Update`] and the
    ///   document does not exist.
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        mode: MergeMode,
    ) -> Result<(), StoreError>;

    /// Deletes a document. Returns `false` if it did not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Reads a single document.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Runs a query and returns `(id, document)` pairs in query order.
    async fn query(&self, query: &Query) -> Result<Vec<(String, Document)>, StoreError>;

    /// Subscribes to the change feed.
    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;
}

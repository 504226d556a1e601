//! Conversion between stored documents and [`Todo`] values.
//!
//! Timestamps reach the adapter in more than one shape: an RFC 3339 string,
//! epoch milliseconds, or the service's wire wrapper
//! `{"seconds": i64, "nanoseconds": u32}`. [`StoreTimestamp`] captures all of
//! them and every decode path normalizes to `DateTime<Utc>` here, so nothing
//! above the store ever sees the wire shapes.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::store::backend::{server_timestamp, Document};
use crate::types::{Priority, Todo, TodoDraft, TodoPatch};

/// Field holding the owner id.
pub const FIELD_OWNER: &str = "userId";
/// Field holding the creation timestamp.
pub const FIELD_CREATED_AT: &str = "createdAt";
/// Field holding the last-update timestamp.
pub const FIELD_UPDATED_AT: &str = "updatedAt";

const FIELD_TITLE: &str = "title";
const FIELD_DESCRIPTION: &str = "description";
const FIELD_COMPLETED: &str = "completed";
const FIELD_PRIORITY: &str = "priority";
const FIELD_DUE_DATE: &str = "dueDate";

/// A timestamp in any of the shapes the store may deliver.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use todo_sync::store::document::StoreTimestamp;
///
/// let wire = StoreTimestamp::from_value(&json!({"seconds": 1718409600, "nanoseconds": 0})).unwrap();
/// let native = StoreTimestamp::from_value(&json!("2024-06-15T00:00:00Z")).unwrap();
/// assert_eq!(wire.to_instant(), native.to_instant());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTimestamp {
    /// Already a native instant (RFC 3339 on the wire).
    Instant(DateTime<Utc>),
    /// The service's wrapper type.
    Wire {
        /// Seconds since the Unix epoch.
        seconds: i64,
        /// Sub-second nanoseconds.
        nanoseconds: u32,
    },
    /// Milliseconds since the Unix epoch.
    EpochMillis(i64),
}

impl StoreTimestamp {
    /// Recognizes a timestamp value. Returns `None` for any other JSON shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| Self::Instant(dt.with_timezone(&Utc))),
            Value::Number(n) => n.as_i64().map(Self::EpochMillis),
            Value::Object(map) => {
                let seconds = map.get("seconds").and_then(Value::as_i64)?;
                let nanoseconds = map
                    .get("nanoseconds")
                    .or_else(|| map.get("nanos"))
                    .map_or(Some(0), Value::as_u64)?;
                Some(Self::Wire {
                    seconds,
                    nanoseconds: u32::try_from(nanoseconds).ok()?,
                })
            },
            _ => None,
        }
    }

    /// Normalizes to the canonical instant type.
    ///
    /// Returns `None` for out-of-range values.
    pub fn to_instant(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Instant(at) => Some(at),
            Self::Wire {
                seconds,
                nanoseconds,
            } => DateTime::from_timestamp(seconds, nanoseconds),
            Self::EpochMillis(ms) => DateTime::from_timestamp_millis(ms),
        }
    }

    /// Encodes an instant in the wire wrapper shape.
    pub fn wire_value(at: DateTime<Utc>) -> Value {
        let mut map = Map::new();
        map.insert("seconds".to_string(), Value::from(at.timestamp()));
        map.insert(
            "nanoseconds".to_string(),
            Value::from(at.timestamp_subsec_nanos()),
        );
        Value::Object(map)
    }
}

/// Parses any supported timestamp shape into an instant.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    StoreTimestamp::from_value(value).and_then(StoreTimestamp::to_instant)
}

fn decode_error(id: &str, reason: impl Into<String>) -> StoreError {
    StoreError::Decode {
        id: id.to_string(),
        reason: reason.into(),
    }
}

fn required_timestamp(id: &str, doc: &Document, field: &str) -> Result<DateTime<Utc>, StoreError> {
    match doc.get(field) {
        // A pending server timestamp reads back as null; estimate it locally.
        None | Some(Value::Null) => {
            tracing::debug!(todo_id = id, field, "estimating pending server timestamp");
            Ok(Utc::now())
        },
        Some(value) => parse_timestamp(value)
            .ok_or_else(|| decode_error(id, format!("field {field} is not a timestamp"))),
    }
}

fn optional_string(id: &str, doc: &Document, field: &str) -> Result<Option<String>, StoreError> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(decode_error(id, format!("field {field} is not a string"))),
    }
}

/// Decodes a stored document into a [`Todo`].
///
/// # Errors
///
/// Returns [`StoreError::Decode`] if a required field is missing or has the
/// wrong type.
pub fn decode_todo(id: &str, doc: &Document) -> Result<Todo, StoreError> {
    let owner_id = optional_string(id, doc, FIELD_OWNER)?
        .ok_or_else(|| decode_error(id, "missing userId"))?;
    let title =
        optional_string(id, doc, FIELD_TITLE)?.ok_or_else(|| decode_error(id, "missing title"))?;
    let completed = match doc.get(FIELD_COMPLETED) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(decode_error(id, "field completed is not a boolean")),
    };
    let priority = match optional_string(id, doc, FIELD_PRIORITY)? {
        None => Priority::default(),
        Some(p) => p.parse().map_err(|e: String| decode_error(id, e))?,
    };
    let due_date = match doc.get(FIELD_DUE_DATE) {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            parse_timestamp(value)
                .ok_or_else(|| decode_error(id, "field dueDate is not a timestamp"))?,
        ),
    };

    Ok(Todo {
        id: id.to_string(),
        owner_id,
        title,
        description: optional_string(id, doc, FIELD_DESCRIPTION)?,
        completed,
        priority,
        due_date,
        created_at: required_timestamp(id, doc, FIELD_CREATED_AT)?,
        updated_at: required_timestamp(id, doc, FIELD_UPDATED_AT)?,
    })
}

/// Encodes a new todo. `completed` starts `false` and both timestamps are
/// server-assigned.
pub fn encode_draft(owner_id: &str, draft: &TodoDraft) -> Document {
    let mut doc = Map::new();
    doc.insert(FIELD_OWNER.to_string(), Value::from(owner_id));
    doc.insert(FIELD_TITLE.to_string(), Value::from(draft.title.as_str()));
    if let Some(description) = &draft.description {
        doc.insert(
            FIELD_DESCRIPTION.to_string(),
            Value::from(description.as_str()),
        );
    }
    doc.insert(FIELD_COMPLETED.to_string(), Value::Bool(false));
    doc.insert(
        FIELD_PRIORITY.to_string(),
        Value::from(draft.priority.as_str()),
    );
    if let Some(due) = draft.due_date {
        doc.insert(FIELD_DUE_DATE.to_string(), Value::from(due.to_rfc3339()));
    }
    doc.insert(FIELD_CREATED_AT.to_string(), server_timestamp());
    doc.insert(FIELD_UPDATED_AT.to_string(), server_timestamp());
    doc
}

/// Encodes a partial update. Cleared optional fields become `null` (field
/// deletion) and `updatedAt` is always refreshed.
pub fn encode_patch(patch: &TodoPatch) -> Document {
    let mut doc = Map::new();
    if let Some(title) = &patch.title {
        doc.insert(FIELD_TITLE.to_string(), Value::from(title.as_str()));
    }
    if let Some(description) = &patch.description {
        doc.insert(
            FIELD_DESCRIPTION.to_string(),
            description.as_deref().map_or(Value::Null, Value::from),
        );
    }
    if let Some(completed) = patch.completed {
        doc.insert(FIELD_COMPLETED.to_string(), Value::Bool(completed));
    }
    if let Some(priority) = patch.priority {
        doc.insert(FIELD_PRIORITY.to_string(), Value::from(priority.as_str()));
    }
    if let Some(due) = &patch.due_date {
        doc.insert(
            FIELD_DUE_DATE.to_string(),
            due.map_or(Value::Null, |at| Value::from(at.to_rfc3339())),
        );
    }
    doc.insert(FIELD_UPDATED_AT.to_string(), server_timestamp());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::is_server_timestamp;
    use chrono::TimeZone;
    use serde_json::json;

    fn stored(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test documents are objects"),
        }
    }

    #[test]
    fn decodes_mixed_timestamp_shapes_to_one_instant_type() {
        let doc = stored(json!({
            "userId": "u1",
            "title": "Write report",
            "completed": true,
            "priority": "high",
            "dueDate": "2024-06-15T23:00:00+09:00",
            "createdAt": {"seconds": 1_700_000_000, "nanoseconds": 5},
            "updatedAt": 1_700_000_001_000_i64,
        }));
        let todo = decode_todo("t1", &doc).unwrap();
        assert_eq!(todo.owner_id, "u1");
        assert!(todo.completed);
        assert_eq!(todo.priority, Priority::High);
        assert_eq!(
            todo.due_date,
            Some(Utc.with_ymd_and_hms(2024, 6, 15, 14, 0, 0).unwrap())
        );
        assert_eq!(todo.created_at.timestamp(), 1_700_000_000);
        assert_eq!(todo.created_at.timestamp_subsec_nanos(), 5);
        assert_eq!(todo.updated_at.timestamp(), 1_700_000_001);
    }

    #[test]
    fn rejects_missing_title_and_bad_types() {
        let doc = stored(json!({"userId": "u1", "createdAt": "2024-01-01T00:00:00Z"}));
        assert!(matches!(
            decode_todo("t", &doc),
            Err(StoreError::Decode { .. })
        ));

        let doc = stored(json!({"userId": "u1", "title": "x", "completed": "yes"}));
        assert!(decode_todo("t", &doc).is_err());

        let doc = stored(json!({"userId": "u1", "title": "x", "priority": "urgent"}));
        assert!(decode_todo("t", &doc).is_err());
    }

    #[test]
    fn draft_encoding_uses_server_timestamps() {
        let doc = encode_draft("u1", &TodoDraft::new("Title"));
        assert_eq!(doc[FIELD_OWNER], "u1");
        assert_eq!(doc["completed"], false);
        assert_eq!(doc["priority"], "medium");
        assert!(is_server_timestamp(&doc[FIELD_CREATED_AT]));
        assert!(is_server_timestamp(&doc[FIELD_UPDATED_AT]));
        assert!(!doc.contains_key("description"));
        assert!(!doc.contains_key("dueDate"));
    }

    #[test]
    fn patch_encoding_clears_with_null_and_touches_updated_at() {
        let doc = encode_patch(&TodoPatch::new().clear_due_date().completed(true));
        assert_eq!(doc["dueDate"], Value::Null);
        assert_eq!(doc["completed"], true);
        assert!(is_server_timestamp(&doc[FIELD_UPDATED_AT]));
        assert!(!doc.contains_key(FIELD_CREATED_AT));
        assert!(!doc.contains_key(FIELD_OWNER));
    }

    #[test]
    fn wire_value_round_trips() {
        let at = Utc.with_ymd_and_hms(2024, 6, 15, 8, 30, 0).unwrap();
        assert_eq!(parse_timestamp(&StoreTimestamp::wire_value(at)), Some(at));
        assert_eq!(parse_timestamp(&json!(true)), None);
    }
}

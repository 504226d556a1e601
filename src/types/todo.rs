//! Todo records and their write-side counterparts.
//!
//! [`Todo`] is the read model delivered in snapshots. [`TodoDraft`] carries
//! the caller-supplied fields for a new todo (the store assigns the rest) and
//! [`TodoPatch`] carries a partial update.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Urgency of a todo.
///
/// Ordering follows urgency: `High < Medium < Low`, so an ascending sort
/// puts the most urgent todos first.
///
/// # Examples
///
/// ```
/// use todo_sync::types::Priority;
///
/// assert!(Priority::High < Priority::Low);
/// assert_eq!("medium".parse::<Priority>().unwrap(), Priority::Medium);
/// assert_eq!(Priority::default(), Priority::Medium);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Most urgent.
    High,
    /// Default urgency.
    #[default]
    Medium,
    /// Least urgent.
    Low,
}

impl Priority {
    /// All priorities, most urgent first.
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Sort rank: 0 for high, 2 for low.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// A todo as stored remotely and mirrored locally.
///
/// `id`, `owner_id`, and `created_at` never change after creation;
/// `updated_at` is refreshed by every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Store-assigned document id.
    pub id: String,
    /// Id of the user that owns this todo.
    #[serde(rename = "userId")]
    pub owner_id: String,
    /// Non-empty, trimmed title.
    pub title: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the todo is done.
    pub completed: bool,
    /// Urgency.
    pub priority: Priority,
    /// Optional due instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Server-assigned creation instant.
    pub created_at: DateTime<Utc>,
    /// Server-assigned instant of the last mutation.
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new todo.
///
/// The store assigns `id`, `owner_id`, `completed = false`, and both
/// timestamps. Run drafts through
/// [`validation::normalize_draft`](crate::validation::normalize_draft)
/// before handing them to a store.
///
/// # Examples
///
/// ```
/// use todo_sync::types::{Priority, TodoDraft};
///
/// let draft = TodoDraft::new("Buy milk")
///     .with_description("2 liters")
///     .with_priority(Priority::High);
/// assert_eq!(draft.title, "Buy milk");
/// assert_eq!(draft.priority, Priority::High);
/// assert!(draft.due_date.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TodoDraft {
    /// Title; must be non-empty after trimming.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Urgency, `Medium` unless set.
    pub priority: Priority,
    /// Optional due instant.
    pub due_date: Option<DateTime<Utc>>,
}

impl TodoDraft {
    /// Creates a draft with the given title and default fields.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the due date.
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }
}

/// A partial update to an existing todo.
///
/// Fields left as `None` are untouched. For the optional fields, the inner
/// `Option` distinguishes "set" (`Some(Some(v))`) from "clear"
/// (`Some(None)`). Ownership and creation time cannot be patched.
///
/// # Examples
///
/// ```
/// use todo_sync::types::{Priority, TodoPatch};
///
/// let patch = TodoPatch::new().title("Renamed").clear_due_date();
/// assert_eq!(patch.title.as_deref(), Some("Renamed"));
/// assert_eq!(patch.due_date, Some(None));
/// assert!(patch.priority.is_none());
/// assert!(TodoPatch::new().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TodoPatch {
    /// New title.
    pub title: Option<String>,
    /// New description, or `Some(None)` to clear it.
    pub description: Option<Option<String>>,
    /// New completion flag.
    pub completed: Option<bool>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New due date, or `Some(None)` to clear it.
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TodoPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    /// Clears the description.
    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }

    /// Sets the completion flag.
    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Sets the priority.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the due date.
    pub fn due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(Some(due));
        self
    }

    /// Clears the due date.
    pub fn clear_due_date(mut self) -> Self {
        self.due_date = Some(None);
        self
    }

    /// Returns `true` if the patch touches no field.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_is_by_urgency() {
        let mut priorities = vec![Priority::Low, Priority::High, Priority::Medium];
        priorities.sort();
        assert_eq!(priorities, Priority::ALL.to_vec());
        assert!(Priority::ALL.windows(2).all(|w| w[0].rank() < w[1].rank()));
    }

    #[test]
    fn priority_rejects_unknown_names() {
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::Low.to_string(), "low");
    }

    #[test]
    fn priority_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Priority::High).unwrap(), "high");
        let p: Priority = serde_json::from_value(serde_json::json!("low")).unwrap();
        assert_eq!(p, Priority::Low);
    }

    #[test]
    fn patch_builders_set_only_named_fields() {
        let patch = TodoPatch::new().completed(true).priority(Priority::Low);
        assert_eq!(patch.completed, Some(true));
        assert_eq!(patch.priority, Some(Priority::Low));
        assert!(patch.title.is_none());
        assert!(patch.description.is_none());
        assert!(!patch.is_empty());
    }
}

//! Filter and sort configuration for the derived view.
//!
//! The configuration is client-local and ephemeral. It is owned by the
//! presentation layer and only read by [`crate::view`].

use serde::{Deserialize, Serialize};

use super::todo::Priority;

/// Filter on completion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusFilter {
    /// Keep every todo.
    #[default]
    All,
    /// Keep todos that are not completed.
    Active,
    /// Keep completed todos.
    Completed,
}

impl StatusFilter {
    /// Returns `true` if a todo with this completion flag passes.
    pub fn matches(&self, completed: bool) -> bool {
        match self {
            Self::All => true,
            Self::Active => !completed,
            Self::Completed => completed,
        }
    }
}

/// Filter on priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriorityFilter {
    /// Keep every priority.
    #[default]
    All,
    /// Keep only high-priority todos.
    High,
    /// Keep only medium-priority todos.
    Medium,
    /// Keep only low-priority todos.
    Low,
}

impl PriorityFilter {
    /// Returns `true` if a todo with this priority passes.
    ///
    /// ```
    /// use todo_sync::types::{Priority, PriorityFilter};
    ///
    /// assert!(PriorityFilter::All.matches(Priority::Low));
    /// assert!(PriorityFilter::High.matches(Priority::High));
    /// assert!(!PriorityFilter::High.matches(Priority::Medium));
    /// ```
    pub fn matches(&self, priority: Priority) -> bool {
        match self {
            Self::All => true,
            Self::High => priority == Priority::High,
            Self::Medium => priority == Priority::Medium,
            Self::Low => priority == Priority::Low,
        }
    }
}

impl From<Priority> for PriorityFilter {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::High => Self::High,
            Priority::Medium => Self::Medium,
            Priority::Low => Self::Low,
        }
    }
}

/// Filter on due date, relative to the current local calendar day.
///
/// Every value other than `All` excludes todos without a due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DueDateFilter {
    /// Keep every todo.
    #[default]
    All,
    /// Due on the current calendar day.
    Today,
    /// Due within the current week (both ends inclusive).
    #[serde(alias = "week")]
    ThisWeek,
    /// Due within the current calendar month.
    #[serde(alias = "month")]
    ThisMonth,
}

/// Sort order of the derived view. All orders are ascending and stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Oldest first.
    #[default]
    CreatedAt,
    /// Earliest due first; todos without a due date last.
    DueDate,
    /// Most urgent first.
    Priority,
}

/// The complete filter/sort configuration.
///
/// # Examples
///
/// ```
/// use todo_sync::types::{SortKey, StatusFilter, TodoFilters};
///
/// let filters = TodoFilters::default()
///     .with_status(StatusFilter::Active)
///     .with_search("milk")
///     .with_sort(SortKey::Priority);
/// assert_eq!(filters.status, StatusFilter::Active);
/// assert_eq!(filters.search_term, "milk");
///
/// let parsed: TodoFilters = serde_json::from_value(serde_json::json!({
///     "status": "completed",
///     "dueDate": "week",
///     "sortKey": "dueDate"
/// })).unwrap();
/// assert_eq!(parsed.due_date, todo_sync::types::DueDateFilter::ThisWeek);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TodoFilters {
    /// Completion filter.
    pub status: StatusFilter,
    /// Priority filter.
    pub priority: PriorityFilter,
    /// Due-date filter.
    pub due_date: DueDateFilter,
    /// Case-insensitive substring matched against title or description.
    pub search_term: String,
    /// Sort order.
    pub sort_key: SortKey,
}

impl TodoFilters {
    /// Sets the status filter.
    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    /// Sets the priority filter.
    pub fn with_priority(mut self, priority: PriorityFilter) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the due-date filter.
    pub fn with_due_date(mut self, due_date: DueDateFilter) -> Self {
        self.due_date = due_date;
        self
    }

    /// Sets the search term.
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    /// Sets the sort key.
    pub fn with_sort(mut self, sort_key: SortKey) -> Self {
        self.sort_key = sort_key;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_matches() {
        assert!(StatusFilter::All.matches(true));
        assert!(StatusFilter::All.matches(false));
        assert!(StatusFilter::Active.matches(false));
        assert!(!StatusFilter::Active.matches(true));
        assert!(StatusFilter::Completed.matches(true));
        assert!(!StatusFilter::Completed.matches(false));
    }

    #[test]
    fn due_date_filter_accepts_long_and_short_names() {
        let long: DueDateFilter = serde_json::from_str("\"thisMonth\"").unwrap();
        let short: DueDateFilter = serde_json::from_str("\"month\"").unwrap();
        assert_eq!(long, DueDateFilter::ThisMonth);
        assert_eq!(short, DueDateFilter::ThisMonth);
    }

    #[test]
    fn priority_filter_from_priority() {
        for p in Priority::ALL {
            assert!(PriorityFilter::from(p).matches(p));
        }
    }
}

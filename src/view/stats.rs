//! Summary counts and priority grouping over the mirror.

use serde::Serialize;

use crate::types::{Priority, Todo};

/// Counts shown on the dashboard.
///
/// # Examples
///
/// ```
/// use todo_sync::view::TodoStats;
///
/// let stats = TodoStats::from_todos(&[]);
/// assert_eq!(stats, TodoStats::default());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoStats {
    /// Number of todos.
    pub total: usize,
    /// Number of completed todos.
    pub completed: usize,
    /// Number of todos not yet completed.
    pub pending: usize,
    /// Number of high-priority todos not yet completed.
    pub high_priority_pending: usize,
}

impl TodoStats {
    /// Counts `todos`.
    pub fn from_todos(todos: &[Todo]) -> Self {
        todos.iter().fold(Self::default(), |mut stats, todo| {
            stats.total += 1;
            if todo.completed {
                stats.completed += 1;
            } else {
                stats.pending += 1;
                if todo.priority == Priority::High {
                    stats.high_priority_pending += 1;
                }
            }
            stats
        })
    }
}

/// Todos grouped by priority, each group in mirror order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityBuckets {
    /// High-priority todos.
    pub high: Vec<Todo>,
    /// Medium-priority todos.
    pub medium: Vec<Todo>,
    /// Low-priority todos.
    pub low: Vec<Todo>,
}

impl PriorityBuckets {
    /// Groups `todos` by priority.
    pub fn from_todos(todos: &[Todo]) -> Self {
        let mut buckets = Self::default();
        for todo in todos {
            buckets.bucket_mut(todo.priority).push(todo.clone());
        }
        buckets
    }

    /// The group for `priority`.
    pub fn bucket(&self, priority: Priority) -> &[Todo] {
        match priority {
            Priority::High => &self.high,
            Priority::Medium => &self.medium,
            Priority::Low => &self.low,
        }
    }

    fn bucket_mut(&mut self, priority: Priority) -> &mut Vec<Todo> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Medium => &mut self.medium,
            Priority::Low => &mut self.low,
        }
    }
}

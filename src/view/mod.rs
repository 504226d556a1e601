//! Derived view: the filtered, sorted projection of the mirror.
//!
//! [`derive_view_at`] is a pure function of the mirror, the filter
//! configuration, the current instant and the first day of the week. The
//! pipeline runs in a fixed order:
//!
//! 1. status filter
//! 2. priority filter
//! 3. due-date filter (calendar days in the time zone of `now`)
//! 4. case-insensitive search over title and description
//! 5. stable sort
//!
//! Filters compose conjunctively. [`MemoizedView`] caches the result until
//! the mirror revision, the configuration or the calendar day changes.

pub mod stats;

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, TimeZone, Utc, Weekday};

use crate::types::{DueDateFilter, SortKey, Todo, TodoFilters};

pub use stats::{PriorityBuckets, TodoStats};

/// First day of the week used when none is configured.
pub const DEFAULT_WEEK_START: Weekday = Weekday::Sun;

/// Derives the view using the local clock and time zone, with weeks
/// starting on Sunday.
pub fn derive_view(todos: &[Todo], filters: &TodoFilters) -> Vec<Todo> {
    derive_view_at(todos, filters, &Local::now(), DEFAULT_WEEK_START)
}

/// Derives the view relative to `now`.
///
/// Due dates are compared as calendar days in `now`'s time zone.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc, Weekday};
/// use todo_sync::types::{StatusFilter, Todo, TodoFilters, Priority};
/// use todo_sync::view::derive_view_at;
///
/// let todo = |id: &str, completed: bool, secs: i64| Todo {
///     id: id.to_string(),
///     owner_id: "u".to_string(),
///     title: id.to_string(),
///     description: None,
///     completed,
///     priority: Priority::Medium,
///     due_date: None,
///     created_at: Utc.timestamp_opt(secs, 0).unwrap(),
///     updated_at: Utc.timestamp_opt(secs, 0).unwrap(),
/// };
/// let mirror = vec![todo("B", true, 2), todo("A", false, 1)];
/// let filters = TodoFilters::default().with_status(StatusFilter::Active);
/// let view = derive_view_at(&mirror, &filters, &Utc::now(), Weekday::Sun);
/// assert_eq!(view.len(), 1);
/// assert_eq!(view[0].title, "A");
/// ```
pub fn derive_view_at<Tz: TimeZone>(
    todos: &[Todo],
    filters: &TodoFilters,
    now: &DateTime<Tz>,
    week_start: Weekday,
) -> Vec<Todo> {
    let today = now.date_naive();
    let zone = now.timezone();
    let due_window = DueWindow::new(filters.due_date, today, week_start);
    let term = filters.search_term.to_lowercase();

    let mut view: Vec<Todo> = todos
        .iter()
        .filter(|todo| filters.status.matches(todo.completed))
        .filter(|todo| filters.priority.matches(todo.priority))
        .filter(|todo| due_window.contains(todo.due_date, &zone))
        .filter(|todo| matches_search(todo, &term))
        .cloned()
        .collect();

    // `sort_by` is stable, so equal keys keep mirror order.
    view.sort_by(|a, b| compare(a, b, filters.sort_key));
    view
}

/// Inclusive range of calendar days accepted by a due-date filter.
#[derive(Debug, Clone, Copy)]
enum DueWindow {
    Any,
    Days { first: NaiveDate, last: NaiveDate },
    Month { year: i32, month: u32 },
}

impl DueWindow {
    fn new(filter: DueDateFilter, today: NaiveDate, week_start: Weekday) -> Self {
        match filter {
            DueDateFilter::All => Self::Any,
            DueDateFilter::Today => Self::Days {
                first: today,
                last: today,
            },
            DueDateFilter::ThisWeek => {
                let offset = (7 + today.weekday().num_days_from_monday()
                    - week_start.num_days_from_monday())
                    % 7;
                let first = today
                    .checked_sub_days(Days::new(u64::from(offset)))
                    .unwrap_or(NaiveDate::MIN);
                let last = first.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
                Self::Days { first, last }
            },
            DueDateFilter::ThisMonth => Self::Month {
                year: today.year(),
                month: today.month(),
            },
        }
    }

    fn contains<Tz: TimeZone>(&self, due: Option<DateTime<Utc>>, zone: &Tz) -> bool {
        let due_day = match (self, due) {
            (Self::Any, _) => return true,
            (_, None) => return false,
            (_, Some(due)) => due.with_timezone(zone).date_naive(),
        };
        match *self {
            Self::Any => true,
            Self::Days { first, last } => (first..=last).contains(&due_day),
            Self::Month { year, month } => due_day.year() == year && due_day.month() == month,
        }
    }
}

fn matches_search(todo: &Todo, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    todo.title.to_lowercase().contains(term)
        || todo
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(term))
}

fn compare(a: &Todo, b: &Todo, key: SortKey) -> Ordering {
    match key {
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::DueDate => match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewKey {
    revision: u64,
    filters: TodoFilters,
    today: NaiveDate,
}

/// Caches the derived view between calls.
///
/// The cache is keyed on the mirror revision (see
/// [`SyncState::revision`](crate::sync::SyncState::revision)), the filter
/// configuration, and the current calendar day, so a `today` filter rolls
/// over at midnight even when nothing else changed.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use todo_sync::types::TodoFilters;
/// use todo_sync::view::MemoizedView;
///
/// let mut memo = MemoizedView::new();
/// let filters = TodoFilters::default();
/// let now = Utc::now();
/// assert!(memo.get_at(1, &[], &filters, &now).is_empty());
/// assert!(memo.get_at(1, &[], &filters, &now).is_empty());
/// assert_eq!(memo.recomputations(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MemoizedView {
    week_start: Weekday,
    key: Option<ViewKey>,
    cached: Vec<Todo>,
    recomputations: u64,
}

impl MemoizedView {
    /// Creates an empty cache with weeks starting on Sunday.
    pub fn new() -> Self {
        Self {
            week_start: DEFAULT_WEEK_START,
            key: None,
            cached: Vec::new(),
            recomputations: 0,
        }
    }

    /// Sets the first day of the week.
    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self.key = None;
        self
    }

    /// The first day of the week.
    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    /// Returns the view for the mirror at `revision`, using the local clock.
    pub fn get(&mut self, revision: u64, todos: &[Todo], filters: &TodoFilters) -> &[Todo] {
        self.get_at(revision, todos, filters, &Local::now())
    }

    /// Returns the view relative to `now`, recomputing only if the key
    /// changed.
    pub fn get_at<Tz: TimeZone>(
        &mut self,
        revision: u64,
        todos: &[Todo],
        filters: &TodoFilters,
        now: &DateTime<Tz>,
    ) -> &[Todo] {
        let key = ViewKey {
            revision,
            filters: filters.clone(),
            today: now.date_naive(),
        };
        if self.key.as_ref() != Some(&key) {
            self.cached = derive_view_at(todos, filters, now, self.week_start);
            self.key = Some(key);
            self.recomputations += 1;
        }
        &self.cached
    }

    /// Drops the cached view.
    pub fn invalidate(&mut self) {
        self.key = None;
    }

    /// Number of times the view was recomputed.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

impl Default for MemoizedView {
    fn default() -> Self {
        Self::new()
    }
}

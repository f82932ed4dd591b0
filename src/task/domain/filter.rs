//! Query filter, ordering and pagination for task listings.

use super::{Priority, Recurrence, Task, TaskId, TaskStatus, TaskType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort key for task listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Creation timestamp.
    #[default]
    CreatedAt,
    /// Latest change timestamp.
    UpdatedAt,
    /// Due date; tasks without one always sort last.
    DueDate,
    /// Priority rank.
    Priority,
    /// Progress percentage.
    Progress,
    /// Case-insensitive title.
    Title,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

/// Filter accepted by task listings.
///
/// Every populated field narrows the result. Archived tasks are hidden
/// unless `include_archived` is set or `status` asks for them explicitly.
/// Soft-deleted tasks never match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskFilter {
    /// Exact status.
    pub status: Option<TaskStatus>,
    /// Exact priority.
    pub priority: Option<Priority>,
    /// Exact type.
    pub task_type: Option<TaskType>,
    /// Exact recurrence rule.
    pub recurrence: Option<Recurrence>,
    /// Only tasks without a parent.
    pub only_root: bool,
    /// Only direct children of this task.
    pub parent_id: Option<TaskId>,
    /// Only tasks whose due date has passed and that are not completed.
    pub only_overdue: bool,
    /// Earliest due date, inclusive.
    pub due_date_min: Option<NaiveDate>,
    /// Latest due date, inclusive.
    pub due_date_max: Option<NaiveDate>,
    /// Lowest progress, inclusive.
    pub progress_min: Option<u8>,
    /// Highest progress, inclusive.
    pub progress_max: Option<u8>,
    /// Tags that must all be present.
    pub tags: Vec<String>,
    /// Case-insensitive substring matched against title and description.
    pub search: Option<String>,
    /// One-based page number.
    pub page: Option<usize>,
    /// Page size.
    pub limit: Option<usize>,
    /// Sort key.
    pub sort_by: SortBy,
    /// Sort direction.
    pub sort_order: SortOrder,
    /// Whether archived tasks are listed.
    pub include_archived: bool,
}

impl TaskFilter {
    /// Returns whether `task` passes every populated predicate on `today`.
    #[must_use]
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        task.is_live()
            && self.matches_archive_visibility(task)
            && self.status.is_none_or(|status| task.status() == status)
            && self.priority.is_none_or(|priority| task.priority() == priority)
            && self.task_type.is_none_or(|task_type| task.task_type() == task_type)
            && self.recurrence.is_none_or(|rule| task.recurrence() == rule)
            && (!self.only_root || task.is_root())
            && self.parent_id.is_none_or(|parent| task.parent_id() == Some(parent))
            && (!self.only_overdue || task.is_overdue(today))
            && self.matches_due_window(task)
            && self.progress_min.is_none_or(|min| task.progress() >= min)
            && self.progress_max.is_none_or(|max| task.progress() <= max)
            && self.matches_tags(task)
            && self.matches_search(task)
    }

    /// Orders two tasks by the requested key, then `created_at` descending,
    /// then identifier.
    #[must_use]
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let primary = match self.sort_by {
            SortBy::CreatedAt => self.directed(a.created_at().cmp(&b.created_at())),
            SortBy::UpdatedAt => self.directed(a.updated_at().cmp(&b.updated_at())),
            SortBy::Priority => self.directed(a.priority().cmp(&b.priority())),
            SortBy::Progress => self.directed(a.progress().cmp(&b.progress())),
            SortBy::Title => self.directed(
                a.title()
                    .to_lowercase()
                    .cmp(&b.title().to_lowercase()),
            ),
            SortBy::DueDate => match (a.due_date(), b.due_date()) {
                (Some(left), Some(right)) => self.directed(left.cmp(&right)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary
            .then_with(|| b.created_at().cmp(&a.created_at()))
            .then_with(|| a.id().cmp(&b.id()))
    }

    /// Resolves the one-based page and the page size.
    ///
    /// Missing or zero values fall back to page 1 and `default_limit`; the
    /// size is capped at `max_limit`.
    #[must_use]
    pub fn page_window(&self, default_limit: usize, max_limit: usize) -> (usize, usize) {
        let page = self.page.filter(|page| *page > 0).unwrap_or(1);
        let limit = self
            .limit
            .filter(|limit| *limit > 0)
            .unwrap_or(default_limit)
            .min(max_limit)
            .max(1);
        (page, limit)
    }

    fn directed(&self, ordering: Ordering) -> Ordering {
        match self.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    fn matches_archive_visibility(&self, task: &Task) -> bool {
        task.status() != TaskStatus::Archived
            || self.include_archived
            || self.status == Some(TaskStatus::Archived)
    }

    fn matches_due_window(&self, task: &Task) -> bool {
        if self.due_date_min.is_none() && self.due_date_max.is_none() {
            return true;
        }
        task.due_date().is_some_and(|due| {
            self.due_date_min.is_none_or(|min| due >= min)
                && self.due_date_max.is_none_or(|max| due <= max)
        })
    }

    fn matches_tags(&self, task: &Task) -> bool {
        self.tags
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .all(|tag| task.tags().contains(&tag))
    }

    fn matches_search(&self, task: &Task) -> bool {
        let Some(needle) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
        else {
            return true;
        };
        let needle = needle.to_lowercase();
        task.title().to_lowercase().contains(&needle)
            || task
                .description()
                .is_some_and(|description| description.to_lowercase().contains(&needle))
    }
}

/// One page of a task listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPage {
    /// Tasks on this page.
    pub items: Vec<Task>,
    /// Number of matching tasks across all pages.
    pub total: usize,
    /// One-based page number.
    pub page: usize,
    /// Page size.
    pub limit: usize,
}

impl TaskPage {
    /// Sorts and slices `matching` according to `filter`.
    #[must_use]
    pub fn paginate(
        mut matching: Vec<Task>,
        filter: &TaskFilter,
        default_limit: usize,
        max_limit: usize,
    ) -> Self {
        let (page, limit) = filter.page_window(default_limit, max_limit);
        matching.sort_by(|a, b| filter.compare(a, b));
        let total = matching.len();
        let offset = page.saturating_sub(1).saturating_mul(limit);
        let items = matching.into_iter().skip(offset).take(limit).collect();
        Self {
            items,
            total,
            page,
            limit,
        }
    }

    /// Returns the number of pages needed for `total` items.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.limit.max(1))
    }
}

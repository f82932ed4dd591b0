//! Simple aggregate statistics over the live task collection.

use super::{Hours, Priority, ProgressWeighting, Task, TaskStatus, TaskType, aggregate_progress};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts and totals across all live tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    /// Number of live tasks.
    pub total: usize,
    /// Tasks per status.
    pub by_status: BTreeMap<TaskStatus, usize>,
    /// Tasks per type.
    pub by_type: BTreeMap<TaskType, usize>,
    /// Tasks per priority.
    pub by_priority: BTreeMap<Priority, usize>,
    /// Tasks past their due date and not completed.
    pub overdue: usize,
    /// Tasks without a parent.
    pub roots: usize,
    /// Unweighted mean progress of root tasks.
    pub average_root_progress: u8,
    /// Sum of effort estimates.
    pub estimated_hours: Hours,
    /// Sum of logged effort.
    pub actual_hours: Hours,
}

impl TaskStats {
    /// Collects statistics over `tasks`, skipping soft-deleted ones.
    #[must_use]
    pub fn collect<'a>(tasks: impl IntoIterator<Item = &'a Task>, today: NaiveDate) -> Self {
        let mut stats = Self::default();
        let mut root_progress = Vec::new();

        for task in tasks.into_iter().filter(|task| task.is_live()) {
            stats.total += 1;
            *stats.by_status.entry(task.status()).or_default() += 1;
            *stats.by_type.entry(task.task_type()).or_default() += 1;
            *stats.by_priority.entry(task.priority()).or_default() += 1;
            if task.is_overdue(today) {
                stats.overdue += 1;
            }
            if task.is_root() {
                root_progress.push((task.progress(), None));
            }
            stats.estimated_hours = stats.estimated_hours + task.estimated_hours().unwrap_or_default();
            stats.actual_hours = stats.actual_hours + task.actual_hours().unwrap_or_default();
        }

        stats.roots = root_progress.len();
        stats.average_root_progress = aggregate_progress(root_progress, ProgressWeighting::Uniform);
        stats
    }

    /// Returns the number of tasks in `status`.
    #[must_use]
    pub fn count_with_status(&self, status: TaskStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or_default()
    }
}

//! Kanban board views over a sprint's tasks.

use super::{Sprint, SprintId};
use crate::task::domain::{
    Hours, ProgressWeighting, Task, TaskId, TaskStatus, aggregate_progress,
};
use std::collections::BTreeMap;

/// Column order of every board, left to right.
pub const BOARD_COLUMNS: [TaskStatus; 6] = [
    TaskStatus::Draft,
    TaskStatus::Active,
    TaskStatus::Blocked,
    TaskStatus::Recurring,
    TaskStatus::Completed,
    TaskStatus::Archived,
];

/// Tasks sharing one status, in board order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardColumn {
    /// Status represented by the column.
    pub status: TaskStatus,
    /// Tasks in display order.
    pub tasks: Vec<Task>,
}

impl BoardColumn {
    /// Returns the identifiers of the column's tasks in display order.
    #[must_use]
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(Task::id).collect()
    }
}

/// A sprint with its tasks bucketed into [`BOARD_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintBoard {
    /// The sprint shown.
    pub sprint: Sprint,
    /// One column per entry of [`BOARD_COLUMNS`], in that order.
    pub columns: Vec<BoardColumn>,
}

impl SprintBoard {
    /// Returns the column for `status`.
    #[must_use]
    pub fn column(&self, status: TaskStatus) -> Option<&BoardColumn> {
        self.columns.iter().find(|column| column.status == status)
    }

    /// Returns every task on the board, column by column.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.columns.iter().flat_map(|column| &column.tasks)
    }
}

/// Counts and completion for one sprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintSummary {
    /// Summarised sprint.
    pub sprint_id: SprintId,
    /// Task count per column.
    pub columns: BTreeMap<TaskStatus, usize>,
    /// Number of tasks assigned to the sprint.
    pub total: usize,
    /// Completed tasks as a percentage of non-archived tasks.
    pub completion: u8,
    /// Sum of effort estimates.
    pub estimated_hours: Hours,
    /// Sum of effort spent.
    pub actual_hours: Hours,
}

impl SprintSummary {
    /// Summarises `board`.
    #[must_use]
    pub fn of(board: &SprintBoard) -> Self {
        let columns = board
            .columns
            .iter()
            .map(|column| (column.status, column.tasks.len()))
            .collect();
        let completion = aggregate_progress(
            board
                .tasks()
                .filter(|task| task.status() != TaskStatus::Archived)
                .map(|task| (completion_of(task), None)),
            ProgressWeighting::Uniform,
        );

        Self {
            sprint_id: board.sprint.id(),
            columns,
            total: board.tasks().count(),
            completion,
            estimated_hours: board.tasks().filter_map(Task::estimated_hours).sum(),
            actual_hours: board.tasks().filter_map(Task::actual_hours).sum(),
        }
    }

    /// Returns the number of tasks in the `status` column.
    #[must_use]
    pub fn count(&self, status: TaskStatus) -> usize {
        self.columns.get(&status).copied().unwrap_or_default()
    }
}

fn completion_of(task: &Task) -> u8 {
    if task.status() == TaskStatus::Completed {
        100
    } else {
        0
    }
}

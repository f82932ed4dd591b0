//! Column ordering for Kanban boards.

use crate::sprint::domain::{BOARD_COLUMNS, BoardColumn, SprintId};
use crate::task::{
    domain::{StatusChange, Task, TaskId, TaskStatus},
    ports::TaskStatusListener,
};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

type ColumnOrder = HashMap<TaskStatus, Vec<TaskId>>;

/// Remembers the display order of tasks within each board column.
///
/// The cache holds identifiers only. Boards are always built from freshly
/// loaded tasks: tasks the cache has not seen are appended in creation
/// order, tasks whose status changed move to their new column, and tasks
/// that left the board are dropped. The backlog is keyed by `None`.
#[derive(Debug, Default)]
pub struct BoardViewCache {
    boards: RwLock<HashMap<Option<SprintId>, ColumnOrder>>,
}

impl BoardViewCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buckets `tasks` into board columns using the remembered order.
    #[must_use]
    pub fn arrange(&self, sprint_id: Option<SprintId>, tasks: Vec<Task>) -> Vec<BoardColumn> {
        let mut boards = self.write();
        bucket(boards.entry(sprint_id).or_default(), tasks)
    }

    /// Moves `task_id` to `position` within its column and returns that
    /// column.
    ///
    /// Positions past the end of the column place the task last. Returns
    /// `None` when `task_id` is not among `tasks`.
    #[must_use]
    pub fn reorder(
        &self,
        sprint_id: Option<SprintId>,
        tasks: Vec<Task>,
        task_id: TaskId,
        position: usize,
    ) -> Option<BoardColumn> {
        let mut boards = self.write();
        let order = boards.entry(sprint_id).or_default();
        let mut columns = bucket(order, tasks);
        let column = columns
            .iter_mut()
            .find(|column| column.tasks.iter().any(|task| task.id() == task_id))?;

        let from = column.tasks.iter().position(|task| task.id() == task_id)?;
        let task = column.tasks.remove(from);
        let to = position.min(column.tasks.len());
        column.tasks.insert(to, task);
        order.insert(column.status, column.task_ids());
        Some(column.clone())
    }

    /// Drops `task_id` from every remembered board.
    pub fn detach(&self, task_id: TaskId) {
        for order in self.write().values_mut() {
            for ids in order.values_mut() {
                ids.retain(|id| *id != task_id);
            }
        }
    }

    /// Forgets the ordering of one board.
    pub fn forget(&self, sprint_id: Option<SprintId>) {
        self.write().remove(&sprint_id);
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Option<SprintId>, ColumnOrder>> {
        self.boards.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskStatusListener for BoardViewCache {
    fn task_status_changed(&self, task: &Task, change: StatusChange) {
        let mut boards = self.write();
        let Some(order) = boards.get_mut(&task.sprint_id()) else {
            return;
        };
        if let Some(ids) = order.get_mut(&change.from) {
            ids.retain(|id| *id != task.id());
        }
        order.entry(change.to).or_default().push(task.id());
        tracing::debug!(
            task_id = %task.id(),
            from = %change.from,
            to = %change.to,
            "moved task between board columns"
        );
    }
}

fn bucket(order: &mut ColumnOrder, tasks: Vec<Task>) -> Vec<BoardColumn> {
    let mut by_status: HashMap<TaskStatus, Vec<Task>> = HashMap::new();
    for task in tasks {
        by_status.entry(task.status()).or_default().push(task);
    }

    let mut columns = Vec::with_capacity(BOARD_COLUMNS.len());
    for status in BOARD_COLUMNS {
        let ranks: HashMap<TaskId, usize> = order
            .get(&status)
            .map(|ids| ids.iter().enumerate().map(|(rank, id)| (*id, rank)).collect())
            .unwrap_or_default();
        let mut members = by_status.remove(&status).unwrap_or_default();
        members.sort_by_key(|task| {
            (
                ranks.get(&task.id()).copied().unwrap_or(usize::MAX),
                task.created_at(),
                task.id(),
            )
        });
        let column = BoardColumn {
            status,
            tasks: members,
        };
        order.insert(status, column.task_ids());
        columns.push(column);
    }
    columns
}

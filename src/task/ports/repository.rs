//! Repository port for task persistence and lookup.

use crate::sprint::domain::SprintId;
use crate::task::domain::{Task, TaskId};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Set of task writes applied atomically.
///
/// A change set is either applied in full or not at all. Later staging of
/// the same task replaces earlier staging. Staged updates carry the
/// revision they were read at; together with the revisions recorded by
/// [`expect_revision`](Self::expect_revision) they must still match the
/// stored tasks when the set is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChangeSet {
    inserts: Vec<Task>,
    updates: Vec<Task>,
    removals: Vec<TaskId>,
    expected: Vec<(TaskId, u64)>,
}

impl TaskChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a new task.
    pub fn insert(&mut self, task: Task) {
        self.inserts.retain(|staged| staged.id() != task.id());
        self.inserts.push(task);
    }

    /// Stages a write to an existing task.
    pub fn update(&mut self, task: Task) {
        self.updates.retain(|staged| staged.id() != task.id());
        self.updates.push(task);
    }

    /// Stages a hard deletion.
    pub fn remove(&mut self, id: TaskId) {
        if !self.removals.contains(&id) {
            self.removals.push(id);
        }
    }

    /// Requires `id` to still be stored at `revision` when the set is
    /// applied, without writing it.
    pub fn expect_revision(&mut self, id: TaskId, revision: u64) {
        self.expected.retain(|(staged, _)| *staged != id);
        self.expected.push((id, revision));
    }

    /// Returns staged inserts.
    #[must_use]
    pub fn inserts(&self) -> &[Task] {
        &self.inserts
    }

    /// Returns staged updates.
    #[must_use]
    pub fn updates(&self) -> &[Task] {
        &self.updates
    }

    /// Returns staged deletions.
    #[must_use]
    pub fn removals(&self) -> &[TaskId] {
        &self.removals
    }

    /// Returns the revisions read but not written.
    #[must_use]
    pub fn expected(&self) -> &[(TaskId, u64)] {
        &self.expected
    }

    /// Returns the identifiers of every task the change set touches.
    #[must_use]
    pub fn touched(&self) -> HashSet<TaskId> {
        self.inserts
            .iter()
            .chain(&self.updates)
            .map(Task::id)
            .chain(self.removals.iter().copied())
            .collect()
    }

    /// Returns whether nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.removals.is_empty()
    }
}

/// Task persistence contract.
///
/// Finder methods return live tasks only; soft-deleted tasks stay stored
/// but are invisible to queries other than [`TaskRepository::find_by_id`].
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Applies a change set atomically.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when an insert reuses
    /// an identifier, [`TaskRepositoryError::NotFound`] when an update or
    /// removal targets a missing task, and [`TaskRepositoryError::StaleTask`]
    /// when a staged or expected revision no longer matches, or when the
    /// new parent links would form a cycle. Nothing is applied on error.
    ///
    /// Each written task moves to its next revision. A parent whose set of
    /// children changes moves to its next revision as well.
    async fn commit(&self, changes: &TaskChangeSet) -> TaskRepositoryResult<()>;

    /// Persists a single existing task read at its current revision.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist
    /// and [`TaskRepositoryError::StaleTask`] when it changed since it was
    /// read.
    async fn update(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Finds a task by identifier, including soft-deleted tasks.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Returns the live direct children of `parent_id`.
    async fn find_children(&self, parent_id: TaskId) -> TaskRepositoryResult<Vec<Task>>;

    /// Returns every live task.
    async fn list_all(&self) -> TaskRepositoryResult<Vec<Task>>;

    /// Returns live tasks assigned to `sprint_id`, or the backlog for `None`.
    async fn find_by_sprint(&self, sprint_id: Option<SprintId>)
    -> TaskRepositoryResult<Vec<Task>>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The task changed after the write was staged.
    #[error("task {0} changed since it was read")]
    StaleTask(TaskId),

    /// The repository did not answer within the deadline.
    #[error("task repository timed out after {0:?}")]
    Timeout(Duration),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

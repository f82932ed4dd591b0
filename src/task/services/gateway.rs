//! Deadline-guarded repository access and staged change tracking.

use super::{TaskServiceError, TaskServiceResult};
use crate::config::PlannerConfig;
use crate::deadline;
use crate::sprint::domain::SprintId;
use crate::task::{
    domain::{Task, TaskId},
    ports::{TaskChangeSet, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Pending writes of one service operation.
///
/// Reads made while an operation is in flight see staged tasks in place of
/// their stored versions, so derived values are always computed from the
/// state that is about to be committed. Every stored task read through the
/// gateway is remembered at the revision it was read, and the commit is
/// rejected if any of them changed in the meantime.
#[derive(Debug, Default)]
pub(crate) struct WorkingSet {
    staged: HashMap<TaskId, Task>,
    inserted: HashSet<TaskId>,
    removed: HashSet<TaskId>,
    observed: Mutex<HashMap<TaskId, u64>>,
}

impl WorkingSet {
    pub(crate) fn insert(&mut self, task: Task) {
        self.inserted.insert(task.id());
        self.staged.insert(task.id(), task);
    }

    pub(crate) fn update(&mut self, task: Task) {
        self.staged.insert(task.id(), task);
    }

    pub(crate) fn remove(&mut self, id: TaskId) {
        self.staged.remove(&id);
        if !self.inserted.remove(&id) {
            self.removed.insert(id);
        }
    }

    /// Records the revision a stored task was read at. The first read wins.
    pub(crate) fn observe(&self, task: &Task) {
        self.observed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(task.id())
            .or_insert_with(|| task.revision());
    }

    pub(crate) fn get(&self, id: TaskId) -> Option<&Task> {
        self.staged.get(&id)
    }

    pub(crate) fn is_removed(&self, id: TaskId) -> bool {
        self.removed.contains(&id)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.removed.is_empty()
    }

    /// Replaces a stored task with its staged version, or drops it when
    /// staged for removal.
    fn overlay(&self, stored: Task) -> Option<Task> {
        if self.is_removed(stored.id()) {
            return None;
        }
        Some(self.staged.get(&stored.id()).cloned().unwrap_or(stored))
    }

    fn staged_children_of(&self, parent_id: TaskId) -> impl Iterator<Item = &Task> {
        self.staged
            .values()
            .filter(move |task| task.parent_id() == Some(parent_id) && task.is_live())
    }

    fn is_staged_update(&self, id: TaskId) -> bool {
        self.staged.contains_key(&id) && !self.inserted.contains(&id)
    }

    pub(crate) fn into_change_set(self) -> TaskChangeSet {
        let mut changes = TaskChangeSet::new();
        let observed = self
            .observed
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        for (id, revision) in observed {
            if !self.staged.contains_key(&id) && !self.inserted.contains(&id) {
                changes.expect_revision(id, revision);
            }
        }
        let mut staged: Vec<Task> = self.staged.into_values().collect();
        staged.sort_by_key(Task::level);
        for task in staged {
            if self.inserted.contains(&task.id()) {
                changes.insert(task);
            } else {
                changes.update(task);
            }
        }
        for id in self.removed {
            changes.remove(id);
        }
        changes
    }
}

/// Repository wrapper enforcing the configured call deadline.
#[derive(Debug)]
pub(crate) struct TaskGateway<R> {
    repository: Arc<R>,
    timeout: Duration,
    commit_attempts: u32,
}

impl<R> Clone for TaskGateway<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            timeout: self.timeout,
            commit_attempts: self.commit_attempts,
        }
    }
}

impl<R> TaskGateway<R>
where
    R: TaskRepository,
{
    pub(crate) const fn new(repository: Arc<R>, config: &PlannerConfig) -> Self {
        Self {
            repository,
            timeout: config.repository_timeout,
            commit_attempts: config.commit_attempts,
        }
    }

    /// Runs `operation` again from scratch while its commit loses to a
    /// concurrent write, up to the configured number of attempts.
    pub(crate) async fn retrying<T, F, Fut>(&self, operation: F) -> TaskServiceResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = TaskServiceResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Err(TaskServiceError::Repository(TaskRepositoryError::StaleTask(id)))
                    if attempt < self.commit_attempts =>
                {
                    tracing::debug!(task_id = %id, attempt, "stale write, retrying operation");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn call<T>(
        &self,
        operation: impl Future<Output = TaskRepositoryResult<T>>,
    ) -> TaskRepositoryResult<T> {
        deadline::within(self.timeout, operation, TaskRepositoryError::Timeout).await
    }

    pub(crate) async fn find(&self, id: TaskId) -> TaskServiceResult<Option<Task>> {
        Ok(self.call(self.repository.find_by_id(id)).await?)
    }

    /// Loads a live task, preferring its staged version.
    pub(crate) async fn require_live(
        &self,
        id: TaskId,
        working: &WorkingSet,
    ) -> TaskServiceResult<Task> {
        if working.is_removed(id) {
            return Err(TaskServiceError::NotFound(id));
        }
        let task = match working.get(id) {
            Some(staged) => Some(staged.clone()),
            None => {
                let stored = self.find(id).await?;
                if let Some(found) = &stored {
                    working.observe(found);
                }
                stored
            }
        };
        task.filter(Task::is_live)
            .ok_or(TaskServiceError::NotFound(id))
    }

    /// Returns the live children of `parent_id` as they will be after the
    /// staged writes, ordered by creation time then identifier.
    pub(crate) async fn children(
        &self,
        parent_id: TaskId,
        working: &WorkingSet,
    ) -> TaskServiceResult<Vec<Task>> {
        let stored = self.call(self.repository.find_children(parent_id)).await?;
        for task in &stored {
            working.observe(task);
        }
        let mut seen = HashSet::new();
        let mut children: Vec<Task> = stored
            .into_iter()
            .filter_map(|task| working.overlay(task))
            .filter(|task| task.parent_id() == Some(parent_id) && task.is_live())
            .inspect(|task| {
                seen.insert(task.id());
            })
            .collect();
        children.extend(
            working
                .staged_children_of(parent_id)
                .filter(|task| !seen.contains(&task.id()))
                .cloned(),
        );
        children.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(children)
    }

    /// Collects `root` and all live descendants, parents before children.
    pub(crate) async fn subtree(
        &self,
        root: &Task,
        working: &WorkingSet,
    ) -> TaskServiceResult<Vec<Task>> {
        let mut collected = vec![root.clone()];
        let mut visited = HashSet::from([root.id()]);
        let mut queue = VecDeque::from([root.id()]);
        while let Some(id) = queue.pop_front() {
            for child in self.children(id, working).await? {
                if visited.insert(child.id()) {
                    queue.push_back(child.id());
                    collected.push(child);
                }
            }
        }
        Ok(collected)
    }

    /// Returns the ancestors of `task`, nearest first.
    pub(crate) async fn ancestors(
        &self,
        task: &Task,
        working: &WorkingSet,
    ) -> TaskServiceResult<Vec<Task>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([task.id()]);
        let mut next = task.parent_id();
        while let Some(id) = next {
            if !visited.insert(id) {
                tracing::warn!(task_id = %task.id(), ancestor_id = %id, "cycle in parent chain");
                break;
            }
            let ancestor = self.require_live(id, working).await?;
            next = ancestor.parent_id();
            chain.push(ancestor);
        }
        Ok(chain)
    }

    pub(crate) async fn list_all(&self) -> TaskServiceResult<Vec<Task>> {
        Ok(self.call(self.repository.list_all()).await?)
    }

    pub(crate) async fn find_by_sprint(
        &self,
        sprint_id: Option<SprintId>,
    ) -> TaskServiceResult<Vec<Task>> {
        Ok(self.call(self.repository.find_by_sprint(sprint_id)).await?)
    }

    pub(crate) async fn commit(&self, working: WorkingSet) -> TaskServiceResult<()> {
        if working.is_empty() {
            return Ok(());
        }
        let changes = working.into_change_set();
        Ok(self.call(self.repository.commit(&changes)).await?)
    }

    /// Commits `working` and returns task `id` as stored by the commit.
    pub(crate) async fn commit_and_get(
        &self,
        working: WorkingSet,
        id: TaskId,
    ) -> TaskServiceResult<Task> {
        let mut task = self.require_live(id, &working).await?;
        let written = working.is_staged_update(id);
        self.commit(working).await?;
        if written {
            task.advance_revision();
        }
        Ok(task)
    }
}

//! In-memory repository for the task hierarchy.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::sprint::domain::SprintId;
use crate::task::{
    domain::{Task, TaskId},
    ports::{TaskChangeSet, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
    children_index: HashMap<TaskId, Vec<TaskId>>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl InMemoryTaskState {
    fn validate(&self, changes: &TaskChangeSet) -> TaskRepositoryResult<()> {
        if let Some(duplicate) = changes
            .inserts()
            .iter()
            .find(|task| self.tasks.contains_key(&task.id()))
        {
            return Err(TaskRepositoryError::DuplicateTask(duplicate.id()));
        }
        for staged in changes.updates() {
            let stored = self
                .tasks
                .get(&staged.id())
                .ok_or(TaskRepositoryError::NotFound(staged.id()))?;
            if stored.revision() != staged.revision() {
                return Err(TaskRepositoryError::StaleTask(staged.id()));
            }
        }
        if let Some(missing) = changes
            .removals()
            .iter()
            .find(|id| !self.tasks.contains_key(id))
        {
            return Err(TaskRepositoryError::NotFound(*missing));
        }
        for (id, revision) in changes.expected() {
            let current = self.tasks.get(id).map(Task::revision);
            if current != Some(*revision) {
                return Err(TaskRepositoryError::StaleTask(*id));
            }
        }
        self.check_acyclic(changes)
    }

    /// Walks the parent chain of every staged task as it would be after the
    /// commit.
    fn check_acyclic(&self, changes: &TaskChangeSet) -> TaskRepositoryResult<()> {
        let staged: HashMap<TaskId, Option<TaskId>> = changes
            .inserts()
            .iter()
            .chain(changes.updates())
            .map(|task| (task.id(), task.parent_id()))
            .collect();
        let parent_of = |id: TaskId| match staged.get(&id) {
            Some(parent) => *parent,
            None => self.tasks.get(&id).and_then(Task::parent_id),
        };

        for start in staged.keys() {
            let mut seen = HashSet::from([*start]);
            let mut next = parent_of(*start);
            while let Some(id) = next {
                if !seen.insert(id) {
                    return Err(TaskRepositoryError::StaleTask(*start));
                }
                next = parent_of(id);
            }
        }
        Ok(())
    }

    fn apply(&mut self, changes: &TaskChangeSet) {
        let written = changes.touched();
        let mut relinked = HashSet::new();
        for task in changes.inserts().iter().chain(changes.updates()) {
            relinked.extend(self.put(task));
        }
        for id in changes.removals() {
            relinked.extend(self.delete(*id));
        }
        for id in relinked.difference(&written) {
            if let Some(parent) = self.tasks.get_mut(id) {
                parent.advance_revision();
            }
        }
    }

    /// Stores `task` and returns the parents whose children changed.
    fn put(&mut self, task: &Task) -> Vec<TaskId> {
        let mut stored = task.clone();
        let previous_parent = match self.tasks.get(&task.id()) {
            Some(current) => {
                stored.advance_revision();
                current.parent_id()
            }
            None => None,
        };

        let mut relinked = Vec::new();
        if previous_parent != task.parent_id() {
            if let Some(parent) = previous_parent {
                unlink_child(&mut self.children_index, parent, task.id());
                relinked.push(parent);
            }
            if let Some(parent) = task.parent_id() {
                self.children_index
                    .entry(parent)
                    .or_default()
                    .push(task.id());
                relinked.push(parent);
            }
        }
        self.tasks.insert(task.id(), stored);
        relinked
    }

    fn delete(&mut self, id: TaskId) -> Option<TaskId> {
        let parent = self.tasks.remove(&id).and_then(|task| task.parent_id());
        if let Some(parent_id) = parent {
            unlink_child(&mut self.children_index, parent_id, id);
        }
        self.children_index.remove(&id);
        parent
    }

    fn live(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values().filter(|task| task.is_live())
    }
}

/// Removes a child from the parent index, cleaning up the entry if empty.
fn unlink_child(index: &mut HashMap<TaskId, Vec<TaskId>>, parent: TaskId, child: TaskId) {
    if let Some(ids) = index.get_mut(&parent) {
        ids.retain(|id| *id != child);
        if ids.is_empty() {
            index.remove(&parent);
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn commit(&self, changes: &TaskChangeSet) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        state.validate(changes)?;
        state.apply(changes);
        Ok(())
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        let mut changes = TaskChangeSet::new();
        changes.update(task.clone());
        state.validate(&changes)?;
        state.apply(&changes);
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn find_children(&self, parent_id: TaskId) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        let children = state
            .children_index
            .get(&parent_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.tasks.get(id))
                    .filter(|task| task.is_live())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(children)
    }

    async fn list_all(&self) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(state.live().cloned().collect())
    }

    async fn find_by_sprint(
        &self,
        sprint_id: Option<SprintId>,
    ) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(state
            .live()
            .filter(|task| task.sprint_id() == sprint_id)
            .cloned()
            .collect())
    }
}

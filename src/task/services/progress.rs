//! Ancestor progress roll-up.

use super::{
    TaskServiceResult,
    gateway::{TaskGateway, WorkingSet},
};
use crate::task::{
    domain::{ProgressWeighting, Task, TaskId, aggregate_children},
    ports::TaskRepository,
};
use std::collections::{HashSet, VecDeque};
use std::future::Future;

/// Re-derives container progress from children and walks it up to the root.
///
/// The walk is an explicit worklist over parent pointers with a visited
/// set, so a corrupted parent chain stops the walk instead of looping.
/// Every task and child read on the way is checked again at commit, so a
/// roll-up computed from siblings that changed concurrently is never
/// stored.
#[derive(Debug)]
pub struct ProgressAggregator<R> {
    gateway: TaskGateway<R>,
    weighting: ProgressWeighting,
}

impl<R> Clone for ProgressAggregator<R> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            weighting: self.weighting,
        }
    }
}

impl<R> ProgressAggregator<R>
where
    R: TaskRepository,
{
    pub(crate) const fn new(gateway: TaskGateway<R>, weighting: ProgressWeighting) -> Self {
        Self { gateway, weighting }
    }

    /// Recomputes `task_id` and every ancestor, committing any change.
    ///
    /// Running it twice without an intervening mutation yields the same
    /// values and commits nothing the second time.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`](super::TaskServiceError::NotFound)
    /// for unknown tasks or repository errors when loading or committing
    /// fails.
    pub async fn recompute(&self, task_id: TaskId) -> TaskServiceResult<Task> {
        self.gateway
            .retrying(|| self.recompute_once(task_id))
            .await
    }

    async fn recompute_once(&self, task_id: TaskId) -> TaskServiceResult<Task> {
        let mut working = WorkingSet::default();
        self.gateway.require_live(task_id, &working).await?;
        self.cascade(Some(task_id), &mut working).await?;
        self.gateway.commit_and_get(working, task_id).await
    }

    /// Stages progress updates for `start` and its ancestors.
    pub(crate) async fn cascade(
        &self,
        start: Option<TaskId>,
        working: &mut WorkingSet,
    ) -> TaskServiceResult<()> {
        let mut queue: VecDeque<TaskId> = start.into_iter().collect();
        let mut visited = HashSet::new();

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                tracing::warn!(task_id = %id, "cycle in parent chain, stopping progress roll-up");
                break;
            }
            if working.is_removed(id) {
                continue;
            }

            let view: &WorkingSet = working;
            let mut task = self
                .retry_once(id, || self.gateway.require_live(id, view))
                .await?;
            let children = self
                .retry_once(id, || self.gateway.children(id, view))
                .await?;

            if let Some(derived) = derived_progress(&task, &children, self.weighting)
                && derived != task.progress()
            {
                tracing::debug!(
                    task_id = %id,
                    from = task.progress(),
                    to = derived,
                    "rolled up progress"
                );
                task.set_progress(derived);
                working.update(task.clone());
            }

            if let Some(parent_id) = task.parent_id() {
                queue.push_back(parent_id);
            }
        }
        Ok(())
    }

    async fn retry_once<T, F, Fut>(&self, id: TaskId, load: F) -> TaskServiceResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = TaskServiceResult<T>>,
    {
        match load().await {
            Err(err) if err.is_retryable() => {
                tracing::warn!(task_id = %id, error = %err, "progress roll-up load failed, retrying once");
                load().await
            }
            result => result,
        }
    }
}

/// Returns the derived progress of `task`, or `None` when it is directly
/// settable.
fn derived_progress(task: &Task, children: &[Task], weighting: ProgressWeighting) -> Option<u8> {
    if !children.is_empty() {
        return Some(aggregate_children(children, weighting));
    }
    task.task_type().is_container().then_some(0)
}

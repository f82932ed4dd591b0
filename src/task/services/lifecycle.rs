//! Service layer for status transitions and their side effects.

use super::{
    TaskServiceResult,
    gateway::{TaskGateway, WorkingSet},
    progress::ProgressAggregator,
};
use crate::config::PlannerConfig;
use crate::identity::CurrentUser;
use crate::task::{
    domain::{StatusChange, Task, TaskDomainError, TaskId, TaskStatus},
    ports::{TaskRepository, TaskStatusListener},
};
use mockable::Clock;
use std::sync::{Arc, PoisonError, RwLock};

type ListenerRegistry = Arc<RwLock<Vec<Arc<dyn TaskStatusListener>>>>;

/// Task lifecycle orchestration service.
///
/// Each transition commits the task together with the re-derived progress
/// of its ancestors, then notifies subscribed listeners. A transition whose
/// commit loses to a concurrent write is replayed against fresh state.
/// Clones share the listener registry.
pub struct TaskLifecycleService<R, C, U>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
    U: CurrentUser,
{
    gateway: TaskGateway<R>,
    aggregator: ProgressAggregator<R>,
    clock: Arc<C>,
    identity: Arc<U>,
    listeners: ListenerRegistry,
}

impl<R, C, U> Clone for TaskLifecycleService<R, C, U>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
    U: CurrentUser,
{
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            aggregator: self.aggregator.clone(),
            clock: Arc::clone(&self.clock),
            identity: Arc::clone(&self.identity),
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<R, C, U> TaskLifecycleService<R, C, U>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
    U: CurrentUser,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>, identity: Arc<U>, config: &PlannerConfig) -> Self {
        let gateway = TaskGateway::new(repository, config);
        Self {
            aggregator: ProgressAggregator::new(gateway.clone(), config.weighting),
            gateway,
            clock,
            identity,
            listeners: Arc::default(),
        }
    }

    /// Registers a listener notified after every committed status change.
    pub fn subscribe(&self, listener: Arc<dyn TaskStatusListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Completes an open task or reopens a completed one.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] for blocked or archived
    /// tasks, [`TaskServiceError::NotFound`](super::TaskServiceError::NotFound)
    /// for unknown tasks and repository errors when persistence fails.
    pub async fn toggle(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.apply(id, |task, clock| task.toggle(clock)).await
    }

    /// Marks a task complete, rescheduling it when it recurs.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// draft, active or recurring, and repository errors when persistence
    /// fails.
    pub async fn complete(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.apply(id, |task, clock| task.complete(clock)).await
    }

    /// Blocks a task, remembering the status to restore.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] for blocked, archived
    /// or completed tasks and repository errors when persistence fails.
    pub async fn block(&self, id: TaskId, reason: impl Into<String>) -> TaskServiceResult<Task> {
        let reason = reason.into();
        self.apply(id, move |task, clock| task.block(reason.clone(), clock))
            .await
    }

    /// Restores a blocked task to the status it had before blocking.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// blocked, and repository errors when persistence fails.
    pub async fn unblock(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.apply(id, |task, clock| task.unblock(clock)).await
    }

    /// Archives a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] for archived tasks and
    /// repository errors when persistence fails.
    pub async fn archive(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.apply(id, |task, clock| task.archive(clock)).await
    }

    /// Restores an archived task to the status it had before archiving.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// archived, and repository errors when persistence fails.
    pub async fn unarchive(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.apply(id, |task, clock| task.unarchive(clock)).await
    }

    /// Moves a task into a board column through the matching transition.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] when no transition
    /// leads to `status`, and repository errors when persistence fails.
    pub async fn move_to_status(&self, id: TaskId, status: TaskStatus) -> TaskServiceResult<Task> {
        self.apply(id, move |task, clock| task.move_status(status, clock))
            .await
    }

    /// Promotes a root task or epic to a project.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidConversion`] when the task has a
    /// parent, a blocked ancestor, or is already a project or milestone,
    /// and repository errors when persistence fails.
    pub async fn convert_to_project(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.gateway
            .retrying(|| self.convert_once(id))
            .await
    }

    async fn convert_once(&self, id: TaskId) -> TaskServiceResult<Task> {
        let mut working = WorkingSet::default();
        let mut task = self.gateway.require_live(id, &working).await?;
        let ancestors = self.gateway.ancestors(&task, &working).await?;
        let blocked_ancestor = ancestors
            .iter()
            .find(|ancestor| ancestor.status() == TaskStatus::Blocked)
            .map(Task::id);

        task.convert_to_project(blocked_ancestor, &*self.clock)?;
        task.stamp(self.identity.current_user());
        working.update(task);
        self.aggregator.cascade(Some(id), &mut working).await?;

        let converted = self.gateway.commit_and_get(working, id).await?;
        tracing::debug!(task_id = %id, "converted task to project");
        Ok(converted)
    }

    async fn apply<F>(&self, id: TaskId, transition: F) -> TaskServiceResult<Task>
    where
        F: Fn(&mut Task, &C) -> Result<StatusChange, TaskDomainError> + Send + Sync,
    {
        self.gateway
            .retrying(|| self.apply_once(id, &transition))
            .await
    }

    async fn apply_once<F>(&self, id: TaskId, transition: &F) -> TaskServiceResult<Task>
    where
        F: Fn(&mut Task, &C) -> Result<StatusChange, TaskDomainError> + Send + Sync,
    {
        let mut working = WorkingSet::default();
        let mut task = self.gateway.require_live(id, &working).await?;
        let change = transition(&mut task, &*self.clock)?;
        if !change.is_change() {
            return Ok(task);
        }

        let is_leaf = !task.task_type().is_container()
            && self.gateway.children(id, &working).await?.is_empty();
        if is_leaf {
            match change.to {
                TaskStatus::Completed => task.set_progress(100),
                TaskStatus::Recurring => task.set_progress(0),
                _ => {}
            }
        }
        task.stamp(self.identity.current_user());
        working.update(task);
        self.aggregator.cascade(Some(id), &mut working).await?;

        let committed = self.gateway.commit_and_get(working, id).await?;
        tracing::debug!(
            task_id = %id,
            from = %change.from,
            to = %change.to,
            "task status changed"
        );
        self.notify(&committed, change);
        Ok(committed)
    }

    fn notify(&self, task: &Task, change: StatusChange) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.task_status_changed(task, change);
        }
    }
}

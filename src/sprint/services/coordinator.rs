//! Sprint lifecycle and task-to-sprint assignment.

use super::{BoardViewCache, SprintServiceError, SprintServiceResult};
use crate::config::PlannerConfig;
use crate::deadline;
use crate::identity::CurrentUser;
use crate::sprint::{
    domain::{
        BoardColumn, Sprint, SprintBoard, SprintDraft, SprintFilter, SprintId, SprintStatus,
        SprintSummary,
    },
    ports::{SprintRepository, SprintRepositoryError, SprintRepositoryResult},
};
use crate::task::{
    domain::{Task, TaskId, TaskStatus},
    ports::TaskRepository,
    services::{
        TaskGateway, TaskLifecycleService, TaskServiceError, TaskServiceResult, WorkingSet,
    },
};
use chrono::NaiveDate;
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Request payload for creating a sprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSprintRequest {
    draft: SprintDraft,
}

impl CreateSprintRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            draft: SprintDraft::new(name, start_date, end_date),
        }
    }

    /// Sets the sprint goal.
    #[must_use]
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.draft = self.draft.with_goal(goal);
        self
    }
}

/// Partial update of a sprint. The status is changed only through
/// [`SprintAssignmentCoordinator::start_sprint`] and
/// [`SprintAssignmentCoordinator::complete_sprint`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSprintRequest {
    name: Option<String>,
    goal: Option<Option<String>>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl UpdateSprintRequest {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replaces or clears the goal.
    #[must_use]
    pub fn with_goal(mut self, goal: Option<String>) -> Self {
        self.goal = Some(goal);
        self
    }

    /// Replaces the start date.
    #[must_use]
    pub const fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Replaces the end date.
    #[must_use]
    pub const fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }
}

/// Where the tasks of a removed sprint go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprintReassignment {
    /// Unassign them.
    Backlog,
    /// Move them to another sprint.
    Sprint(SprintId),
}

/// Result of removing a sprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintRemoval {
    /// The removed sprint.
    pub sprint_id: SprintId,
    /// Tasks moved off the sprint before removal.
    pub reassigned: Vec<TaskId>,
    /// Sprint the tasks moved to, or `None` for the backlog.
    pub target: Option<SprintId>,
}

/// Coordinates sprints, task assignment and board views.
///
/// Owns a [`TaskLifecycleService`] with the board cache subscribed, so
/// transitions made through [`lifecycle`](Self::lifecycle) keep the boards
/// in step.
pub struct SprintAssignmentCoordinator<S, R, C, U>
where
    S: SprintRepository,
    R: TaskRepository,
    C: Clock + Send + Sync,
    U: CurrentUser,
{
    sprints: Arc<S>,
    tasks: TaskGateway<R>,
    lifecycle: TaskLifecycleService<R, C, U>,
    board: Arc<BoardViewCache>,
    clock: Arc<C>,
    identity: Arc<U>,
    timeout: Duration,
}

impl<S, R, C, U> Clone for SprintAssignmentCoordinator<S, R, C, U>
where
    S: SprintRepository,
    R: TaskRepository,
    C: Clock + Send + Sync,
    U: CurrentUser,
{
    fn clone(&self) -> Self {
        Self {
            sprints: Arc::clone(&self.sprints),
            tasks: self.tasks.clone(),
            lifecycle: self.lifecycle.clone(),
            board: Arc::clone(&self.board),
            clock: Arc::clone(&self.clock),
            identity: Arc::clone(&self.identity),
            timeout: self.timeout,
        }
    }
}

impl<S, R, C, U> SprintAssignmentCoordinator<S, R, C, U>
where
    S: SprintRepository,
    R: TaskRepository,
    C: Clock + Send + Sync,
    U: CurrentUser,
{
    /// Creates a coordinator over the given repositories.
    #[must_use]
    pub fn new(
        sprints: Arc<S>,
        tasks: Arc<R>,
        clock: Arc<C>,
        identity: Arc<U>,
        config: &PlannerConfig,
    ) -> Self {
        let lifecycle = TaskLifecycleService::new(
            Arc::clone(&tasks),
            Arc::clone(&clock),
            Arc::clone(&identity),
            config,
        );
        let board = Arc::new(BoardViewCache::new());
        lifecycle.subscribe(Arc::clone(&board) as Arc<dyn crate::task::ports::TaskStatusListener>);
        Self {
            sprints,
            tasks: TaskGateway::new(tasks, config),
            lifecycle,
            board,
            clock,
            identity,
            timeout: config.repository_timeout,
        }
    }

    /// Returns the lifecycle service whose transitions update the boards.
    #[must_use]
    pub const fn lifecycle(&self) -> &TaskLifecycleService<R, C, U> {
        &self.lifecycle
    }

    /// Creates a planned sprint.
    ///
    /// # Errors
    ///
    /// Returns a domain error for blank names or inverted date ranges and
    /// repository errors when persistence fails.
    pub async fn create(&self, request: CreateSprintRequest) -> SprintServiceResult<Sprint> {
        let sprint = Sprint::new(request.draft, self.identity.current_user(), &*self.clock)?;
        self.call(self.sprints.store(&sprint)).await?;
        tracing::debug!(sprint_id = %sprint.id(), name = sprint.name(), "created sprint");
        Ok(sprint)
    }

    /// Applies a partial update to a sprint.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::NotFound`] for unknown sprints, a
    /// domain error for blank names or inverted date ranges, and repository
    /// errors when persistence fails.
    pub async fn update(
        &self,
        id: SprintId,
        request: UpdateSprintRequest,
    ) -> SprintServiceResult<Sprint> {
        let mut sprint = self.require(id).await?;
        if let Some(name) = request.name {
            sprint.rename(name, &*self.clock)?;
        }
        if let Some(goal) = request.goal {
            sprint.set_goal(goal, &*self.clock);
        }
        if request.start_date.is_some() || request.end_date.is_some() {
            let start = request.start_date.unwrap_or_else(|| sprint.start_date());
            let end = request.end_date.unwrap_or_else(|| sprint.end_date());
            sprint.reschedule(start, end, &*self.clock)?;
        }
        sprint.stamp(self.identity.current_user());
        self.call(self.sprints.update(&sprint)).await?;
        tracing::debug!(sprint_id = %id, "updated sprint");
        Ok(sprint)
    }

    /// Deletes a sprint, first moving its tasks off it.
    ///
    /// Tasks of a planned sprint go to the backlog unless `reassignment`
    /// says otherwise. Active and completed sprints that still hold tasks
    /// need an explicit `reassignment`. Tasks assigned while the sprint is
    /// being deleted are swept to the same destination afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::SprintHasTasks`] when tasks would be
    /// orphaned, [`SprintServiceError::SelfReassignment`] or
    /// [`SprintServiceError::SprintClosed`] for an unusable target, and
    /// repository errors when persistence fails.
    pub async fn remove(
        &self,
        id: SprintId,
        reassignment: Option<SprintReassignment>,
    ) -> SprintServiceResult<SprintRemoval> {
        let sprint = self.require(id).await?;
        let assigned = self.tasks.find_by_sprint(Some(id)).await?;

        let target = match reassignment {
            _ if assigned.is_empty() => None,
            None if sprint.status() == SprintStatus::Planned => None,
            None => {
                return Err(SprintServiceError::SprintHasTasks {
                    sprint_id: id,
                    assigned: assigned.len(),
                });
            }
            Some(SprintReassignment::Backlog) => None,
            Some(SprintReassignment::Sprint(target_id)) => {
                if target_id == id {
                    return Err(SprintServiceError::SelfReassignment(id));
                }
                self.require_open(target_id).await?;
                Some(target_id)
            }
        };

        let mut reassigned = self.release_tasks(id, target).await?;
        self.call(self.sprints.delete(id)).await?;
        let stragglers = self.release_tasks(id, target).await?;
        if !stragglers.is_empty() {
            tracing::debug!(
                sprint_id = %id,
                stragglers = stragglers.len(),
                "moved tasks assigned during sprint removal"
            );
        }
        reassigned.extend(stragglers);
        self.board.forget(Some(id));

        tracing::debug!(
            sprint_id = %id,
            reassigned = reassigned.len(),
            target = ?target,
            "removed sprint"
        );
        Ok(SprintRemoval {
            sprint_id: id,
            reassigned,
            target,
        })
    }

    /// Lists sprints matching `filter`, earliest start first.
    ///
    /// # Errors
    ///
    /// Returns repository errors when loading fails.
    pub async fn find_all(&self, filter: &SprintFilter) -> SprintServiceResult<Vec<Sprint>> {
        let mut sprints: Vec<Sprint> = self
            .call(self.sprints.list_all())
            .await?
            .into_iter()
            .filter(|sprint| filter.matches(sprint))
            .collect();
        sprints.sort_by_key(|sprint| (sprint.start_date(), sprint.created_at(), sprint.id()));
        Ok(sprints)
    }

    /// Retrieves a sprint.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::NotFound`] for unknown sprints and
    /// repository errors when loading fails.
    pub async fn find_one(&self, id: SprintId) -> SprintServiceResult<Sprint> {
        self.require(id).await
    }

    /// Returns the active sprint, if any.
    ///
    /// # Errors
    ///
    /// Returns repository errors when loading fails.
    pub async fn active_sprint(&self) -> SprintServiceResult<Option<Sprint>> {
        Ok(self.call(self.sprints.find_active()).await?)
    }

    /// Starts a planned sprint.
    ///
    /// # Errors
    ///
    /// Returns [`SprintRepositoryError::ActiveSprintConflict`] when another
    /// sprint is active, a domain error unless the sprint is planned, and
    /// repository errors when persistence fails.
    pub async fn start_sprint(&self, id: SprintId) -> SprintServiceResult<Sprint> {
        let mut sprint = self.require(id).await?;
        sprint.start(&*self.clock)?;
        sprint.stamp(self.identity.current_user());
        self.call(self.sprints.update(&sprint)).await?;
        tracing::info!(sprint_id = %id, name = sprint.name(), "sprint started");
        Ok(sprint)
    }

    /// Completes the active sprint. Its tasks stay assigned.
    ///
    /// # Errors
    ///
    /// Returns a domain error unless the sprint is active and repository
    /// errors when persistence fails.
    pub async fn complete_sprint(&self, id: SprintId) -> SprintServiceResult<Sprint> {
        let mut sprint = self.require(id).await?;
        sprint.complete(&*self.clock)?;
        sprint.stamp(self.identity.current_user());
        self.call(self.sprints.update(&sprint)).await?;
        tracing::info!(sprint_id = %id, name = sprint.name(), "sprint completed");
        Ok(sprint)
    }

    /// Assigns a task to a sprint, or to the backlog for `None`.
    ///
    /// The task's status is never changed.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::NotFound`] for unknown sprints,
    /// [`SprintServiceError::SprintClosed`] for completed ones, task errors
    /// for unknown tasks and repository errors when persistence fails.
    pub async fn assign_task(
        &self,
        task_id: TaskId,
        sprint_id: Option<SprintId>,
    ) -> SprintServiceResult<Task> {
        if let Some(target_id) = sprint_id {
            self.require_open(target_id).await?;
        }
        let (task, previous) = self
            .tasks
            .retrying(|| self.assign_once(task_id, sprint_id))
            .await?;
        if previous != sprint_id {
            self.board.detach(task_id);
            tracing::debug!(
                task_id = %task_id,
                from = ?previous,
                to = ?sprint_id,
                "assigned task to sprint"
            );
        }
        Ok(task)
    }

    /// Stages and commits one sprint assignment, returning the task and the
    /// sprint it left.
    async fn assign_once(
        &self,
        task_id: TaskId,
        sprint_id: Option<SprintId>,
    ) -> TaskServiceResult<(Task, Option<SprintId>)> {
        let mut working = WorkingSet::default();
        let mut task = self.tasks.require_live(task_id, &working).await?;
        let previous = task.sprint_id();
        if previous == sprint_id {
            return Ok((task, previous));
        }

        task.assign_sprint(sprint_id, &*self.clock);
        task.stamp(self.identity.current_user());
        working.update(task);
        let assigned = self.tasks.commit_and_get(working, task_id).await?;
        Ok((assigned, previous))
    }

    /// Moves every task still assigned to `sprint_id` to `target`.
    async fn release_tasks(
        &self,
        sprint_id: SprintId,
        target: Option<SprintId>,
    ) -> TaskServiceResult<Vec<TaskId>> {
        self.tasks
            .retrying(move || async move {
                let assigned = self.tasks.find_by_sprint(Some(sprint_id)).await?;
                let actor = self.identity.current_user();
                let mut working = WorkingSet::default();
                let mut released = Vec::with_capacity(assigned.len());
                for mut task in assigned {
                    released.push(task.id());
                    task.assign_sprint(target, &*self.clock);
                    task.stamp(actor);
                    working.update(task);
                }
                self.tasks.commit(working).await?;
                Ok(released)
            })
            .await
    }

    /// Moves a task to another board column through the lifecycle rules.
    ///
    /// # Errors
    ///
    /// Returns task errors when the transition is not allowed or
    /// persistence fails.
    pub async fn move_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
    ) -> SprintServiceResult<Task> {
        Ok(self.lifecycle.move_to_status(task_id, status).await?)
    }

    /// Moves a task to `position` (zero-based) within its board column.
    ///
    /// # Errors
    ///
    /// Returns task errors for unknown tasks and repository errors when
    /// loading fails.
    pub async fn reorder(&self, task_id: TaskId, position: usize) -> SprintServiceResult<BoardColumn> {
        let task = self
            .tasks
            .require_live(task_id, &WorkingSet::default())
            .await?;
        let sprint_id = task.sprint_id();
        let peers = self.tasks.find_by_sprint(sprint_id).await?;
        let column = self
            .board
            .reorder(sprint_id, peers, task_id, position)
            .ok_or(TaskServiceError::NotFound(task_id))?;
        tracing::debug!(task_id = %task_id, position, status = %column.status, "reordered task");
        Ok(column)
    }

    /// Returns unassigned tasks, most pressing first.
    ///
    /// # Errors
    ///
    /// Returns repository errors when loading fails.
    pub async fn backlog(&self) -> SprintServiceResult<Vec<Task>> {
        let mut tasks = self.tasks.find_by_sprint(None).await?;
        tasks.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.created_at().cmp(&b.created_at()))
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(tasks)
    }

    /// Returns the Kanban board of a sprint.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::NotFound`] for unknown sprints and
    /// repository errors when loading fails.
    pub async fn board_for(&self, sprint_id: SprintId) -> SprintServiceResult<SprintBoard> {
        let sprint = self.require(sprint_id).await?;
        let tasks = self.tasks.find_by_sprint(Some(sprint_id)).await?;
        Ok(SprintBoard {
            sprint,
            columns: self.board.arrange(Some(sprint_id), tasks),
        })
    }

    /// Summarises task counts and completion for a sprint.
    ///
    /// # Errors
    ///
    /// Returns [`SprintServiceError::NotFound`] for unknown sprints and
    /// repository errors when loading fails.
    pub async fn sprint_summary(&self, sprint_id: SprintId) -> SprintServiceResult<SprintSummary> {
        let board = self.board_for(sprint_id).await?;
        Ok(SprintSummary::of(&board))
    }

    async fn call<T>(
        &self,
        operation: impl Future<Output = SprintRepositoryResult<T>>,
    ) -> SprintRepositoryResult<T> {
        deadline::within(self.timeout, operation, SprintRepositoryError::Timeout).await
    }

    async fn require(&self, id: SprintId) -> SprintServiceResult<Sprint> {
        self.call(self.sprints.find_by_id(id))
            .await?
            .ok_or(SprintServiceError::NotFound(id))
    }

    async fn require_open(&self, id: SprintId) -> SprintServiceResult<Sprint> {
        let sprint = self.require(id).await?;
        if !sprint.status().accepts_tasks() {
            return Err(SprintServiceError::SprintClosed(id));
        }
        Ok(sprint)
    }
}

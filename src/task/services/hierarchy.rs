//! Service layer for creating, restructuring and querying the task tree.

use super::{
    TaskServiceError, TaskServiceResult,
    gateway::{TaskGateway, WorkingSet},
    progress::ProgressAggregator,
};
use crate::config::PlannerConfig;
use crate::identity::CurrentUser;
use crate::task::{
    domain::{
        Hours, Placement, Priority, Recurrence, Task, TaskDomainError, TaskDraft, TaskFilter,
        TaskId, TaskPage, TaskStats, TaskTree, TaskType,
    },
    ports::TaskRepository,
};
use chrono::NaiveDate;
use mockable::Clock;
use std::collections::HashMap;
use std::sync::Arc;

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    draft: TaskDraft,
    parent_id: Option<TaskId>,
}

impl CreateTaskRequest {
    /// Creates a request for a root task with default attributes.
    #[must_use]
    pub fn new(title: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            draft: TaskDraft::new(title, task_type),
            parent_id: None,
        }
    }

    /// Places the new task below `parent_id`.
    #[must_use]
    pub const fn with_parent(mut self, parent_id: TaskId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.draft.description = Some(description.into());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.draft.priority = priority;
        self
    }

    /// Sets the recurrence rule.
    #[must_use]
    pub const fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.draft.recurrence = recurrence;
        self
    }

    /// Sets the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.draft.due_date = Some(due_date);
        self
    }

    /// Sets the start date.
    #[must_use]
    pub const fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.draft.start_date = Some(start_date);
        self
    }

    /// Sets the effort estimate.
    #[must_use]
    pub const fn with_estimated_hours(mut self, hours: Hours) -> Self {
        self.draft.estimated_hours = Some(hours);
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.draft.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Partial update of a task's attributes.
///
/// Fields left as `None` are unchanged. Nullable attributes take an inner
/// `Option` so they can be cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTaskRequest {
    title: Option<String>,
    description: Option<Option<String>>,
    priority: Option<Priority>,
    recurrence: Option<Recurrence>,
    due_date: Option<Option<NaiveDate>>,
    start_date: Option<Option<NaiveDate>>,
    estimated_hours: Option<Option<Hours>>,
    actual_hours: Option<Option<Hours>>,
    tags: Option<Vec<String>>,
    progress: Option<u8>,
}

impl UpdateTaskRequest {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces or clears the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Replaces the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Replaces the recurrence rule.
    #[must_use]
    pub const fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    /// Replaces or clears the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Replaces or clears the start date.
    #[must_use]
    pub const fn with_start_date(mut self, start_date: Option<NaiveDate>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Replaces or clears the effort estimate.
    #[must_use]
    pub const fn with_estimated_hours(mut self, hours: Option<Hours>) -> Self {
        self.estimated_hours = Some(hours);
        self
    }

    /// Replaces or clears the effort spent.
    #[must_use]
    pub const fn with_actual_hours(mut self, hours: Option<Hours>) -> Self {
        self.actual_hours = Some(hours);
        self
    }

    /// Replaces the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Sets progress directly; only childless tasks and milestones accept it.
    #[must_use]
    pub const fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    fn apply_to(self, task: &mut Task, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if let Some(title) = self.title {
            task.rename(title, clock)?;
        }
        if let Some(description) = self.description {
            task.set_description(description, clock);
        }
        if let Some(priority) = self.priority {
            task.set_priority(priority, clock);
        }
        if let Some(recurrence) = self.recurrence {
            task.set_recurrence(recurrence, clock)?;
        }
        if let Some(due_date) = self.due_date {
            task.set_due_date(due_date, clock)?;
        }
        if let Some(start_date) = self.start_date {
            task.set_start_date(start_date, clock);
        }
        if let Some(hours) = self.estimated_hours {
            task.set_estimated_hours(hours, clock);
        }
        if let Some(hours) = self.actual_hours {
            task.set_actual_hours(hours, clock);
        }
        if let Some(tags) = self.tags {
            task.set_tags(tags, clock);
        }
        if let Some(progress) = self.progress {
            task.report_progress(progress, clock);
        }
        Ok(())
    }
}

/// A task together with its immediate relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetails {
    /// The requested task.
    pub task: Task,
    /// Its parent, when loaded and present.
    pub parent: Option<Task>,
    /// Its live children ordered by creation time.
    pub children: Vec<Task>,
    /// Its ancestors, nearest first.
    pub ancestors: Vec<Task>,
}

/// Result of removing a task and its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOutcome {
    /// Every removed task, the requested one first.
    pub removed: Vec<TaskId>,
    /// Whether the records were kept with a deletion timestamp.
    pub soft_deleted: bool,
}

/// Task hierarchy orchestration service.
#[derive(Debug)]
pub struct TaskHierarchyService<R, C, U>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
    U: CurrentUser,
{
    gateway: TaskGateway<R>,
    aggregator: ProgressAggregator<R>,
    clock: Arc<C>,
    identity: Arc<U>,
    config: PlannerConfig,
}

impl<R, C, U> Clone for TaskHierarchyService<R, C, U>
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
            config: self.config.clone(),
        }
    }
}

impl<R, C, U> TaskHierarchyService<R, C, U>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
    U: CurrentUser,
{
    /// Creates a new task hierarchy service.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>, identity: Arc<U>, config: &PlannerConfig) -> Self {
        let gateway = TaskGateway::new(repository, config);
        Self {
            aggregator: ProgressAggregator::new(gateway.clone(), config.weighting),
            gateway,
            clock,
            identity,
            config: config.clone(),
        }
    }

    /// Returns the progress aggregator sharing this service's repository.
    #[must_use]
    pub const fn progress(&self) -> &ProgressAggregator<R> {
        &self.aggregator
    }

    /// Creates a task, validating the nesting rules against its parent.
    ///
    /// The parent chain's progress is re-derived in the same commit.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] when the parent does not exist,
    /// a domain error when the title is blank, the nesting rules reject the
    /// child, or the recurrence cannot be scheduled, and repository errors
    /// when persistence fails.
    pub async fn create(&self, request: CreateTaskRequest) -> TaskServiceResult<Task> {
        self.gateway
            .retrying(|| self.create_once(request.clone()))
            .await
    }

    async fn create_once(&self, request: CreateTaskRequest) -> TaskServiceResult<Task> {
        let mut working = WorkingSet::default();
        let placement = match request.parent_id {
            Some(parent_id) => {
                let parent = self.gateway.require_live(parent_id, &working).await?;
                let siblings = self.gateway.children(parent_id, &working).await?;
                self.check_nesting(&parent, request.draft.task_type, siblings.len())?;
                Placement::under(&parent)
            }
            None => Placement::ROOT,
        };

        let task = Task::new(
            request.draft,
            placement,
            self.identity.current_user(),
            &*self.clock,
        )?;
        let task_id = task.id();
        working.insert(task);
        self.aggregator.cascade(Some(task_id), &mut working).await?;

        let created = self.gateway.commit_and_get(working, task_id).await?;
        tracing::debug!(
            task_id = %task_id,
            parent_id = ?created.parent_id(),
            task_type = %created.task_type(),
            "created task"
        );
        Ok(created)
    }

    /// Applies a partial update to a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::DerivedProgress`] when progress is set on
    /// a task whose progress is derived from children, other domain errors
    /// for invalid attribute values, and repository errors when persistence
    /// fails.
    pub async fn update(&self, id: TaskId, request: UpdateTaskRequest) -> TaskServiceResult<Task> {
        self.gateway
            .retrying(|| self.update_once(id, request.clone()))
            .await
    }

    async fn update_once(&self, id: TaskId, request: UpdateTaskRequest) -> TaskServiceResult<Task> {
        let mut working = WorkingSet::default();
        let mut task = self.gateway.require_live(id, &working).await?;
        if request.progress.is_some() {
            let children = self.gateway.children(id, &working).await?;
            if !children.is_empty() || task.task_type().is_container() {
                return Err(TaskDomainError::DerivedProgress(id).into());
            }
        }

        request.apply_to(&mut task, &*self.clock)?;
        task.stamp(self.identity.current_user());
        working.update(task);
        self.aggregator.cascade(Some(id), &mut working).await?;

        let updated = self.gateway.commit_and_get(working, id).await?;
        tracing::debug!(task_id = %id, "updated task");
        Ok(updated)
    }

    /// Adds logged effort to a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] for unknown tasks or
    /// repository errors when persistence fails.
    pub async fn log_work(&self, id: TaskId, hours: Hours) -> TaskServiceResult<Task> {
        self.gateway
            .retrying(|| self.log_work_once(id, hours))
            .await
    }

    async fn log_work_once(&self, id: TaskId, hours: Hours) -> TaskServiceResult<Task> {
        let mut working = WorkingSet::default();
        let mut task = self.gateway.require_live(id, &working).await?;
        task.log_hours(hours, &*self.clock);
        task.stamp(self.identity.current_user());
        working.update(task);
        let logged = self.gateway.commit_and_get(working, id).await?;
        tracing::debug!(task_id = %id, hours = %hours, "logged work");
        Ok(logged)
    }

    /// Moves a task (and its subtree) below a new parent, or to the root
    /// when `new_parent_id` is `None`.
    ///
    /// Descendant levels and the progress of both the old and the new
    /// ancestor chains are updated in the same commit.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::CyclicParent`] when the new parent is the
    /// task itself or one of its descendants, a hierarchy error when the
    /// nesting rules reject the move, and repository errors when
    /// persistence fails.
    pub async fn reparent(
        &self,
        id: TaskId,
        new_parent_id: Option<TaskId>,
    ) -> TaskServiceResult<Task> {
        self.gateway
            .retrying(|| self.reparent_once(id, new_parent_id))
            .await
    }

    async fn reparent_once(
        &self,
        id: TaskId,
        new_parent_id: Option<TaskId>,
    ) -> TaskServiceResult<Task> {
        let mut working = WorkingSet::default();
        let mut task = self.gateway.require_live(id, &working).await?;
        let old_parent_id = task.parent_id();
        if old_parent_id == new_parent_id {
            return Ok(task);
        }

        let placement = match new_parent_id {
            Some(parent_id) => {
                let parent = self.gateway.require_live(parent_id, &working).await?;
                let lineage = self.gateway.ancestors(&parent, &working).await?;
                if parent_id == id || lineage.iter().any(|ancestor| ancestor.id() == id) {
                    return Err(TaskDomainError::CyclicParent {
                        task_id: id,
                        parent_id,
                    }
                    .into());
                }
                let siblings = self.gateway.children(parent_id, &working).await?;
                self.check_nesting(&parent, task.task_type(), siblings.len())?;
                Placement::under(&parent)
            }
            None => Placement::ROOT,
        };

        let subtree = self.gateway.subtree(&task, &working).await?;
        task.place(placement, &*self.clock);
        task.stamp(self.identity.current_user());

        let mut levels = HashMap::from([(id, placement.level)]);
        for mut descendant in subtree.into_iter().skip(1) {
            let Some(parent_level) = descendant.parent_id().and_then(|p| levels.get(&p)) else {
                continue;
            };
            let level = parent_level.saturating_add(1);
            levels.insert(descendant.id(), level);
            if descendant.level() != level {
                descendant.set_level(level);
                working.update(descendant);
            }
        }
        working.update(task);

        self.aggregator.cascade(old_parent_id, &mut working).await?;
        self.aggregator.cascade(Some(id), &mut working).await?;

        let moved = self.gateway.commit_and_get(working, id).await?;
        tracing::debug!(
            task_id = %id,
            from = ?old_parent_id,
            to = ?new_parent_id,
            "reparented task"
        );
        Ok(moved)
    }

    /// Retrieves a task, optionally with its parent, children and ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] for unknown or deleted tasks
    /// and repository errors when loading fails.
    pub async fn find_one(
        &self,
        id: TaskId,
        include_relations: bool,
    ) -> TaskServiceResult<TaskDetails> {
        let working = WorkingSet::default();
        let task = self.gateway.require_live(id, &working).await?;
        if !include_relations {
            return Ok(TaskDetails {
                task,
                parent: None,
                children: Vec::new(),
                ancestors: Vec::new(),
            });
        }

        let children = self.gateway.children(id, &working).await?;
        let ancestors = self.gateway.ancestors(&task, &working).await?;
        Ok(TaskDetails {
            parent: ancestors.first().cloned(),
            task,
            children,
            ancestors,
        })
    }

    /// Returns the live children of a task ordered by creation time.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] when the parent does not exist
    /// and repository errors when loading fails.
    pub async fn find_children(&self, parent_id: TaskId) -> TaskServiceResult<Vec<Task>> {
        let working = WorkingSet::default();
        self.gateway.require_live(parent_id, &working).await?;
        self.gateway.children(parent_id, &working).await
    }

    /// Loads the subtree rooted at `root_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] when the root does not exist
    /// and repository errors when loading fails.
    pub async fn find_tree(&self, root_id: TaskId) -> TaskServiceResult<TaskTree> {
        let working = WorkingSet::default();
        let root = self.gateway.require_live(root_id, &working).await?;
        let subtree = self.gateway.subtree(&root, &working).await?;

        let mut children: HashMap<TaskId, Vec<Task>> = HashMap::new();
        for task in subtree.into_iter().skip(1) {
            if let Some(parent_id) = task.parent_id() {
                children.entry(parent_id).or_default().push(task);
            }
        }
        Ok(TaskTree::new(root, children))
    }

    /// Removes a task and all its descendants.
    ///
    /// The configured [`RetentionPolicy`](crate::config::RetentionPolicy)
    /// decides between soft and hard deletion. The former parent's progress
    /// is re-derived in the same commit.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] for unknown tasks and
    /// repository errors when persistence fails.
    pub async fn remove(&self, id: TaskId) -> TaskServiceResult<RemovalOutcome> {
        self.gateway.retrying(|| self.remove_once(id)).await
    }

    async fn remove_once(&self, id: TaskId) -> TaskServiceResult<RemovalOutcome> {
        let mut working = WorkingSet::default();
        let task = self.gateway.require_live(id, &working).await?;
        let parent_id = task.parent_id();
        let subtree = self.gateway.subtree(&task, &working).await?;
        let soft_deleted = self.config.retention.retains(subtree.len());
        let actor = self.identity.current_user();

        let mut removed = Vec::with_capacity(subtree.len());
        for mut member in subtree {
            removed.push(member.id());
            if soft_deleted {
                member.mark_deleted(&*self.clock);
                member.stamp(actor);
                working.update(member);
            } else {
                working.remove(member.id());
            }
        }

        self.aggregator.cascade(parent_id, &mut working).await?;
        self.gateway.commit(working).await?;
        tracing::debug!(
            task_id = %id,
            removed = removed.len(),
            soft_deleted,
            "removed task subtree"
        );
        Ok(RemovalOutcome {
            removed,
            soft_deleted,
        })
    }

    /// Lists live tasks matching `filter`, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns repository errors when loading fails.
    pub async fn find_all(&self, filter: &TaskFilter) -> TaskServiceResult<TaskPage> {
        let today = self.today();
        let matching: Vec<Task> = self
            .gateway
            .list_all()
            .await?
            .into_iter()
            .filter(|task| filter.matches(task, today))
            .collect();
        Ok(TaskPage::paginate(
            matching,
            filter,
            self.config.default_page_size,
            self.config.max_page_size,
        ))
    }

    /// Aggregates counts and effort over all live tasks.
    ///
    /// # Errors
    ///
    /// Returns repository errors when loading fails.
    pub async fn stats(&self) -> TaskServiceResult<TaskStats> {
        let tasks = self.gateway.list_all().await?;
        Ok(TaskStats::collect(&tasks, self.today()))
    }

    /// Recomputes a task's progress and every ancestor's.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] for unknown tasks and
    /// repository errors when persistence fails.
    pub async fn recompute_progress(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.aggregator.recompute(id).await
    }

    fn check_nesting(
        &self,
        parent: &Task,
        child_type: TaskType,
        existing_children: usize,
    ) -> Result<(), TaskServiceError> {
        self.config
            .nesting
            .check(parent.task_type(), child_type, existing_children)
            .map_err(|violation| {
                TaskDomainError::InvalidHierarchy {
                    parent_id: parent.id(),
                    violation,
                }
                .into()
            })
    }

    fn today(&self) -> NaiveDate {
        self.clock.utc().date_naive()
    }
}

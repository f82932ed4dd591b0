//! Shared test helpers for in-memory integration tests.

use chrono::{DateTime, Local, NaiveDate, TimeDelta, Utc};
use fractal_planner::{
    config::PlannerConfig,
    identity::{StaticUser, UserId},
    sprint::{adapters::memory::InMemorySprintRepository, services::SprintAssignmentCoordinator},
    task::{
        adapters::memory::InMemoryTaskRepository,
        domain::{Task, TaskId, TaskType},
        services::{CreateTaskRequest, TaskHierarchyService},
    },
};
use mockable::Clock;
use rstest::fixture;
use std::sync::{Arc, Mutex, PoisonError};

/// Clock that starts at a fixed instant and advances one second per read.
///
/// Every timestamp it hands out is distinct, so creation order is stable.
#[derive(Debug)]
pub struct TickingClock {
    now: Mutex<DateTime<Utc>>,
}

impl TickingClock {
    /// Starts the clock at 09:00 UTC on the given day.
    #[must_use]
    pub fn starting(day: NaiveDate) -> Self {
        let start = day.and_hms_opt(9, 0, 0).unwrap_or_default().and_utc();
        Self {
            now: Mutex::new(start),
        }
    }
}

impl Clock for TickingClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        let current = *now;
        *now += TimeDelta::seconds(1);
        current
    }
}

/// Coordinator type used by the integration tests.
pub type TestCoordinator = SprintAssignmentCoordinator<
    InMemorySprintRepository,
    InMemoryTaskRepository,
    TickingClock,
    StaticUser,
>;

/// Hierarchy service type used by the integration tests.
pub type TestHierarchy = TaskHierarchyService<InMemoryTaskRepository, TickingClock, StaticUser>;

/// Services wired over shared in-memory repositories.
pub struct Workspace {
    pub user: UserId,
    pub tasks: TestHierarchy,
    pub sprints: TestCoordinator,
}

impl Workspace {
    /// Creates a task under `parent`, or at the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the service rejects the task.
    pub async fn add(
        &self,
        title: &str,
        task_type: TaskType,
        parent: Option<TaskId>,
    ) -> Result<Task, eyre::Report> {
        let request = CreateTaskRequest::new(title, task_type);
        let request = match parent {
            Some(parent_id) => request.with_parent(parent_id),
            None => request,
        };
        self.tasks
            .create(request)
            .await
            .map_err(|err| eyre::eyre!("create {title}: {err}"))
    }

    /// Reloads a live task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be found.
    pub async fn reload(&self, id: TaskId) -> Result<Task, eyre::Report> {
        let details = self
            .tasks
            .find_one(id, false)
            .await
            .map_err(|err| eyre::eyre!("reload {id}: {err}"))?;
        Ok(details.task)
    }
}

/// Builds a calendar date, falling back to the epoch for invalid input.
#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Provides a workspace with default configuration.
#[fixture]
pub fn workspace() -> Workspace {
    workspace_with(&PlannerConfig::default())
}

/// Builds a workspace with the given configuration.
#[must_use]
pub fn workspace_with(config: &PlannerConfig) -> Workspace {
    let user = UserId::new();
    let identity = Arc::new(StaticUser::new(user));
    let clock = Arc::new(TickingClock::starting(date(2024, 4, 1)));
    let tasks = Arc::new(InMemoryTaskRepository::new());
    Workspace {
        user,
        tasks: TaskHierarchyService::new(
            Arc::clone(&tasks),
            Arc::clone(&clock),
            Arc::clone(&identity),
            config,
        ),
        sprints: SprintAssignmentCoordinator::new(
            Arc::new(InMemorySprintRepository::new()),
            tasks,
            clock,
            identity,
            config,
        ),
    }
}

//! Shared world state for Kanban board BDD scenarios.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local, NaiveDate, TimeDelta, Utc};

use fractal_planner::{
    config::PlannerConfig,
    error::ErrorKind,
    identity::AnonymousUser,
    sprint::{
        adapters::memory::InMemorySprintRepository, domain::SprintId,
        services::SprintAssignmentCoordinator,
    },
    task::{
        adapters::memory::InMemoryTaskRepository, domain::TaskId, services::TaskHierarchyService,
    },
};
use mockable::Clock;
use rstest::fixture;

/// First day of every scenario sprint.
pub const SPRINT_START: NaiveDate = match NaiveDate::from_ymd_opt(2024, 3, 4) {
    Some(day) => day,
    None => NaiveDate::MIN,
};

/// Clock advancing one second per read so cards keep creation order.
#[derive(Debug)]
pub struct SteppingClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(SPRINT_START.and_hms_opt(8, 0, 0).unwrap_or_default().and_utc()),
        }
    }
}

impl Clock for SteppingClock {
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

/// Coordinator type used by the BDD world.
pub type TestCoordinator = SprintAssignmentCoordinator<
    InMemorySprintRepository,
    InMemoryTaskRepository,
    SteppingClock,
    AnonymousUser,
>;

/// Scenario world for Kanban board behaviour tests.
pub struct KanbanWorld {
    pub coordinator: TestCoordinator,
    pub tasks: TaskHierarchyService<InMemoryTaskRepository, SteppingClock, AnonymousUser>,
    pub sprint_ids: HashMap<String, SprintId>,
    pub task_ids: HashMap<String, TaskId>,
    pub current_sprint: Option<SprintId>,
    pub last_error: Option<ErrorKind>,
}

impl KanbanWorld {
    /// Creates a world over empty repositories.
    #[must_use]
    pub fn new() -> Self {
        let config = PlannerConfig::default();
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let clock = Arc::new(SteppingClock::default());
        let identity = Arc::new(AnonymousUser);
        Self {
            coordinator: SprintAssignmentCoordinator::new(
                Arc::new(InMemorySprintRepository::new()),
                Arc::clone(&tasks),
                Arc::clone(&clock),
                Arc::clone(&identity),
                &config,
            ),
            tasks: TaskHierarchyService::new(tasks, clock, identity, &config),
            sprint_ids: HashMap::new(),
            task_ids: HashMap::new(),
            current_sprint: None,
            last_error: None,
        }
    }

    /// Looks up a task created earlier in the scenario.
    ///
    /// # Errors
    ///
    /// Returns an error if no task with `title` was created.
    pub fn task_id(&self, title: &str) -> Result<TaskId, eyre::Report> {
        self.task_ids
            .get(title)
            .copied()
            .ok_or_else(|| eyre::eyre!("no task named {title} in scenario world"))
    }

    /// Looks up a sprint created earlier in the scenario.
    ///
    /// # Errors
    ///
    /// Returns an error if no sprint with `name` was created.
    pub fn sprint_id(&self, name: &str) -> Result<SprintId, eyre::Report> {
        self.sprint_ids
            .get(name)
            .copied()
            .ok_or_else(|| eyre::eyre!("no sprint named {name} in scenario world"))
    }
}

impl Default for KanbanWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> KanbanWorld {
    KanbanWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

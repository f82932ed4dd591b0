//! Shared fixtures and repository doubles for task tests.

use crate::config::PlannerConfig;
use crate::identity::AnonymousUser;
use crate::sprint::domain::SprintId;
use crate::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{Placement, Task, TaskDraft, TaskId, TaskType},
    ports::{TaskChangeSet, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
    services::{CreateTaskRequest, TaskHierarchyService, TaskLifecycleService},
};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeDelta, Utc};
use mockable::Clock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Hierarchy and lifecycle services sharing one repository and clock.
pub struct Planner<R: TaskRepository> {
    pub repository: Arc<R>,
    pub clock: Arc<FixedClock>,
    pub tasks: TaskHierarchyService<R, FixedClock, AnonymousUser>,
    pub lifecycle: TaskLifecycleService<R, FixedClock, AnonymousUser>,
}

impl Planner<InMemoryTaskRepository> {
    pub fn in_memory() -> Self {
        Self::over(InMemoryTaskRepository::new(), &PlannerConfig::default())
    }
}

impl<R: TaskRepository> Planner<R> {
    pub fn over(repository: R, config: &PlannerConfig) -> Self {
        let repository = Arc::new(repository);
        let clock = Arc::new(FixedClock::at(2024, 1, 15));
        let identity = Arc::new(AnonymousUser);
        Self {
            tasks: TaskHierarchyService::new(
                Arc::clone(&repository),
                Arc::clone(&clock),
                Arc::clone(&identity),
                config,
            ),
            lifecycle: TaskLifecycleService::new(
                Arc::clone(&repository),
                Arc::clone(&clock),
                identity,
                config,
            ),
            repository,
            clock,
        }
    }

    pub async fn create(&self, title: &str, task_type: TaskType, parent: Option<TaskId>) -> Task {
        let request = CreateTaskRequest::new(title, task_type);
        let request = match parent {
            Some(parent_id) => request.with_parent(parent_id),
            None => request,
        };
        self.tasks.create(request).await.expect("task created")
    }

    pub async fn reload(&self, id: TaskId) -> Task {
        self.repository
            .find_by_id(id)
            .await
            .expect("repository available")
            .expect("task stored")
    }
}

/// Clock frozen at a chosen instant, advanced explicitly by tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(year: i32, month: u32, day: u32) -> Self {
        let now = date(year, month, day)
            .and_hms_opt(9, 0, 0)
            .expect("valid time")
            .and_utc();
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().expect("clock lock");
        *now += delta;
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn root_task(title: &str, task_type: TaskType, clock: &impl Clock) -> Task {
    Task::new(TaskDraft::new(title, task_type), Placement::ROOT, None, clock)
        .expect("valid draft")
}

/// Repository that answers calls only after a delay.
#[derive(Debug, Clone)]
pub struct SlowRepository {
    inner: InMemoryTaskRepository,
    read_delay: Duration,
    write_delay: Duration,
}

impl SlowRepository {
    /// Delays every call.
    pub fn new(inner: InMemoryTaskRepository, delay: Duration) -> Self {
        Self {
            inner,
            read_delay: delay,
            write_delay: delay,
        }
    }

    /// Delays writes only; reads answer at once.
    pub fn slow_writes(inner: InMemoryTaskRepository, delay: Duration) -> Self {
        Self {
            inner,
            read_delay: Duration::ZERO,
            write_delay: delay,
        }
    }
}

#[async_trait]
impl TaskRepository for SlowRepository {
    async fn commit(&self, changes: &TaskChangeSet) -> TaskRepositoryResult<()> {
        tokio::time::sleep(self.write_delay).await;
        self.inner.commit(changes).await
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<()> {
        tokio::time::sleep(self.write_delay).await;
        self.inner.update(task).await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.find_by_id(id).await
    }

    async fn find_children(&self, parent_id: TaskId) -> TaskRepositoryResult<Vec<Task>> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.find_children(parent_id).await
    }

    async fn list_all(&self) -> TaskRepositoryResult<Vec<Task>> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.list_all().await
    }

    async fn find_by_sprint(
        &self,
        sprint_id: Option<SprintId>,
    ) -> TaskRepositoryResult<Vec<Task>> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.find_by_sprint(sprint_id).await
    }
}

/// Repository whose `find_children` fails a set number of times.
#[derive(Debug, Default)]
pub struct FlakyRepository {
    inner: InMemoryTaskRepository,
    failures: AtomicUsize,
}

impl FlakyRepository {
    pub fn fail_next_child_loads(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskRepository for FlakyRepository {
    async fn commit(&self, changes: &TaskChangeSet) -> TaskRepositoryResult<()> {
        self.inner.commit(changes).await
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<()> {
        self.inner.update(task).await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.inner.find_by_id(id).await
    }

    async fn find_children(&self, parent_id: TaskId) -> TaskRepositoryResult<Vec<Task>> {
        let armed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if armed {
            return Err(TaskRepositoryError::persistence(std::io::Error::other(
                "connection reset",
            )));
        }
        self.inner.find_children(parent_id).await
    }

    async fn list_all(&self) -> TaskRepositoryResult<Vec<Task>> {
        self.inner.list_all().await
    }

    async fn find_by_sprint(
        &self,
        sprint_id: Option<SprintId>,
    ) -> TaskRepositoryResult<Vec<Task>> {
        self.inner.find_by_sprint(sprint_id).await
    }
}

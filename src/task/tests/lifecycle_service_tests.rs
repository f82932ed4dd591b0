//! Tests for committed status transitions and their side effects.

use super::support::{FlakyRepository, Planner, SlowRepository, date};
use crate::config::PlannerConfig;
use crate::error::ErrorKind;
use crate::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{
        ConversionBlocker, Hours, Recurrence, StatusChange, Task, TaskDomainError, TaskId,
        TaskStatus, TaskType,
    },
    ports::{TaskRepositoryError, TaskStatusListener},
    services::{CreateTaskRequest, TaskServiceError, UpdateTaskRequest},
};
use rstest::{fixture, rstest};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[fixture]
fn planner() -> Planner<InMemoryTaskRepository> {
    Planner::in_memory()
}

#[derive(Debug, Default)]
struct RecordingListener {
    seen: Mutex<Vec<(TaskId, StatusChange)>>,
}

impl RecordingListener {
    fn seen(&self) -> Vec<(TaskId, StatusChange)> {
        self.seen.lock().expect("listener lock").clone()
    }
}

impl TaskStatusListener for RecordingListener {
    fn task_status_changed(&self, task: &Task, change: StatusChange) {
        self.seen
            .lock()
            .expect("listener lock")
            .push((task.id(), change));
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn toggle_completes_leaf_and_sets_full_progress(planner: Planner<InMemoryTaskRepository>) {
    let task = planner.create("Ship it", TaskType::Task, None).await;

    let toggled = planner.lifecycle.toggle(task.id()).await.expect("toggle");
    assert_eq!(toggled.status(), TaskStatus::Completed);
    assert_eq!(toggled.progress(), 100);
    assert!(toggled.completed_at().is_some());

    let reopened = planner.lifecycle.toggle(task.id()).await.expect("toggle");
    assert_eq!(reopened.status(), TaskStatus::Active);
    assert!(reopened.completed_at().is_none());
    assert_eq!(planner.reload(task.id()).await, reopened);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn block_and_unblock_round_trip_the_status(planner: Planner<InMemoryTaskRepository>) {
    let task = planner.create("Integrate vendor", TaskType::Task, None).await;
    planner
        .lifecycle
        .move_to_status(task.id(), TaskStatus::Active)
        .await
        .expect("activate");

    let blocked = planner
        .lifecycle
        .block(task.id(), "waiting for API keys")
        .await
        .expect("block");
    assert_eq!(blocked.status(), TaskStatus::Blocked);
    assert_eq!(blocked.block_reason(), Some("waiting for API keys"));

    let err = planner
        .lifecycle
        .toggle(task.id())
        .await
        .expect_err("blocked tasks cannot toggle");
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let unblocked = planner.lifecycle.unblock(task.id()).await.expect("unblock");
    assert_eq!(unblocked.status(), TaskStatus::Active);
    assert!(unblocked.block_reason().is_none());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completing_a_recurring_task_reschedules_it(planner: Planner<InMemoryTaskRepository>) {
    let task = planner
        .tasks
        .create(
            CreateTaskRequest::new("Monthly close", TaskType::Task)
                .with_recurrence(Recurrence::Monthly)
                .with_due_date(date(2024, 1, 31)),
        )
        .await
        .expect("task created");
    planner
        .tasks
        .update(task.id(), UpdateTaskRequest::new().with_progress(50))
        .await
        .expect("progress update");

    let rescheduled = planner
        .lifecycle
        .complete(task.id())
        .await
        .expect("complete");

    assert_eq!(rescheduled.status(), TaskStatus::Recurring);
    assert_eq!(rescheduled.due_date(), Some(date(2024, 2, 29)));
    assert_eq!(rescheduled.last_occurrence(), Some(date(2024, 1, 31)));
    assert_eq!(rescheduled.progress(), 0);

    let again = planner
        .lifecycle
        .complete(task.id())
        .await
        .expect("recurring completes again");
    assert_eq!(again.due_date(), Some(date(2024, 3, 29)));
    assert_eq!(again.last_occurrence(), Some(date(2024, 2, 29)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completing_a_container_keeps_derived_progress(planner: Planner<InMemoryTaskRepository>) {
    let epic = planner.create("Epic", TaskType::Epic, None).await;
    planner
        .create("Open work", TaskType::Task, Some(epic.id()))
        .await;

    let completed = planner.lifecycle.complete(epic.id()).await.expect("complete");

    assert_eq!(completed.status(), TaskStatus::Completed);
    assert_eq!(completed.progress(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listeners_hear_only_real_changes(planner: Planner<InMemoryTaskRepository>) {
    let listener = Arc::new(RecordingListener::default());
    planner.lifecycle.subscribe(Arc::clone(&listener) as Arc<dyn TaskStatusListener>);
    let task = planner.create("Observe me", TaskType::Task, None).await;

    planner
        .lifecycle
        .move_to_status(task.id(), TaskStatus::Active)
        .await
        .expect("activate");
    planner
        .lifecycle
        .move_to_status(task.id(), TaskStatus::Active)
        .await
        .expect("no-op move");
    planner
        .lifecycle
        .archive(task.id())
        .await
        .expect("archive");

    assert_eq!(
        listener.seen(),
        vec![
            (
                task.id(),
                StatusChange {
                    from: TaskStatus::Draft,
                    to: TaskStatus::Active,
                }
            ),
            (
                task.id(),
                StatusChange {
                    from: TaskStatus::Active,
                    to: TaskStatus::Archived,
                }
            ),
        ]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_transitions_leave_storage_untouched(planner: Planner<InMemoryTaskRepository>) {
    let task = planner.create("Old idea", TaskType::Task, None).await;
    let archived = planner.lifecycle.archive(task.id()).await.expect("archive");

    let err = planner
        .lifecycle
        .complete(task.id())
        .await
        .expect_err("archived tasks cannot complete");

    assert!(matches!(
        err,
        TaskServiceError::Domain(TaskDomainError::InvalidTransition {
            from: TaskStatus::Archived,
            ..
        })
    ));
    assert_eq!(planner.reload(task.id()).await, archived);

    let restored = planner
        .lifecycle
        .unarchive(task.id())
        .await
        .expect("unarchive");
    assert_eq!(restored.status(), TaskStatus::Draft);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn only_root_tasks_convert_to_projects(planner: Planner<InMemoryTaskRepository>) {
    let root = planner.create("Side project", TaskType::Task, None).await;
    let converted = planner
        .lifecycle
        .convert_to_project(root.id())
        .await
        .expect("root converts");
    assert_eq!(converted.task_type(), TaskType::Project);
    assert_eq!(converted.status(), TaskStatus::Draft);

    let child = planner
        .create("Nested", TaskType::Task, Some(root.id()))
        .await;
    let err = planner
        .lifecycle
        .convert_to_project(child.id())
        .await
        .expect_err("children cannot convert");
    assert_eq!(err.kind(), ErrorKind::InvalidConversion);
    assert!(matches!(
        err,
        TaskServiceError::Domain(TaskDomainError::InvalidConversion {
            reason: ConversionBlocker::HasParent,
            ..
        })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn slow_repository_calls_time_out() {
    let storage = InMemoryTaskRepository::new();
    let seeded = Planner::over(storage.clone(), &PlannerConfig::default())
        .create("Slow", TaskType::Task, None)
        .await;

    let config = PlannerConfig::default().with_repository_timeout(Duration::from_millis(20));
    let slow = Planner::over(
        SlowRepository::new(storage, Duration::from_millis(200)),
        &config,
    );

    let err = slow
        .lifecycle
        .complete(seeded.id())
        .await
        .expect_err("deadline exceeded");

    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.is_retryable());
    assert!(matches!(
        err,
        TaskServiceError::Repository(TaskRepositoryError::Timeout(limit))
            if limit == Duration::from_millis(20)
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn commit_timeout_leaves_task_and_parent_untouched() {
    let storage = InMemoryTaskRepository::new();
    let setup = Planner::over(storage.clone(), &PlannerConfig::default());
    let project = setup.create("Household", TaskType::Project, None).await;
    let chore = setup
        .tasks
        .create(
            CreateTaskRequest::new("Water plants", TaskType::Task)
                .with_parent(project.id())
                .with_due_date(date(2024, 1, 20))
                .with_recurrence(Recurrence::Weekly),
        )
        .await
        .expect("recurring chore created");
    let chore_before = setup.reload(chore.id()).await;
    let project_before = setup.reload(project.id()).await;

    let config = PlannerConfig::default().with_repository_timeout(Duration::from_millis(20));
    let slow = Planner::over(
        SlowRepository::slow_writes(storage, Duration::from_millis(200)),
        &config,
    );
    let err = slow
        .lifecycle
        .complete(chore.id())
        .await
        .expect_err("commit misses the deadline");
    assert!(matches!(
        err,
        TaskServiceError::Repository(TaskRepositoryError::Timeout(_))
    ));

    let chore_after = setup.reload(chore.id()).await;
    assert_eq!(chore_after.status(), TaskStatus::Draft);
    assert_eq!(chore_after.progress(), 0);
    assert_eq!(chore_after.due_date(), Some(date(2024, 1, 20)));
    assert_eq!(chore_after.next_occurrence(), Some(date(2024, 1, 27)));
    assert_eq!(chore_after.last_occurrence(), None);
    assert_eq!(chore_after, chore_before);
    assert_eq!(setup.reload(project.id()).await, project_before);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_sibling_completions_both_reach_the_parent() {
    let storage = InMemoryTaskRepository::new();
    let planner = Planner::over(
        SlowRepository::new(storage, Duration::from_millis(20)),
        &PlannerConfig::default(),
    );
    let project = planner.create("Launch", TaskType::Project, None).await;
    let docs = planner.create("Docs", TaskType::Task, Some(project.id())).await;
    let site = planner.create("Site", TaskType::Task, Some(project.id())).await;

    let (left, right) = tokio::join!(
        planner.lifecycle.toggle(docs.id()),
        planner.lifecycle.toggle(site.id())
    );
    left.expect("docs completes");
    right.expect("site completes");

    assert_eq!(planner.reload(docs.id()).await.progress(), 100);
    assert_eq!(planner.reload(site.id()).await.progress(), 100);
    assert_eq!(planner.reload(project.id()).await.progress(), 100);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn conflict_outlasting_the_attempts_is_retryable() {
    let storage = InMemoryTaskRepository::new();
    let planner = Planner::over(
        SlowRepository::new(storage, Duration::from_millis(20)),
        &PlannerConfig::default().with_commit_attempts(1),
    );
    let project = planner.create("Launch", TaskType::Project, None).await;
    let docs = planner.create("Docs", TaskType::Task, Some(project.id())).await;
    let site = planner.create("Site", TaskType::Task, Some(project.id())).await;

    let (left, right) = tokio::join!(
        planner.lifecycle.toggle(docs.id()),
        planner.lifecycle.toggle(site.id())
    );

    let (loser, err) = match (left, right) {
        (Ok(_), Err(err)) => (site.id(), err),
        (Err(err), Ok(_)) => (docs.id(), err),
        outcome => panic!("exactly one toggle commits: {outcome:?}"),
    };
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.is_retryable());
    assert_eq!(planner.reload(loser).await.status(), TaskStatus::Draft);
    assert_eq!(planner.reload(project.id()).await.progress(), 50);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn logging_work_during_a_transition_keeps_both_changes() {
    let storage = InMemoryTaskRepository::new();
    let planner = Planner::over(
        SlowRepository::new(storage, Duration::from_millis(20)),
        &PlannerConfig::default(),
    );
    let project = planner.create("Audit", TaskType::Project, None).await;
    let review = planner
        .create("Review", TaskType::Task, Some(project.id()))
        .await;

    let (toggled, logged) = tokio::join!(
        planner.lifecycle.toggle(review.id()),
        planner.tasks.log_work(review.id(), Hours::whole(2))
    );
    toggled.expect("review completes");
    logged.expect("work logged");

    let stored = planner.reload(review.id()).await;
    assert_eq!(stored.status(), TaskStatus::Completed);
    assert_eq!(stored.progress(), 100);
    assert_eq!(stored.actual_hours(), Some(Hours::whole(2)));
    assert_eq!(planner.reload(project.id()).await.progress(), 100);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn roll_up_retries_a_single_transient_failure() {
    let planner = Planner::over(FlakyRepository::default(), &PlannerConfig::default());
    let epic = planner.create("Epic", TaskType::Epic, None).await;
    let leaf = planner.create("Leaf", TaskType::Task, Some(epic.id())).await;

    planner.repository.fail_next_child_loads(1);
    let recomputed = planner
        .tasks
        .recompute_progress(leaf.id())
        .await
        .expect("single failure is retried");
    assert_eq!(recomputed.id(), leaf.id());

    planner.repository.fail_next_child_loads(2);
    let err = planner
        .tasks
        .recompute_progress(leaf.id())
        .await
        .expect_err("second failure surfaces");
    assert_eq!(err.kind(), ErrorKind::Unavailable);
}

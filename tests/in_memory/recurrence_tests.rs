//! Recurring work rescheduled through the lifecycle service.

use super::helpers::{Workspace, date, workspace};
use fractal_planner::task::{
    domain::{Recurrence, TaskStatus, TaskType},
    services::{CreateTaskRequest, UpdateTaskRequest},
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn daily_task_advances_one_day_per_completion(
    workspace: Workspace,
) -> Result<(), eyre::Report> {
    let standup = workspace
        .tasks
        .create(
            CreateTaskRequest::new("Stand-up notes", TaskType::Task)
                .with_recurrence(Recurrence::Daily)
                .with_due_date(date(2024, 4, 1)),
        )
        .await
        .map_err(|err| eyre::eyre!("create: {err}"))?;
    eyre::ensure!(
        standup.next_occurrence() == Some(date(2024, 4, 2)),
        "next occurrence is scheduled on creation"
    );

    let lifecycle = workspace.sprints.lifecycle();
    for expected_due in [date(2024, 4, 2), date(2024, 4, 3), date(2024, 4, 4)] {
        let cycled = lifecycle
            .toggle(standup.id())
            .await
            .map_err(|err| eyre::eyre!("toggle: {err}"))?;
        eyre::ensure!(cycled.status() == TaskStatus::Recurring, "stays recurring");
        eyre::ensure!(
            cycled.due_date() == Some(expected_due),
            "expected due {expected_due}, found {:?}",
            cycled.due_date()
        );
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn yearly_task_due_on_leap_day_clamps(workspace: Workspace) -> Result<(), eyre::Report> {
    let renewal = workspace
        .tasks
        .create(
            CreateTaskRequest::new("Renew domain", TaskType::Task)
                .with_recurrence(Recurrence::Yearly)
                .with_due_date(date(2024, 2, 29)),
        )
        .await
        .map_err(|err| eyre::eyre!("create: {err}"))?;

    let renewed = workspace
        .sprints
        .lifecycle()
        .complete(renewal.id())
        .await
        .map_err(|err| eyre::eyre!("complete: {err}"))?;

    eyre::ensure!(renewed.due_date() == Some(date(2025, 2, 28)), "clamped to Feb 28");
    eyre::ensure!(
        renewed.last_occurrence() == Some(date(2024, 2, 29)),
        "previous occurrence recorded"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn clearing_the_rule_stops_rescheduling(workspace: Workspace) -> Result<(), eyre::Report> {
    let weekly = workspace
        .tasks
        .create(
            CreateTaskRequest::new("Weekly report", TaskType::Task)
                .with_recurrence(Recurrence::Weekly)
                .with_due_date(date(2024, 4, 5)),
        )
        .await
        .map_err(|err| eyre::eyre!("create: {err}"))?;

    let one_off = workspace
        .tasks
        .update(
            weekly.id(),
            UpdateTaskRequest::new().with_recurrence(Recurrence::None),
        )
        .await
        .map_err(|err| eyre::eyre!("update: {err}"))?;
    eyre::ensure!(one_off.next_occurrence().is_none(), "schedule cleared");

    let done = workspace
        .sprints
        .lifecycle()
        .complete(weekly.id())
        .await
        .map_err(|err| eyre::eyre!("complete: {err}"))?;
    eyre::ensure!(done.status() == TaskStatus::Completed, "plain completion");
    eyre::ensure!(done.progress() == 100, "leaf progress is full");
    eyre::ensure!(done.due_date() == Some(date(2024, 4, 5)), "due date kept");
    Ok(())
}

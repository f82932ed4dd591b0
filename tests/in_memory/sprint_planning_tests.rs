//! Sprint planning flows across the coordinator and hierarchy services.

use super::helpers::{Workspace, date, workspace};
use fractal_planner::{
    error::ErrorKind,
    sprint::{
        domain::{SprintFilter, SprintStatus},
        services::{CreateSprintRequest, SprintReassignment},
    },
    task::domain::{TaskStatus, TaskType},
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sprint_runs_from_planning_to_completion(
    workspace: Workspace,
) -> Result<(), eyre::Report> {
    let sprint = workspace
        .sprints
        .create(
            CreateSprintRequest::new("Sprint 14", date(2024, 4, 8), date(2024, 4, 19))
                .with_goal("Checkout redesign"),
        )
        .await
        .map_err(|err| eyre::eyre!("create sprint: {err}"))?;
    eyre::ensure!(sprint.created_by() == Some(workspace.user), "creator recorded");

    let cart = workspace.add("Cart page", TaskType::Task, None).await?;
    let payment = workspace.add("Payment form", TaskType::Task, None).await?;
    for task in [&cart, &payment] {
        workspace
            .sprints
            .assign_task(task.id(), Some(sprint.id()))
            .await
            .map_err(|err| eyre::eyre!("assign: {err}"))?;
    }

    workspace
        .sprints
        .start_sprint(sprint.id())
        .await
        .map_err(|err| eyre::eyre!("start: {err}"))?;
    workspace
        .sprints
        .move_status(cart.id(), TaskStatus::Completed)
        .await
        .map_err(|err| eyre::eyre!("move: {err}"))?;
    workspace
        .sprints
        .move_status(payment.id(), TaskStatus::Blocked)
        .await
        .map_err(|err| eyre::eyre!("move: {err}"))?;

    let summary = workspace
        .sprints
        .sprint_summary(sprint.id())
        .await
        .map_err(|err| eyre::eyre!("summary: {err}"))?;
    eyre::ensure!(summary.total == 2, "two tasks planned");
    eyre::ensure!(summary.completion == 50, "half done, found {}", summary.completion);
    eyre::ensure!(summary.count(TaskStatus::Blocked) == 1, "one blocked");

    let completed = workspace
        .sprints
        .complete_sprint(sprint.id())
        .await
        .map_err(|err| eyre::eyre!("complete: {err}"))?;
    eyre::ensure!(completed.status() == SprintStatus::Completed, "sprint closed");

    let board = workspace
        .sprints
        .board_for(sprint.id())
        .await
        .map_err(|err| eyre::eyre!("board: {err}"))?;
    eyre::ensure!(board.tasks().count() == 2, "tasks stay on a completed sprint");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completed_sprint_hands_leftovers_to_the_next(
    workspace: Workspace,
) -> Result<(), eyre::Report> {
    let old = workspace
        .sprints
        .create(CreateSprintRequest::new("Old", date(2024, 4, 1), date(2024, 4, 12)))
        .await
        .map_err(|err| eyre::eyre!("create: {err}"))?;
    let next = workspace
        .sprints
        .create(CreateSprintRequest::new("Next", date(2024, 4, 15), date(2024, 4, 26)))
        .await
        .map_err(|err| eyre::eyre!("create: {err}"))?;
    let leftover = workspace.add("Leftover", TaskType::Task, None).await?;
    workspace
        .sprints
        .assign_task(leftover.id(), Some(old.id()))
        .await
        .map_err(|err| eyre::eyre!("assign: {err}"))?;
    workspace
        .sprints
        .start_sprint(old.id())
        .await
        .map_err(|err| eyre::eyre!("start: {err}"))?;
    workspace
        .sprints
        .complete_sprint(old.id())
        .await
        .map_err(|err| eyre::eyre!("complete: {err}"))?;

    let err = workspace
        .sprints
        .remove(old.id(), None)
        .await
        .err()
        .ok_or_else(|| eyre::eyre!("removal without destination must fail"))?;
    eyre::ensure!(err.kind() == ErrorKind::Conflict, "got {err}");

    let removal = workspace
        .sprints
        .remove(old.id(), Some(SprintReassignment::Sprint(next.id())))
        .await
        .map_err(|err| eyre::eyre!("remove: {err}"))?;
    eyre::ensure!(removal.reassigned == vec![leftover.id()], "leftover moved");

    let moved = workspace.reload(leftover.id()).await?;
    eyre::ensure!(moved.sprint_id() == Some(next.id()), "task now in next sprint");

    let remaining = workspace
        .sprints
        .find_all(&SprintFilter::default())
        .await
        .map_err(|err| eyre::eyre!("list: {err}"))?;
    eyre::ensure!(
        remaining.iter().map(|sprint| sprint.id()).eq([next.id()]),
        "only the next sprint remains"
    );
    Ok(())
}

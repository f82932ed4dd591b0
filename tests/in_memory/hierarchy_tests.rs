//! Hierarchy behaviour across the public service API.

use super::helpers::{Workspace, workspace, workspace_with};
use fractal_planner::{
    config::PlannerConfig,
    error::ErrorKind,
    task::domain::{SortOrder, TaskFilter, TaskStatus, TaskType},
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completion_rolls_up_through_four_levels(workspace: Workspace) -> Result<(), eyre::Report> {
    let project = workspace.add("Mobile app", TaskType::Project, None).await?;
    let epic = workspace
        .add("Offline mode", TaskType::Epic, Some(project.id()))
        .await?;
    let task = workspace
        .add("Sync engine", TaskType::Task, Some(epic.id()))
        .await?;
    let first = workspace
        .add("Conflict resolution", TaskType::Task, Some(task.id()))
        .await?;
    workspace
        .add("Retry queue", TaskType::Task, Some(task.id()))
        .await?;
    eyre::ensure!(first.level() == 3, "subtask sits three levels down");

    workspace
        .sprints
        .lifecycle()
        .complete(first.id())
        .await
        .map_err(|err| eyre::eyre!("complete subtask: {err}"))?;

    for id in [task.id(), epic.id(), project.id()] {
        let reloaded = workspace.reload(id).await?;
        eyre::ensure!(
            reloaded.progress() == 50,
            "{} should be half done, found {}",
            reloaded.title(),
            reloaded.progress()
        );
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn audit_fields_record_the_acting_user(workspace: Workspace) -> Result<(), eyre::Report> {
    let task = workspace.add("Audit me", TaskType::Task, None).await?;
    eyre::ensure!(task.created_by() == Some(workspace.user), "creator recorded");

    let blocked = workspace
        .sprints
        .lifecycle()
        .block(task.id(), "legal review")
        .await
        .map_err(|err| eyre::eyre!("block: {err}"))?;
    eyre::ensure!(blocked.updated_by() == Some(workspace.user), "editor recorded");
    eyre::ensure!(blocked.updated_at() > task.updated_at(), "timestamp advanced");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tree_walk_reports_depths_in_pre_order(workspace: Workspace) -> Result<(), eyre::Report> {
    let project = workspace.add("Root", TaskType::Project, None).await?;
    let epic = workspace
        .add("Epic", TaskType::Epic, Some(project.id()))
        .await?;
    workspace
        .add("Epic task", TaskType::Task, Some(epic.id()))
        .await?;
    workspace
        .add("Launch", TaskType::Milestone, Some(project.id()))
        .await?;

    let tree = workspace
        .tasks
        .find_tree(project.id())
        .await
        .map_err(|err| eyre::eyre!("load tree: {err}"))?;
    let walk: Vec<(&str, u32)> = tree
        .iter()
        .map(|node| (node.task.title(), node.depth))
        .collect();

    eyre::ensure!(
        walk == vec![("Root", 0), ("Epic", 1), ("Epic task", 2), ("Launch", 1)],
        "unexpected walk {walk:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listings_paginate_with_configured_defaults(
    workspace: Workspace,
) -> Result<(), eyre::Report> {
    for n in 1..=25 {
        workspace
            .add(&format!("Ticket {n:02}"), TaskType::Task, None)
            .await?;
    }

    let filter = TaskFilter {
        page: Some(2),
        sort_order: SortOrder::Asc,
        ..TaskFilter::default()
    };
    let page = workspace
        .tasks
        .find_all(&filter)
        .await
        .map_err(|err| eyre::eyre!("list: {err}"))?;

    eyre::ensure!(page.total == 25, "total is {}", page.total);
    eyre::ensure!(page.limit == 20, "limit is {}", page.limit);
    eyre::ensure!(page.total_pages() == 2, "two pages expected");
    let first = page.items.first().map(|task| task.title().to_owned());
    eyre::ensure!(
        first.as_deref() == Some("Ticket 21"),
        "second page starts at {first:?}"
    );
    eyre::ensure!(page.items.len() == 5, "five items on the last page");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn moving_an_epic_between_projects_updates_both(
    workspace: Workspace,
) -> Result<(), eyre::Report> {
    let alpha = workspace.add("Alpha", TaskType::Project, None).await?;
    let beta = workspace.add("Beta", TaskType::Project, None).await?;
    let epic = workspace
        .add("Shared epic", TaskType::Epic, Some(alpha.id()))
        .await?;
    let done = workspace
        .add("Done", TaskType::Task, Some(epic.id()))
        .await?;
    workspace
        .sprints
        .lifecycle()
        .toggle(done.id())
        .await
        .map_err(|err| eyre::eyre!("toggle: {err}"))?;

    workspace
        .tasks
        .reparent(epic.id(), Some(beta.id()))
        .await
        .map_err(|err| eyre::eyre!("reparent: {err}"))?;

    let alpha_now = workspace.reload(alpha.id()).await?;
    let beta_now = workspace.reload(beta.id()).await?;
    eyre::ensure!(alpha_now.progress() == 0, "alpha lost its only child");
    eyre::ensure!(beta_now.progress() == 100, "beta inherits the finished epic");

    let err = workspace
        .tasks
        .reparent(beta.id(), Some(done.id()))
        .await
        .err()
        .ok_or_else(|| eyre::eyre!("moving a project under its own leaf must fail"))?;
    eyre::ensure!(err.kind() == ErrorKind::CyclicParent, "got {err}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn archival_config_keeps_removed_leaves() -> Result<(), eyre::Report> {
    let workspace = workspace_with(&PlannerConfig::archival());
    let leaf = workspace.add("Keep history", TaskType::Task, None).await?;

    let outcome = workspace
        .tasks
        .remove(leaf.id())
        .await
        .map_err(|err| eyre::eyre!("remove: {err}"))?;
    eyre::ensure!(outcome.soft_deleted, "archival config soft-deletes leaves");

    let stats = workspace
        .tasks
        .stats()
        .await
        .map_err(|err| eyre::eyre!("stats: {err}"))?;
    eyre::ensure!(stats.total == 0, "deleted tasks are not counted");
    eyre::ensure!(
        stats.count_with_status(TaskStatus::Draft) == 0,
        "no live drafts remain"
    );
    Ok(())
}

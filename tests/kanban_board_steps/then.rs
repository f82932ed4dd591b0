//! Then steps for Kanban board BDD scenarios.

use super::world::{KanbanWorld, run_async};
use eyre::WrapErr;
use fractal_planner::task::domain::{Task, TaskStatus};
use rstest_bdd_macros::then;

fn column_titles(world: &KanbanWorld, column_name: &str) -> Result<Vec<String>, eyre::Report> {
    let sprint_id = world
        .current_sprint
        .ok_or_else(|| eyre::eyre!("missing current sprint in scenario world"))?;
    let status = TaskStatus::try_from(column_name)
        .map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))?;
    let board = run_async(world.coordinator.board_for(sprint_id)).wrap_err("load board")?;
    let column = board
        .column(status)
        .ok_or_else(|| eyre::eyre!("board has no {status} column"))?;
    Ok(column
        .tasks
        .iter()
        .map(Task::title)
        .map(str::to_owned)
        .collect())
}

#[then(r#"the "{status}" column lists "{titles}""#)]
fn column_lists(world: &KanbanWorld, status: String, titles: String) -> Result<(), eyre::Report> {
    let expected: Vec<String> = titles.split(',').map(|title| title.trim().to_owned()).collect();
    let actual = column_titles(world, &status)?;
    eyre::ensure!(
        actual == expected,
        "expected {status} column {expected:?}, found {actual:?}"
    );
    Ok(())
}

#[then(r#"the "{status}" column is empty"#)]
fn column_is_empty(world: &KanbanWorld, status: String) -> Result<(), eyre::Report> {
    let actual = column_titles(world, &status)?;
    eyre::ensure!(actual.is_empty(), "expected empty {status} column, found {actual:?}");
    Ok(())
}

#[then(r#"the last operation fails with "{kind}""#)]
fn last_operation_fails(world: &KanbanWorld, kind: String) -> Result<(), eyre::Report> {
    let actual = world
        .last_error
        .ok_or_else(|| eyre::eyre!("expected {kind} error, operation succeeded"))?;
    eyre::ensure!(
        actual.as_str() == kind,
        "expected {kind} error, found {actual}"
    );
    Ok(())
}

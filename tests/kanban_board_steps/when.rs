//! When steps for Kanban board BDD scenarios.

use super::world::{KanbanWorld, run_async};
use eyre::WrapErr;
use fractal_planner::task::domain::TaskStatus;
use rstest_bdd_macros::when;

#[when(r#"the task "{title}" is moved to "{status}""#)]
fn move_task(world: &mut KanbanWorld, title: String, status: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id(&title)?;
    let target = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))?;
    run_async(world.coordinator.move_status(task_id, target)).wrap_err("move task")?;
    Ok(())
}

#[when(r#"the task "{title}" is reordered to position {position:usize}"#)]
fn reorder_task(
    world: &mut KanbanWorld,
    title: String,
    position: usize,
) -> Result<(), eyre::Report> {
    let task_id = world.task_id(&title)?;
    run_async(world.coordinator.reorder(task_id, position)).wrap_err("reorder task")?;
    Ok(())
}

#[when(r#"the task "{title}" is toggled"#)]
fn toggle_task(world: &mut KanbanWorld, title: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id(&title)?;
    let result = run_async(world.coordinator.lifecycle().toggle(task_id));
    world.last_error = result.err().map(|err| err.kind());
    Ok(())
}

#[when(r#"the sprint "{name}" is started"#)]
fn start_sprint(world: &mut KanbanWorld, name: String) -> Result<(), eyre::Report> {
    let sprint_id = world.sprint_id(&name)?;
    let result = run_async(world.coordinator.start_sprint(sprint_id));
    world.last_error = result.err().map(|err| err.kind());
    Ok(())
}

//! Given steps for Kanban board BDD scenarios.

use super::world::{KanbanWorld, SPRINT_START, run_async};
use chrono::Days;
use eyre::WrapErr;
use fractal_planner::{
    sprint::services::CreateSprintRequest,
    task::{domain::TaskType, services::CreateTaskRequest},
};
use rstest_bdd_macros::given;

fn create_sprint(world: &mut KanbanWorld, name: String) -> Result<(), eyre::Report> {
    let end = SPRINT_START
        .checked_add_days(Days::new(14))
        .ok_or_else(|| eyre::eyre!("sprint end date out of range"))?;
    let sprint = run_async(
        world
            .coordinator
            .create(CreateSprintRequest::new(name.clone(), SPRINT_START, end)),
    )
    .wrap_err("create sprint for board scenario")?;
    world.sprint_ids.insert(name, sprint.id());
    Ok(())
}

#[given(r#"an active sprint "{name}""#)]
fn active_sprint(world: &mut KanbanWorld, name: String) -> Result<(), eyre::Report> {
    create_sprint(world, name.clone())?;
    let sprint_id = world.sprint_id(&name)?;
    run_async(world.coordinator.start_sprint(sprint_id)).wrap_err("start sprint")?;
    world.current_sprint = Some(sprint_id);
    Ok(())
}

#[given(r#"a planned sprint "{name}""#)]
fn planned_sprint(world: &mut KanbanWorld, name: String) -> Result<(), eyre::Report> {
    create_sprint(world, name)
}

#[given(r#"a task "{title}" on the sprint"#)]
fn task_on_sprint(world: &mut KanbanWorld, title: String) -> Result<(), eyre::Report> {
    let sprint_id = world
        .current_sprint
        .ok_or_else(|| eyre::eyre!("missing current sprint in scenario world"))?;
    let task = run_async(
        world
            .tasks
            .create(CreateTaskRequest::new(title.clone(), TaskType::Task)),
    )
    .wrap_err("create task for board scenario")?;
    run_async(world.coordinator.assign_task(task.id(), Some(sprint_id)))
        .wrap_err("assign task to sprint")?;
    world.task_ids.insert(title, task.id());
    Ok(())
}

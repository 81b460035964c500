//! When steps for subtask rollup BDD scenarios.

use super::world::{RollupWorld, run_async};
use citool::task::{
    domain::{SubTaskId, TaskStatus},
    services::StatusReport,
};
use rstest_bdd_macros::when;

fn parse_status(status: &str) -> Result<TaskStatus, eyre::Report> {
    TaskStatus::try_from(status).map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))
}

fn report(world: &mut RollupWorld, subtask_id: SubTaskId, status: TaskStatus) {
    let result = run_async(
        world
            .service
            .report_subtask_status(subtask_id, StatusReport::new(status)),
    );
    world.last_report = Some(result);
}

#[when(r#"subtask "{variant}" reports "{status}""#)]
fn subtask_reports(
    world: &mut RollupWorld,
    variant: String,
    status: String,
) -> Result<(), eyre::Report> {
    let subtask_id = world
        .details()?
        .subtasks
        .iter()
        .find(|subtask| subtask.variant().as_str() == variant)
        .map(|subtask| subtask.id())
        .ok_or_else(|| eyre::eyre!("no subtask for variant {variant}"))?;
    report(world, subtask_id, parse_status(&status)?);
    match world.last_report.as_ref() {
        Some(Err(err)) => Err(eyre::eyre!("status report failed: {err}")),
        _ => Ok(()),
    }
}

#[when(r#"an unknown subtask reports "{status}""#)]
fn unknown_subtask_reports(world: &mut RollupWorld, status: String) -> Result<(), eyre::Report> {
    report(world, SubTaskId::new(), parse_status(&status)?);
    Ok(())
}

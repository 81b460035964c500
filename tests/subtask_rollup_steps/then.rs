//! Then steps for subtask rollup BDD scenarios.

use super::world::{RollupWorld, run_async};
use citool::task::{
    domain::TaskStatus,
    ports::NextStep,
    services::{MissingRecord, TaskLifecycleError},
};
use rstest_bdd_macros::then;

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &RollupWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task_id = world.details()?.task.id();
    let stored = run_async(world.service.get_task(task_id))
        .map_err(|err| eyre::eyre!("load task: {err}"))?;

    eyre::ensure!(
        stored.task.status() == expected,
        "expected status {}, found {}",
        expected.as_str(),
        stored.task.status().as_str()
    );
    Ok(())
}

#[then("the workspace removal count is {count:usize}")]
fn workspace_removed(world: &RollupWorld, count: usize) -> Result<(), eyre::Report> {
    let task_id = world.details()?.task.id();
    let removals = world
        .workspace
        .removed()
        .into_iter()
        .filter(|removed| *removed == task_id)
        .count();

    eyre::ensure!(removals == count, "expected {count} workspace removals, found {removals}");
    Ok(())
}

#[then("the scan nudge count is {count:usize}")]
fn scan_step_nudged(world: &RollupWorld, count: usize) -> Result<(), eyre::Report> {
    let nudges = world
        .worker
        .notifications()
        .into_iter()
        .filter(|step| *step == NextStep::CheckAndScan)
        .count();

    eyre::ensure!(nudges == count, "expected {count} scan nudges, found {nudges}");
    Ok(())
}

#[then("the report fails with a not found error")]
fn report_fails_not_found(world: &RollupWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_report
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing status report result"))?;

    eyre::ensure!(
        matches!(result, Err(TaskLifecycleError::NotFound(MissingRecord::SubTask(_)))),
        "expected subtask not found, got {result:?}"
    );
    Ok(())
}

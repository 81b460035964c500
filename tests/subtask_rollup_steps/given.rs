//! Given steps for subtask rollup BDD scenarios.

use super::world::{RollupWorld, run_async};
use citool::task::services::CreateTaskRequest;
use eyre::WrapErr;
use rstest_bdd_macros::given;

fn create(world: &mut RollupWorld, request: CreateTaskRequest) -> Result<(), eyre::Report> {
    let details = run_async(world.service.create_task(world.requester, request))
        .wrap_err("create task for rollup scenario")?;
    world.details = Some(details);
    Ok(())
}

#[given(r#"an autotest task for browsers "{browsers}""#)]
fn autotest_task(world: &mut RollupWorld, browsers: String) -> Result<(), eyre::Report> {
    let request =
        CreateTaskRequest::autotest("https://gitlab.com/acme/web.git", "main", browsers)
            .with_credentials("ci-bot", "s3cret");
    create(world, request)
}

#[given(r#"a scanning task for languages "{languages}""#)]
fn scanning_task(world: &mut RollupWorld, languages: String) -> Result<(), eyre::Report> {
    let request =
        CreateTaskRequest::scanning("https://gitlab.com/acme/api.git", "main", languages)
            .with_credentials("ci-bot", "s3cret");
    create(world, request)
}

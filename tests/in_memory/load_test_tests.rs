//! Load-test runs launching real processes into a temporary media root.

use std::sync::Arc;

use super::helpers::member;
use citool::config::CitoolConfig;
use citool::load_test::{
    adapters::{
        filesystem::FsReportStore, memory::InMemoryLoadTestRepository,
        process::TokioCommandRunner,
    },
    domain::LoadTestStatus,
    ports::LoadTestRepository,
    services::{
        CreateLoadTestRequest, LoadTestExecutor, LoadTestService, LoadTestSettings,
        spawn_load_test_worker,
    },
};
use citool::task::services::Requester;
use mockable::DefaultClock;
use rstest::rstest;
use tempfile::TempDir;

fn settings(media: &TempDir, jmeter_bin: &str) -> Result<LoadTestSettings, eyre::Report> {
    let root = media
        .path()
        .to_str()
        .ok_or_else(|| eyre::eyre!("temporary path is not UTF-8"))?;
    let config = CitoolConfig::from_toml_str(&format!(
        "[load_test]\nmedia_root = \"{root}/\"\njmeter_bin = \"{jmeter_bin}\"\nfrontend_server = \"https://citool.test\""
    ))?;
    Ok(LoadTestSettings::from_config(&config))
}

#[rstest]
#[case::tool_succeeds("true", LoadTestStatus::Completed, "index.html")]
#[case::tool_fails("false", LoadTestStatus::Error, "stdout.txt")]
#[case::tool_missing("citool-no-such-jmeter", LoadTestStatus::Error, "error.txt")]
#[cfg_attr(not(unix), ignore = "relies on POSIX true and false")]
#[tokio::test(flavor = "multi_thread")]
async fn run_outcome_is_recorded_with_its_link(
    member: Requester,
    #[case] jmeter_bin: &str,
    #[case] expected_status: LoadTestStatus,
    #[case] linked_file: &str,
) -> Result<(), eyre::Report> {
    let media = tempfile::tempdir()?;
    let settings = settings(&media, jmeter_bin)?;
    let repository = Arc::new(InMemoryLoadTestRepository::new());
    let clock = Arc::new(DefaultClock);
    let reports = Arc::new(FsReportStore::new(settings.launch.media_root.clone()));
    let executor = LoadTestExecutor::new(
        Arc::clone(&repository),
        Arc::clone(&clock),
        Arc::new(TokioCommandRunner::new()),
        reports.clone(),
        settings,
    );
    let (queue, worker) = spawn_load_test_worker(executor);
    let service = LoadTestService::new(Arc::clone(&repository), clock, reports, queue);

    let run = service
        .submit(
            member,
            CreateLoadTestRequest::new("CONFIG")
                .with_domain("shop.example")
                .with_endpoint(8080, "http")
                .with_load(1, 2, 1),
        )
        .await?;
    drop(service);
    worker.await?;

    let finished = repository
        .find(run.id())
        .await?
        .ok_or_else(|| eyre::eyre!("run should still exist"))?;
    eyre::ensure!(
        finished.status() == expected_status,
        "expected {expected_status:?}, found {:?}",
        finished.status()
    );
    let expected_link = format!("https://citool.test/media/{}/{linked_file}", run.id());
    eyre::ensure!(
        finished.report() == Some(expected_link.as_str()),
        "unexpected report link {:?}",
        finished.report()
    );
    eyre::ensure!(
        media.path().join(run.id().to_string()).is_dir(),
        "output directory should exist"
    );
    if expected_status == LoadTestStatus::Error {
        eyre::ensure!(
            media.path().join(run.id().to_string()).join(linked_file).is_file(),
            "failure output should be written"
        );
    }
    Ok(())
}

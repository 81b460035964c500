//! Submission, execution and deletion of load tests against in-memory
//! adapters.

use std::sync::Arc;

use crate::load_test::{
    adapters::memory::{
        InMemoryLoadTestRepository, InMemoryReportStore, ScriptedCommandRunner, ScriptedOutcome,
    },
    domain::{LoadTest, LoadTestDomainError, LoadTestId, LoadTestMode, LoadTestStatus},
    ports::LoadTestRepository,
    services::{
        CreateLoadTestRequest, LoadTestExecutor, LoadTestService, LoadTestServiceError,
        LoadTestSettings, spawn_load_test_worker,
    },
};
use crate::task::{domain::OwnerId, services::Requester};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use tokio::task::JoinHandle;
use uuid::Uuid;

type TestService = LoadTestService<InMemoryLoadTestRepository, DefaultClock>;

struct Harness {
    service: TestService,
    worker: JoinHandle<()>,
    repository: Arc<InMemoryLoadTestRepository>,
    runner: Arc<ScriptedCommandRunner>,
    reports: Arc<InMemoryReportStore>,
}

impl Harness {
    /// Waits until the worker has finished `id`.
    async fn settle(&self, id: LoadTestId) {
        for _ in 0..10_000 {
            let run = self
                .repository
                .find(id)
                .await
                .expect("lookup should succeed")
                .expect("run should exist");
            if run.status() != LoadTestStatus::Running {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("load test {id} did not finish");
    }

    /// Stops accepting runs and waits for the backlog to finish.
    async fn drain(self) -> Drained {
        drop(self.service);
        self.worker.await.expect("worker should not panic");
        Drained {
            repository: self.repository,
            runner: self.runner,
            reports: self.reports,
        }
    }
}

struct Drained {
    repository: Arc<InMemoryLoadTestRepository>,
    runner: Arc<ScriptedCommandRunner>,
    reports: Arc<InMemoryReportStore>,
}

impl Drained {
    async fn stored(&self, id: LoadTestId) -> LoadTest {
        self.repository
            .find(id)
            .await
            .expect("lookup should succeed")
            .expect("run should exist")
    }
}

#[fixture]
fn harness() -> Harness {
    let repository = Arc::new(InMemoryLoadTestRepository::new());
    let runner = Arc::new(ScriptedCommandRunner::new());
    let reports = Arc::new(InMemoryReportStore::new());
    let clock = Arc::new(DefaultClock);
    let executor = LoadTestExecutor::new(
        Arc::clone(&repository),
        Arc::clone(&clock),
        runner.clone(),
        reports.clone(),
        LoadTestSettings::default(),
    );
    let (queue, worker) = spawn_load_test_worker(executor);
    let service = LoadTestService::new(Arc::clone(&repository), clock, reports.clone(), queue);
    Harness {
        service,
        worker,
        repository,
        runner,
        reports,
    }
}

fn tester() -> Requester {
    Requester::user(OwnerId::from_uuid(Uuid::from_u128(5)))
}

fn config_request() -> CreateLoadTestRequest {
    CreateLoadTestRequest::new("CONFIG")
        .with_domain("shop.example")
        .with_endpoint(443, "https")
        .with_load(10, 25, 2)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn successful_run_links_the_html_report(harness: Harness) {
    let run = harness
        .service
        .submit(tester(), config_request())
        .await
        .expect("submission should succeed");
    assert_eq!(run.status(), LoadTestStatus::Running);
    assert_eq!(run.plan().mode(), LoadTestMode::Config);

    let drained = harness.drain().await;
    let finished = drained.stored(run.id()).await;

    assert_eq!(finished.status(), LoadTestStatus::Completed);
    assert_eq!(
        finished.report(),
        Some(format!("http://localhost:8000/media/{}/index.html", run.id()).as_str())
    );
    assert!(drained.reports.has_dir(&run.id().to_string()));
    assert_eq!(drained.runner.commands().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn security_run_links_the_exported_report(harness: Harness) {
    let run = harness
        .service
        .submit(tester(), CreateLoadTestRequest::new("SECURITY").with_domain("example.com"))
        .await
        .expect("submission should succeed");

    let drained = harness.drain().await;
    let finished = drained.stored(run.id()).await;

    assert_eq!(finished.status(), LoadTestStatus::Completed);
    let report = finished.report().expect("report link");
    assert!(report.starts_with(&format!("http://localhost:8000/media/{}/", run.id())));
    assert!(report.ends_with(".xhtml"));
    let programs = drained
        .runner
        .commands()
        .into_iter()
        .map(|command| command.program)
        .collect::<Vec<_>>();
    assert_eq!(programs, vec!["zap.sh", "zap.sh"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tool_failure_captures_output(harness: Harness) {
    harness.runner.push_outcome(ScriptedOutcome::Fail {
        stdout: "summary\n".to_owned(),
        stderr: "connection refused\n".to_owned(),
    });
    let run = harness
        .service
        .submit(tester(), config_request())
        .await
        .expect("submission should succeed");

    let drained = harness.drain().await;
    let finished = drained.stored(run.id()).await;

    assert_eq!(finished.status(), LoadTestStatus::Error);
    assert_eq!(
        finished.report(),
        Some(format!("http://localhost:8000/media/{}/stdout.txt", run.id()).as_str())
    );
    assert_eq!(
        drained.reports.file(&format!("{}/stdout.txt", run.id())).as_deref(),
        Some("connection refused\nsummary\n")
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_security_scan_skips_the_export(harness: Harness) {
    harness.runner.push_outcome(ScriptedOutcome::Fail {
        stdout: String::new(),
        stderr: "zap crashed".to_owned(),
    });
    let run = harness
        .service
        .submit(tester(), CreateLoadTestRequest::new("SECURITY").with_domain("example.com"))
        .await
        .expect("submission should succeed");

    let drained = harness.drain().await;

    assert_eq!(drained.stored(run.id()).await.status(), LoadTestStatus::Error);
    assert_eq!(drained.runner.commands().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn launch_failure_writes_error_file(harness: Harness) {
    harness
        .runner
        .push_outcome(ScriptedOutcome::LaunchError("jmeter: not found".to_owned()));
    let run = harness
        .service
        .submit(tester(), config_request())
        .await
        .expect("submission should succeed");

    let drained = harness.drain().await;
    let finished = drained.stored(run.id()).await;

    assert_eq!(finished.status(), LoadTestStatus::Error);
    assert_eq!(
        finished.report(),
        Some(format!("http://localhost:8000/media/{}/error.txt", run.id()).as_str())
    );
    let written = drained
        .reports
        .file(&format!("{}/error.txt", run.id()))
        .expect("error file should be written");
    assert!(written.contains("jmeter: not found"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn runs_execute_one_at_a_time_in_order(harness: Harness) {
    let mut submitted = Vec::new();
    for _ in 0..3 {
        let run = harness
            .service
            .submit(tester(), config_request())
            .await
            .expect("submission should succeed");
        submitted.push(run.id());
    }

    let drained = harness.drain().await;

    assert_eq!(drained.runner.max_in_flight(), 1);
    let output_dirs = drained
        .runner
        .commands()
        .into_iter()
        .filter_map(|command| command.args.last().cloned())
        .collect::<Vec<_>>();
    let expected = submitted
        .iter()
        .map(|id| format!("/code/media/{id}/"))
        .collect::<Vec<_>>();
    assert_eq!(output_dirs, expected);
    for id in submitted {
        assert_eq!(drained.stored(id).await.status(), LoadTestStatus::Completed);
    }
}

#[rstest]
#[case::unknown_mode(CreateLoadTestRequest::new("SOAK"))]
#[case::config_without_port(
    CreateLoadTestRequest::new("CONFIG").with_domain("shop.example").with_load(1, 1, 1)
)]
#[case::script_without_file(CreateLoadTestRequest::new("SCRIPT"))]
#[case::security_with_blank_domain(CreateLoadTestRequest::new("SECURITY").with_domain("  "))]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_submissions_store_nothing(
    harness: Harness,
    #[case] request: CreateLoadTestRequest,
) {
    let result = harness.service.submit(tester(), request).await;

    assert!(matches!(result, Err(LoadTestServiceError::Validation(_))));
    let drained = harness.drain().await;
    assert!(drained.repository.list(None).await.expect("list").is_empty());
    assert!(drained.runner.commands().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_config_field_is_named(harness: Harness) {
    let request = CreateLoadTestRequest::new("CONFIG")
        .with_domain("shop.example")
        .with_endpoint(80, "http");

    let result = harness.service.submit(tester(), request).await;

    assert!(matches!(
        result,
        Err(LoadTestServiceError::Validation(LoadTestDomainError::MissingField {
            mode: LoadTestMode::Config,
            field: "ramp_time",
        }))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_removes_upload_and_output(harness: Harness) {
    harness.reports.seed("20240309_120000/plan.jmx", b"<jmeterTestPlan/>");
    let run = harness
        .service
        .submit(
            tester(),
            CreateLoadTestRequest::new("SCRIPT").with_file("20240309_120000/plan.jmx"),
        )
        .await
        .expect("submission should succeed");
    harness.settle(run.id()).await;

    let deleted = harness
        .service
        .delete(run.id())
        .await
        .expect("delete should succeed");

    assert_eq!(deleted.id(), run.id());
    assert!(harness.reports.file("20240309_120000/plan.jmx").is_none());
    assert!(!harness.reports.has_dir("20240309_120000"));
    assert!(!harness.reports.has_dir(&run.id().to_string()));
    assert!(matches!(
        harness.service.get(run.id()).await,
        Err(LoadTestServiceError::NotFound(id)) if id == run.id()
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn submissions_after_worker_stops_are_rejected(mut harness: Harness) {
    harness.worker.abort();
    let stopped = (&mut harness.worker).await;
    assert!(stopped.is_err_and(|err| err.is_cancelled()));

    let result = harness.service.submit(tester(), config_request()).await;

    assert!(matches!(result, Err(LoadTestServiceError::Dispatch(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listing_is_scoped_to_the_owner(harness: Harness) {
    harness
        .service
        .submit(tester(), config_request())
        .await
        .expect("submission should succeed");
    let other = Requester::user(OwnerId::from_uuid(Uuid::from_u128(6)));

    assert_eq!(harness.service.list(tester()).await.expect("list").len(), 1);
    assert!(harness.service.list(other).await.expect("list").is_empty());
}

//! Runs one load test to completion and records the outcome.

use crate::config::CitoolConfig;
use crate::load_test::{
    domain::{LaunchPlan, LaunchSettings, LoadTest, LoadTestId, LoadTestStatus},
    ports::{CommandOutput, CommandRunner, LoadTestRepository, ReportStore},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{error, info, warn};

const STDOUT_FILE: &str = "stdout.txt";
const ERROR_FILE: &str = "error.txt";

/// Tool locations and the public origin of the media directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTestSettings {
    /// Tool and media locations.
    pub launch: LaunchSettings,
    /// URL path under which the media root is served.
    pub media_url: String,
    /// Public origin prepended to report links.
    pub frontend_server: String,
}

impl LoadTestSettings {
    /// Reads settings from the `[load_test]` section.
    #[must_use]
    pub fn from_config(config: &CitoolConfig) -> Self {
        let section = &config.load_test;
        Self {
            launch: LaunchSettings {
                media_root: section.media_root.clone(),
                jmeter_bin: section.jmeter_bin.clone(),
                jmx_file: section.jmx_file.clone(),
                zap_bin: section.zap_bin.clone(),
                zap_home: section.zap_home.clone(),
                result_file: section.result_file.clone(),
            },
            media_url: section.media_url.clone(),
            frontend_server: section.frontend_server.clone(),
        }
    }

    /// Returns the public link to `file` in a run's output directory.
    #[must_use]
    pub fn report_link(&self, id: LoadTestId, file: &str) -> String {
        format!("{}{}{id}/{file}", self.frontend_server, self.media_url)
    }
}

impl Default for LoadTestSettings {
    fn default() -> Self {
        Self::from_config(&CitoolConfig::default())
    }
}

/// Executes queued runs.
#[derive(Clone)]
pub struct LoadTestExecutor<R, C>
where
    R: LoadTestRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    runner: Arc<dyn CommandRunner>,
    reports: Arc<dyn ReportStore>,
    settings: LoadTestSettings,
}

impl<R, C> LoadTestExecutor<R, C>
where
    R: LoadTestRepository,
    C: Clock + Send + Sync,
{
    /// Creates an executor.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        clock: Arc<C>,
        runner: Arc<dyn CommandRunner>,
        reports: Arc<dyn ReportStore>,
        settings: LoadTestSettings,
    ) -> Self {
        Self {
            repository,
            clock,
            runner,
            reports,
            settings,
        }
    }

    /// Runs `run` and stores its final status and report link.
    ///
    /// Failures are recorded on the run and logged; nothing is returned to
    /// the submitter.
    pub async fn execute(&self, run: LoadTest) {
        let id = run.id();
        info!(load_test_id = %id, mode = %run.plan().mode(), "starting load test");
        let (status, link) = self.perform(&run).await;

        let mut current = match self.repository.find(id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                warn!(load_test_id = %id, "load test deleted before it finished");
                return;
            }
            Err(err) => {
                error!(load_test_id = %id, error = %err, "loading load test failed");
                return;
            }
        };
        current.finish(status, link);
        match self.repository.update(&current).await {
            Ok(()) => info!(load_test_id = %id, status = status.as_str(), "load test finished"),
            Err(err) => error!(load_test_id = %id, error = %err, "storing load test result failed"),
        }
    }

    async fn perform(&self, run: &LoadTest) -> (LoadTestStatus, String) {
        let id = run.id();
        if let Err(err) = self.reports.prepare(id).await {
            return self.launch_failed(id, &err.to_string()).await;
        }

        let plan = LaunchPlan::for_run(run, &self.settings.launch, self.clock.utc());
        for step in &plan.steps {
            info!(load_test_id = %id, command = %step.command_line(), "running load-test step");
            match self.runner.run(step).await {
                Ok(output) if output.success => {}
                Ok(output) => return self.tool_failed(id, &output).await,
                Err(err) => return self.launch_failed(id, &err.to_string()).await,
            }
        }
        (
            LoadTestStatus::Completed,
            self.settings.report_link(id, &plan.report_file),
        )
    }

    async fn tool_failed(&self, id: LoadTestId, output: &CommandOutput) -> (LoadTestStatus, String) {
        warn!(load_test_id = %id, "load-test tool exited with failure");
        self.write_failure(id, STDOUT_FILE, &output.combined()).await
    }

    async fn launch_failed(&self, id: LoadTestId, message: &str) -> (LoadTestStatus, String) {
        error!(load_test_id = %id, error = %message, "load test could not be launched");
        self.write_failure(id, ERROR_FILE, message.as_bytes()).await
    }

    async fn write_failure(
        &self,
        id: LoadTestId,
        file: &str,
        contents: &[u8],
    ) -> (LoadTestStatus, String) {
        if let Err(err) = self.reports.write(id, file, contents).await {
            error!(load_test_id = %id, file, error = %err, "writing failure output failed");
        }
        (LoadTestStatus::Error, self.settings.report_link(id, file))
    }
}

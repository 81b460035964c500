//! Load-test submission, lookup and deletion.

use crate::load_test::{
    domain::{LoadTest, LoadTestDomainError, LoadTestId, LoadTestMode, LoadTestPlan},
    ports::{LoadTestRepository, LoadTestRepositoryError, ReportStore, ReportStoreError},
};
use crate::task::services::Requester;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use super::LoadTestQueue;

/// Request to start a load test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateLoadTestRequest {
    run_type: String,
    domain: Option<String>,
    port: Option<u32>,
    protocol: Option<String>,
    ramp_time: Option<u32>,
    num_threads: Option<u32>,
    loops: Option<u32>,
    file: Option<String>,
}

impl CreateLoadTestRequest {
    /// Starts a request of the given run type (`CONFIG`, `SCRIPT` or
    /// `SECURITY`).
    #[must_use]
    pub fn new(run_type: impl Into<String>) -> Self {
        Self {
            run_type: run_type.into(),
            ..Self::default()
        }
    }

    /// Sets the target domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the target port and protocol.
    #[must_use]
    pub fn with_endpoint(mut self, port: u32, protocol: impl Into<String>) -> Self {
        self.port = Some(port);
        self.protocol = Some(protocol.into());
        self
    }

    /// Sets the ramp-up time in seconds, thread count and loop count.
    #[must_use]
    pub const fn with_load(mut self, ramp_time: u32, num_threads: u32, loops: u32) -> Self {
        self.ramp_time = Some(ramp_time);
        self.num_threads = Some(num_threads);
        self.loops = Some(loops);
        self
    }

    /// Sets the uploaded plan file, relative to the media root.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    fn into_plan(self) -> Result<LoadTestPlan, LoadTestDomainError> {
        let mode = LoadTestMode::try_from(self.run_type.as_str())?;
        let missing = |field| LoadTestDomainError::MissingField { mode, field };
        let text = |value: Option<String>, field| {
            value
                .map(|raw| raw.trim().to_owned())
                .filter(|trimmed| !trimmed.is_empty())
                .ok_or_else(|| missing(field))
        };

        match mode {
            LoadTestMode::Config => Ok(LoadTestPlan::Config {
                domain: text(self.domain, "domain")?,
                port: self.port.ok_or_else(|| missing("port"))?,
                protocol: text(self.protocol, "protocol")?,
                ramp_time: self.ramp_time.ok_or_else(|| missing("ramp_time"))?,
                num_threads: self.num_threads.ok_or_else(|| missing("num_threads"))?,
                loops: self.loops.ok_or_else(|| missing("loops"))?,
            }),
            LoadTestMode::Script => LoadTestPlan::script(&text(self.file, "file")?),
            LoadTestMode::Security => Ok(LoadTestPlan::security(&text(self.domain, "domain")?)),
        }
    }
}

/// Service-level errors for load-test operations.
#[derive(Debug, Clone, Error)]
pub enum LoadTestServiceError {
    /// Input validation failed before any mutation.
    #[error(transparent)]
    Validation(#[from] LoadTestDomainError),

    /// The run does not exist.
    #[error("load test {0} not found")]
    NotFound(LoadTestId),

    /// The background worker is no longer accepting runs.
    #[error("load test {0} could not be queued")]
    Dispatch(LoadTestId),

    /// The media directory could not be modified.
    #[error(transparent)]
    ExternalService(#[from] ReportStoreError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] LoadTestRepositoryError),
}

/// Result type for load-test service operations.
pub type LoadTestServiceResult<T> = Result<T, LoadTestServiceError>;

/// Load-test submission service.
pub struct LoadTestService<R, C>
where
    R: LoadTestRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    reports: Arc<dyn ReportStore>,
    queue: LoadTestQueue,
}

impl<R, C> Clone for LoadTestService<R, C>
where
    R: LoadTestRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
            reports: self.reports.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<R, C> LoadTestService<R, C>
where
    R: LoadTestRepository,
    C: Clock + Send + Sync,
{
    /// Creates a service feeding `queue`.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        clock: Arc<C>,
        reports: Arc<dyn ReportStore>,
        queue: LoadTestQueue,
    ) -> Self {
        Self {
            repository,
            clock,
            reports,
            queue,
        }
    }

    /// Stores a `RUNNING` record and queues it; returns without waiting for
    /// the tool.
    ///
    /// # Errors
    ///
    /// Returns [`LoadTestServiceError::Validation`] for bad input, before any
    /// write, and [`LoadTestServiceError::Dispatch`] when the worker has
    /// stopped; the stored record is kept.
    pub async fn submit(
        &self,
        requester: Requester,
        request: CreateLoadTestRequest,
    ) -> LoadTestServiceResult<LoadTest> {
        let plan = request.into_plan()?;
        let run = LoadTest::new(plan, Some(requester.user), &*self.clock);
        self.repository.store(&run).await?;
        self.queue.enqueue(run.clone()).map_err(|id| {
            error!(load_test_id = %id, "load-test worker is not running");
            LoadTestServiceError::Dispatch(id)
        })?;
        info!(load_test_id = %run.id(), mode = %run.plan().mode(), "queued load test");
        Ok(run)
    }

    /// Returns one run.
    ///
    /// # Errors
    ///
    /// Returns [`LoadTestServiceError::NotFound`] for unknown ids.
    pub async fn get(&self, id: LoadTestId) -> LoadTestServiceResult<LoadTest> {
        self.repository
            .find(id)
            .await?
            .ok_or(LoadTestServiceError::NotFound(id))
    }

    /// Lists runs visible to `viewer`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LoadTestServiceError::Repository`] when the lookup fails.
    pub async fn list(&self, viewer: Requester) -> LoadTestServiceResult<Vec<LoadTest>> {
        Ok(self.repository.list(viewer.owner_scope()).await?)
    }

    /// Removes a run's uploaded plan and output directory, then the record.
    ///
    /// # Errors
    ///
    /// Returns [`LoadTestServiceError::NotFound`] for unknown ids and
    /// [`LoadTestServiceError::ExternalService`] when media removal fails,
    /// in which case the record is kept.
    pub async fn delete(&self, id: LoadTestId) -> LoadTestServiceResult<LoadTest> {
        let run = self.get(id).await?;
        if let Some(upload_dir) = run.plan().upload_dir() {
            self.reports.remove_dir(upload_dir).await?;
        }
        self.reports.remove_dir(&id.to_string()).await?;
        let deleted = self
            .repository
            .delete(id)
            .await?
            .ok_or(LoadTestServiceError::NotFound(id))?;
        info!(load_test_id = %id, "deleted load test");
        Ok(deleted)
    }
}

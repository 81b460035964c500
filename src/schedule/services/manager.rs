//! Schedule creation and teardown.

use crate::schedule::{
    domain::{Recurrence, Schedule, ScheduleDomainError, ScheduleDraft, ScheduleId, ScheduledScan},
    ports::{ScheduleGateway, ScheduleGatewayError, ScheduleRepository, ScheduleRepositoryError},
};
use crate::task::{
    domain::{GitEngine, ScanModule, ScanRunType, SourceLocator, Variant},
    services::{CreateTaskRequest, Requester},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Request to create a scheduled scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateScheduleRequest {
    git_url: String,
    branch: String,
    language: Option<String>,
    time: String,
    git_user: Option<String>,
    git_pass: Option<String>,
    git_engine: Option<String>,
    run_type: Option<String>,
    exclude_path: Option<String>,
    day_of_week: Option<String>,
    date: Option<String>,
}

impl CreateScheduleRequest {
    /// Scan of `git_url` at `branch` with comma-separated `language`, firing
    /// at `time` (`HH:MM`, UTC).
    #[must_use]
    pub fn new(
        git_url: impl Into<String>,
        branch: impl Into<String>,
        language: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        Self {
            git_url: git_url.into(),
            branch: branch.into(),
            language: Some(language.into()),
            time: time.into(),
            git_user: None,
            git_pass: None,
            git_engine: None,
            run_type: None,
            exclude_path: None,
            day_of_week: None,
            date: None,
        }
    }

    /// Sets git credentials.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.git_user = Some(user.into());
        self.git_pass = Some(password.into());
        self
    }

    /// Sets the source-control engine.
    #[must_use]
    pub fn with_git_engine(mut self, engine: impl Into<String>) -> Self {
        self.git_engine = Some(engine.into());
        self
    }

    /// Sets the run type.
    #[must_use]
    pub fn with_run_type(mut self, run_type: impl Into<String>) -> Self {
        self.run_type = Some(run_type.into());
        self
    }

    /// Sets additional exclude paths.
    #[must_use]
    pub fn with_exclude_path(mut self, exclude_path: impl Into<String>) -> Self {
        self.exclude_path = Some(exclude_path.into());
        self
    }

    /// Fires weekly on `*` or a comma-separated list of `SUN`..`SAT`.
    #[must_use]
    pub fn with_day_of_week(mut self, day_of_week: impl Into<String>) -> Self {
        self.day_of_week = Some(day_of_week.into());
        self
    }

    /// Fires once on `date` (`YYYY-MM-DD`).
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// Service-level errors for schedule operations.
#[derive(Debug, Clone, Error)]
pub enum ScheduleServiceError {
    /// Input validation failed before any mutation.
    #[error(transparent)]
    Validation(#[from] ScheduleDomainError),

    /// The schedule does not exist.
    #[error("schedule {0} not found")]
    NotFound(ScheduleId),

    /// The secret store or trigger registry failed.
    #[error(transparent)]
    ExternalService(#[from] ScheduleGatewayError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] ScheduleRepositoryError),
}

/// Result type for schedule service operations.
pub type ScheduleServiceResult<T> = Result<T, ScheduleServiceError>;

/// Schedule orchestration service.
pub struct ScheduleService<R, C>
where
    R: ScheduleRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    gateway: Arc<dyn ScheduleGateway>,
    secret_prefix: String,
}

impl<R, C> Clone for ScheduleService<R, C>
where
    R: ScheduleRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
            gateway: self.gateway.clone(),
            secret_prefix: self.secret_prefix.clone(),
        }
    }
}

impl<R, C> ScheduleService<R, C>
where
    R: ScheduleRepository,
    C: Clock + Send + Sync,
{
    /// Creates a schedule service naming secrets `{secret_prefix}{id}`.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        clock: Arc<C>,
        gateway: Arc<dyn ScheduleGateway>,
        secret_prefix: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            clock,
            gateway,
            secret_prefix: secret_prefix.into(),
        }
    }

    /// Returns the name of the secret holding a schedule's git password.
    #[must_use]
    pub fn secret_name(&self, id: ScheduleId) -> String {
        format!("{}{id}", self.secret_prefix)
    }

    /// Validates and stores a schedule, then provisions its secret and
    /// trigger.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleServiceError::Validation`] for bad input, before any
    /// write. Gateway failures after the record is stored are returned as
    /// [`ScheduleServiceError::ExternalService`]; the record is kept.
    pub async fn create_schedule(
        &self,
        requester: Requester,
        request: CreateScheduleRequest,
    ) -> ScheduleServiceResult<Schedule> {
        let git_user = required(request.git_user, "git_user")?;
        let git_pass = required(request.git_pass, "git_pass")?;
        let language = required(request.language, "language")?;
        let branch = required(Some(request.branch), "branch")?;
        let languages = Variant::parse_selector(ScanModule::Scanning, &language)
            .map_err(ScheduleDomainError::from)?;
        let source = SourceLocator::new(request.git_url).map_err(ScheduleDomainError::from)?;
        let git_engine = request
            .git_engine
            .as_deref()
            .map(GitEngine::try_from)
            .transpose()
            .map_err(ScheduleDomainError::from)?
            .unwrap_or_default();
        let run_type = request
            .run_type
            .as_deref()
            .map(ScanRunType::try_from)
            .transpose()
            .map_err(ScheduleDomainError::from)?
            .unwrap_or_default();
        let recurrence = Recurrence::parse(
            &request.time,
            request.day_of_week.as_deref(),
            request.date.as_deref(),
            self.clock.utc(),
        )?;

        let schedule = Schedule::new(
            ScheduleDraft {
                git_engine,
                source,
                branch,
                git_user,
                languages,
                exclude_path: request.exclude_path.filter(|value| !value.is_empty()),
                run_type,
                recurrence,
                owner: requester.user,
            },
            &*self.clock,
        );
        self.repository.store(&schedule).await?;

        let schedule_id = schedule.id();
        self.gateway
            .put_secret(&self.secret_name(schedule_id), &git_pass)
            .await
            .inspect_err(|err| {
                error!(schedule_id = %schedule_id, error = %err, "storing schedule secret failed");
            })?;
        let expression = schedule.recurrence().cron_expression();
        self.gateway
            .register_trigger(schedule_id, &expression, &schedule.scheduled_scan())
            .await
            .inspect_err(|err| {
                error!(schedule_id = %schedule_id, error = %err, "registering trigger failed");
            })?;
        info!(schedule_id = %schedule_id, expression = %expression, "created schedule");
        Ok(schedule)
    }

    /// Lists schedules visible to `viewer`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleServiceError::Repository`] when the lookup fails.
    pub async fn list_schedules(&self, viewer: Requester) -> ScheduleServiceResult<Vec<Schedule>> {
        Ok(self.repository.list(viewer.owner_scope()).await?)
    }

    /// Tears down a schedule's secret and trigger, then deletes the record.
    ///
    /// Missing secrets or triggers are tolerated.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleServiceError::NotFound`] for unknown schedules and
    /// [`ScheduleServiceError::ExternalService`] for other gateway failures,
    /// in which case the record is kept.
    pub async fn delete_schedule(&self, id: ScheduleId) -> ScheduleServiceResult<Schedule> {
        if self.repository.find(id).await?.is_none() {
            return Err(ScheduleServiceError::NotFound(id));
        }

        tolerate_missing(self.gateway.delete_secret(&self.secret_name(id)).await, id, "secret")?;
        tolerate_missing(self.gateway.deregister_trigger(id).await, id, "trigger")?;

        let deleted = self
            .repository
            .delete(id)
            .await?
            .ok_or(ScheduleServiceError::NotFound(id))?;
        info!(schedule_id = %id, "deleted schedule");
        Ok(deleted)
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ScheduleDomainError> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
        .ok_or(ScheduleDomainError::MissingField(field))
}

fn tolerate_missing(
    result: Result<(), ScheduleGatewayError>,
    id: ScheduleId,
    resource: &'static str,
) -> Result<(), ScheduleGatewayError> {
    match result {
        Err(ScheduleGatewayError::NotFound(name)) => {
            info!(schedule_id = %id, resource, name = %name, "schedule resource already gone");
            Ok(())
        }
        other => other,
    }
}

/// Builds the scanning task a fired trigger submits, and the requester it
/// runs as.
///
/// `git_password` is the value read back from the schedule's secret.
#[must_use]
pub fn scheduled_task_request(
    scan: &ScheduledScan,
    git_password: &str,
) -> (Requester, CreateTaskRequest) {
    let mut request = CreateTaskRequest::scanning(&scan.git_url, &scan.branch, &scan.language)
        .with_credentials(&scan.git_user, git_password)
        .with_git_engine(scan.git_engine.as_str())
        .with_run_type(scan.run_type.as_str())
        .with_owner(scan.owner);
    if !scan.exclude_path.is_empty() {
        request = request.with_exclude_path(&scan.exclude_path);
    }
    (Requester::user(scan.owner), request)
}

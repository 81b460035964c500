//! Task creation, dispatch and read-side operations.

use crate::config::CitoolConfig;
use crate::task::{
    domain::{
        ClocComparison, DispatchInputs, DispatchPayload, Finding, FindingId, GitCredentials,
        GitEngine, OwnerId, ReportParseError, ScanModule, ScanRunType, SourceLocator, SubTask,
        SubTaskId, Task, TaskDomainError, TaskDraft, TaskId, TaskProfile, TaskStatus, Variant,
    },
    ports::{
        ArtifactStore, ArtifactStoreError, GatewayError, NextStep, TaskFilter, TaskRepository,
        TaskRepositoryError, WorkerGateway, WorkspaceError, WorkspaceStore,
    },
};
use chrono::DateTime;
use mockable::Clock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// User on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    /// Requesting user.
    pub user: OwnerId,
    /// Whether the user may act on every record.
    pub is_superuser: bool,
}

impl Requester {
    /// Regular user.
    #[must_use]
    pub const fn user(user: OwnerId) -> Self {
        Self {
            user,
            is_superuser: false,
        }
    }

    /// Superuser.
    #[must_use]
    pub const fn superuser(user: OwnerId) -> Self {
        Self {
            user,
            is_superuser: true,
        }
    }

    /// Owner filter applied when this requester lists records.
    #[must_use]
    pub const fn owner_scope(&self) -> Option<OwnerId> {
        if self.is_superuser {
            None
        } else {
            Some(self.user)
        }
    }
}

/// Request to create a task in one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    module: ScanModule,
    source: String,
    branch: Option<String>,
    variants: Option<String>,
    git_user: Option<String>,
    git_pass: Option<String>,
    owner: Option<OwnerId>,
    git_engine: Option<String>,
    run_type: Option<String>,
    exclude_path: Option<String>,
    include_lang: Option<String>,
    exclude_dir: Option<String>,
    comparison: ClocComparison,
    full_scan: bool,
    dast_path: Option<String>,
    filename: Option<String>,
    header_token: Option<String>,
}

impl CreateTaskRequest {
    fn base(module: ScanModule, source: impl Into<String>) -> Self {
        Self {
            module,
            source: source.into(),
            branch: None,
            variants: None,
            git_user: None,
            git_pass: None,
            owner: None,
            git_engine: None,
            run_type: None,
            exclude_path: None,
            include_lang: None,
            exclude_dir: None,
            comparison: ClocComparison::default(),
            full_scan: false,
            dast_path: None,
            filename: None,
            header_token: None,
        }
    }

    /// Static analysis of `git_url` at `branch` with comma-separated
    /// `languages`.
    #[must_use]
    pub fn scanning(
        git_url: impl Into<String>,
        branch: impl Into<String>,
        languages: impl Into<String>,
    ) -> Self {
        Self {
            branch: Some(branch.into()),
            variants: Some(languages.into()),
            ..Self::base(ScanModule::Scanning, git_url)
        }
    }

    /// Browser test run of `git_url` at `branch` with comma-separated
    /// `browsers`.
    #[must_use]
    pub fn autotest(
        git_url: impl Into<String>,
        branch: impl Into<String>,
        browsers: impl Into<String>,
    ) -> Self {
        Self {
            branch: Some(branch.into()),
            variants: Some(browsers.into()),
            ..Self::base(ScanModule::Autotest, git_url)
        }
    }

    /// Code-line count of `git_url` at `branch`.
    #[must_use]
    pub fn cloc(git_url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            branch: Some(branch.into()),
            ..Self::base(ScanModule::Cloc, git_url)
        }
    }

    /// Dynamic scan of `target_url`.
    #[must_use]
    pub fn dast(target_url: impl Into<String>) -> Self {
        Self::base(ScanModule::Dast, target_url)
    }

    /// Sets git credentials.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.git_user = Some(user.into());
        self.git_pass = Some(password.into());
        self
    }

    /// Creates the task on behalf of another user (superusers only).
    #[must_use]
    pub const fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Sets the source-control engine (`github`, `gitlab`, `bitbucket`).
    #[must_use]
    pub fn with_git_engine(mut self, engine: impl Into<String>) -> Self {
        self.git_engine = Some(engine.into());
        self
    }

    /// Sets the scanning run type (`SAST`, `DAST`).
    #[must_use]
    pub fn with_run_type(mut self, run_type: impl Into<String>) -> Self {
        self.run_type = Some(run_type.into());
        self
    }

    /// Sets additional exclude paths for static analysis.
    #[must_use]
    pub fn with_exclude_path(mut self, exclude_path: impl Into<String>) -> Self {
        self.exclude_path = Some(exclude_path.into());
        self
    }

    /// Sets the languages counted by cloc.
    #[must_use]
    pub fn with_include_lang(mut self, include_lang: impl Into<String>) -> Self {
        self.include_lang = Some(include_lang.into());
        self
    }

    /// Sets the directories excluded by cloc.
    #[must_use]
    pub fn with_exclude_dir(mut self, exclude_dir: impl Into<String>) -> Self {
        self.exclude_dir = Some(exclude_dir.into());
        self
    }

    /// Sets the cloc revision comparison.
    #[must_use]
    pub fn with_comparison(mut self, comparison: ClocComparison) -> Self {
        self.comparison = comparison;
        self
    }

    /// Requests an active dast scan.
    #[must_use]
    pub const fn with_full_scan(mut self, full_scan: bool) -> Self {
        self.full_scan = full_scan;
        self
    }

    /// Sets the dast start path.
    #[must_use]
    pub fn with_dast_path(mut self, dast_path: impl Into<String>) -> Self {
        self.dast_path = Some(dast_path.into());
        self
    }

    /// Sets the uploaded dast definition file.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Sets the header token forwarded to the dast target.
    #[must_use]
    pub fn with_header_token(mut self, header_token: impl Into<String>) -> Self {
        self.header_token = Some(header_token.into());
        self
    }

    /// Returns the module the task will belong to.
    #[must_use]
    pub const fn module(&self) -> ScanModule {
        self.module
    }
}

/// Record an operation could not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRecord {
    /// Unknown task.
    Task(TaskId),
    /// Unknown subtask.
    SubTask(SubTaskId),
    /// Unknown finding.
    Finding(FindingId),
    /// Task without an uploaded artifact.
    Artifact(TaskId),
}

impl fmt::Display for MissingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(id) => write!(f, "task {id}"),
            Self::SubTask(id) => write!(f, "subtask {id}"),
            Self::Finding(id) => write!(f, "finding {id}"),
            Self::Artifact(id) => write!(f, "artifact of task {id}"),
        }
    }
}

/// Failure of an external collaborator.
#[derive(Debug, Clone, Error)]
pub enum ExternalServiceError {
    /// Worker platform call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Workspace access failed.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    /// Artifact storage call failed.
    #[error(transparent)]
    Artifacts(#[from] ArtifactStoreError),
    /// A worker report did not match its layout.
    #[error(transparent)]
    Report(#[from] ReportParseError),
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Clone, Error)]
pub enum TaskLifecycleError {
    /// Input validation failed before any mutation.
    #[error(transparent)]
    Validation(#[from] TaskDomainError),

    /// The referenced record does not exist.
    #[error("{0} not found")]
    NotFound(MissingRecord),

    /// The worker queue reported a failed delivery; the task stays `PENDING`.
    #[error("dispatch of task {0} was not accepted")]
    Dispatch(TaskId),

    /// Artifact upload failed.
    #[error("artifact upload for task {task_id} failed: {source}")]
    Upload {
        /// Task whose artifact failed to upload.
        task_id: TaskId,
        /// Storage failure.
        source: ArtifactStoreError,
    },

    /// An external collaborator failed.
    #[error(transparent)]
    ExternalService(#[from] ExternalServiceError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
}

impl From<GatewayError> for TaskLifecycleError {
    fn from(err: GatewayError) -> Self {
        Self::ExternalService(err.into())
    }
}

impl From<WorkspaceError> for TaskLifecycleError {
    fn from(err: WorkspaceError) -> Self {
        Self::ExternalService(err.into())
    }
}

impl From<ArtifactStoreError> for TaskLifecycleError {
    fn from(err: ArtifactStoreError) -> Self {
        Self::ExternalService(err.into())
    }
}

impl From<ReportParseError> for TaskLifecycleError {
    fn from(err: ReportParseError) -> Self {
        Self::ExternalService(err.into())
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// External collaborators used by the lifecycle service.
#[derive(Clone)]
pub struct TaskGateways {
    /// Worker platform.
    pub worker: Arc<dyn WorkerGateway>,
    /// Shared worker workspace.
    pub workspace: Arc<dyn WorkspaceStore>,
    /// Durable report storage.
    pub artifacts: Arc<dyn ArtifactStore>,
}

/// Tunables of the lifecycle service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Exclude paths always sent to static analysis.
    pub default_exclude_paths: String,
    /// Lifetime of artifact download links.
    pub presign_expiry: Duration,
}

impl LifecycleSettings {
    /// Extracts the lifecycle settings from the crate configuration.
    #[must_use]
    pub fn from_config(config: &CitoolConfig) -> Self {
        Self {
            default_exclude_paths: config.scanning.default_exclude_paths.clone(),
            presign_expiry: Duration::from_secs(config.artifacts.presign_expiry_secs),
        }
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self::from_config(&CitoolConfig::default())
    }
}

/// Task with its subtasks and findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetails {
    /// Task record.
    pub task: Task,
    /// Subtasks in creation order.
    pub subtasks: Vec<SubTask>,
    /// Findings in insertion order.
    pub findings: Vec<Finding>,
}

/// Formatted log output of one subtask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubTaskLog {
    /// Subtask the lines belong to.
    pub subtask_id: SubTaskId,
    /// Subtask variant.
    pub variant: Variant,
    /// `"{timestamp}\t{message}"` lines.
    pub lines: Vec<String>,
}

/// Credentials re-supplied when resuming a stalled dispatch.
#[derive(Debug, Clone, Default)]
pub struct ResumeDispatch {
    /// Git credentials for git modules.
    pub credentials: Option<GitCredentials>,
    /// Header token for dast targets.
    pub header_token: Option<String>,
}

/// Task lifecycle orchestration service.
pub struct TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    pub(super) repository: Arc<R>,
    pub(super) clock: Arc<C>,
    pub(super) gateways: TaskGateways,
    pub(super) settings: LifecycleSettings,
}

impl<R, C> Clone for TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
            gateways: self.gateways.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        clock: Arc<C>,
        gateways: TaskGateways,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            repository,
            clock,
            gateways,
            settings,
        }
    }

    /// Validates a request, stores the task and its subtasks, and dispatches
    /// the work.
    ///
    /// Validation happens before any write. Writes are not transactional: if
    /// dispatch fails the task stays `PENDING` with its subtasks, and
    /// [`Self::resume_dispatch`] can send it again.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Validation`] for bad input,
    /// [`TaskLifecycleError::Dispatch`] when the queue rejects the message
    /// and [`TaskLifecycleError::ExternalService`] when a gateway call fails.
    pub async fn create_task(
        &self,
        requester: Requester,
        request: CreateTaskRequest,
    ) -> TaskLifecycleResult<TaskDetails> {
        let module = request.module;
        let credentials = required_credentials(&request)?;
        let variants = match request.variants.as_deref() {
            Some(selector) if module.fans_out() => Variant::parse_selector(module, selector)?,
            None if module.fans_out() => {
                return Err(TaskDomainError::MissingField(module.variant_field()).into());
            }
            _ => Vec::new(),
        };
        let owner = resolve_owner(requester, request.owner)?;
        let profile = build_profile(&request)?;
        let source = SourceLocator::new(request.source.as_str())?;

        let task = Task::new(
            TaskDraft {
                profile,
                source,
                branch: request.branch.clone(),
                owner: Some(owner),
            },
            &*self.clock,
        );
        let mut subtasks: Vec<SubTask> = variants
            .into_iter()
            .map(|variant| SubTask::new(task.id(), variant, &*self.clock))
            .collect();
        if module == ScanModule::Scanning {
            subtasks.push(SubTask::new(task.id(), Variant::SecretScan, &*self.clock));
        }
        let payload = DispatchPayload::build(
            &task,
            &subtasks,
            DispatchInputs {
                credentials: credentials.as_ref(),
                default_exclude_paths: &self.settings.default_exclude_paths,
                header_token: request.header_token.as_deref(),
            },
        )?;

        self.repository.store_task(&task).await?;
        for subtask in &subtasks {
            self.repository.store_subtask(subtask).await?;
        }
        info!(
            task_id = %task.id(),
            module = %module,
            subtasks = subtasks.len(),
            "created task"
        );

        self.dispatch(&task, &payload).await?;
        Ok(TaskDetails {
            task,
            subtasks,
            findings: Vec::new(),
        })
    }

    /// Re-sends the dispatch payload of a task still in `PENDING`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks,
    /// [`TaskLifecycleError::Validation`] when the task already left
    /// `PENDING` or credentials are missing, and dispatch errors as for
    /// [`Self::create_task`].
    pub async fn resume_dispatch(
        &self,
        task_id: TaskId,
        resume: ResumeDispatch,
    ) -> TaskLifecycleResult<TaskDetails> {
        let task = self.load_task(task_id).await?;
        if task.status() != TaskStatus::Pending {
            return Err(TaskDomainError::DispatchAlreadyStarted(task_id).into());
        }
        let subtasks = self.repository.list_subtasks(task_id).await?;
        let payload = DispatchPayload::build(
            &task,
            &subtasks,
            DispatchInputs {
                credentials: resume.credentials.as_ref(),
                default_exclude_paths: &self.settings.default_exclude_paths,
                header_token: resume.header_token.as_deref(),
            },
        )?;

        info!(task_id = %task_id, "resuming dispatch");
        self.dispatch(&task, &payload).await?;
        Ok(TaskDetails {
            task,
            subtasks,
            findings: Vec::new(),
        })
    }

    async fn dispatch(&self, task: &Task, payload: &DispatchPayload) -> TaskLifecycleResult<()> {
        let task_id = task.id();
        if task.module() == ScanModule::Dast {
            self.gateways
                .worker
                .invoke_listener(payload)
                .await
                .inspect_err(|err| {
                    error!(task_id = %task_id, error = %err, "listener invocation failed");
                })?;
            return Ok(());
        }

        let receipt = self
            .gateways
            .worker
            .enqueue(payload)
            .await
            .inspect_err(|err| error!(task_id = %task_id, error = %err, "enqueue failed"))?;
        if !receipt.accepted {
            error!(task_id = %task_id, "queue rejected dispatch payload");
            return Err(TaskLifecycleError::Dispatch(task_id));
        }
        info!(
            task_id = %task_id,
            message_id = receipt.message_id.as_deref().unwrap_or_default(),
            "dispatch payload enqueued"
        );

        self.gateways
            .worker
            .notify_next(NextStep::CheckAndClone)
            .await
            .inspect_err(|err| {
                error!(task_id = %task_id, error = %err, "check-and-clone nudge failed");
            })?;
        Ok(())
    }

    /// Retrieves a task with its subtasks and findings.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks.
    pub async fn get_task(&self, task_id: TaskId) -> TaskLifecycleResult<TaskDetails> {
        let task = self.load_task(task_id).await?;
        let subtasks = self.repository.list_subtasks(task_id).await?;
        let findings = self.repository.list_findings(task_id).await?;
        Ok(TaskDetails {
            task,
            subtasks,
            findings,
        })
    }

    /// Lists a module's tasks visible to `viewer`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the lookup fails.
    pub async fn list_tasks(
        &self,
        viewer: Requester,
        module: ScanModule,
    ) -> TaskLifecycleResult<Vec<Task>> {
        let filter = TaskFilter {
            module: Some(module),
            owner: viewer.owner_scope(),
        };
        Ok(self.repository.list_tasks(filter).await?)
    }

    /// Deletes a task, its subtasks and findings, then cleans up the
    /// workspace and stored artifacts.
    ///
    /// Cleanup is attempted for every resource even when one step fails.
    /// Running external work is not cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks and
    /// [`TaskLifecycleError::ExternalService`] for the first failed cleanup.
    pub async fn delete_task(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        let task = self
            .repository
            .delete_task(task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(MissingRecord::Task(task_id)))?;
        info!(task_id = %task_id, module = %task.module(), "deleted task");

        let mut first_failure: Option<TaskLifecycleError> = None;
        if let Err(err) = self.gateways.workspace.remove_workspace(task_id).await {
            warn!(task_id = %task_id, error = %err, "workspace cleanup failed");
            first_failure.get_or_insert(err.into());
        }
        if let Some(locator) = task.artifact()
            && let Err(err) = self.gateways.artifacts.delete(locator).await
        {
            warn!(task_id = %task_id, artifact = %locator, error = %err, "artifact deletion failed");
            first_failure.get_or_insert(err.into());
        }
        if task.module() == ScanModule::Autotest
            && let Err(err) = self.gateways.artifacts.delete_media(task_id).await
        {
            warn!(task_id = %task_id, error = %err, "media cleanup failed");
            first_failure.get_or_insert(err.into());
        }

        first_failure.map_or(Ok(task), Err)
    }

    /// Reads the worker logs of every subtask that reported a log stream.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks and
    /// [`TaskLifecycleError::ExternalService`] when log retrieval fails.
    pub async fn task_logs(&self, task_id: TaskId) -> TaskLifecycleResult<Vec<SubTaskLog>> {
        self.load_task(task_id).await?;
        let subtasks = self.repository.list_subtasks(task_id).await?;

        let mut logs = Vec::with_capacity(subtasks.len());
        for subtask in subtasks {
            let lines = match subtask.log_stream() {
                Some(stream) => self
                    .gateways
                    .worker
                    .fetch_log_lines(stream)
                    .await?
                    .into_iter()
                    .map(|line| format_log_line(line.timestamp_ms, &line.message))
                    .collect(),
                None => Vec::new(),
            };
            logs.push(SubTaskLog {
                subtask_id: subtask.id(),
                variant: subtask.variant(),
                lines,
            });
        }
        Ok(logs)
    }

    /// Returns a time-limited download link for the task's artifact.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] when the task or its artifact
    /// does not exist.
    pub async fn artifact_link(&self, task_id: TaskId) -> TaskLifecycleResult<String> {
        let task = self.load_task(task_id).await?;
        let locator = task
            .artifact()
            .ok_or(TaskLifecycleError::NotFound(MissingRecord::Artifact(task_id)))?;
        Ok(self
            .gateways
            .artifacts
            .presigned_link(locator, self.settings.presign_expiry)
            .await?)
    }

    /// Replaces the free-text note of a finding.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown findings.
    pub async fn annotate_finding(
        &self,
        finding_id: FindingId,
        note: &str,
    ) -> TaskLifecycleResult<Finding> {
        self.repository
            .update_finding_note(finding_id, note)
            .await
            .map_err(|err| match err {
                TaskRepositoryError::FindingNotFound(id) => {
                    TaskLifecycleError::NotFound(MissingRecord::Finding(id))
                }
                other => other.into(),
            })
    }

    pub(super) async fn load_task(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.repository
            .find_task(task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(MissingRecord::Task(task_id)))
    }
}

fn required_credentials(request: &CreateTaskRequest) -> TaskLifecycleResult<Option<GitCredentials>> {
    if request.module == ScanModule::Dast {
        return Ok(None);
    }
    if request.source.trim().is_empty() {
        return Err(TaskDomainError::MissingField("git_url").into());
    }
    if request.branch.as_deref().is_none_or(|branch| branch.trim().is_empty()) {
        return Err(TaskDomainError::MissingField("branch").into());
    }
    let user = request
        .git_user
        .as_deref()
        .ok_or(TaskDomainError::MissingField("git_user"))?;
    let password = request
        .git_pass
        .as_deref()
        .ok_or(TaskDomainError::MissingField("git_pass"))?;
    Ok(Some(GitCredentials::new(user, password)))
}

fn resolve_owner(requester: Requester, requested: Option<OwnerId>) -> TaskLifecycleResult<OwnerId> {
    match requested {
        Some(owner) if owner != requester.user && !requester.is_superuser => {
            Err(TaskDomainError::OwnerOverrideForbidden.into())
        }
        Some(owner) => Ok(owner),
        None => Ok(requester.user),
    }
}

fn build_profile(request: &CreateTaskRequest) -> TaskLifecycleResult<TaskProfile> {
    let trimmed_or_all = |value: Option<&str>| {
        value
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "*".to_owned())
    };

    Ok(match request.module {
        ScanModule::Scanning => TaskProfile::Scanning {
            git_engine: request
                .git_engine
                .as_deref()
                .map(GitEngine::try_from)
                .transpose()?
                .unwrap_or_default(),
            run_type: request
                .run_type
                .as_deref()
                .map(ScanRunType::try_from)
                .transpose()?
                .unwrap_or_default(),
            exclude_path: request.exclude_path.clone(),
        },
        ScanModule::Autotest => TaskProfile::Autotest,
        ScanModule::Cloc => TaskProfile::Cloc {
            include_lang: trimmed_or_all(request.include_lang.as_deref()),
            exclude_dir: trimmed_or_all(request.exclude_dir.as_deref()),
            comparison: request.comparison.clone(),
        },
        ScanModule::Dast => {
            if request.source.trim().is_empty() {
                return Err(TaskDomainError::MissingField("target_url").into());
            }
            TaskProfile::Dast {
                full_scan: request.full_scan,
                dast_path: request.dast_path.clone(),
                filename: request.filename.clone(),
            }
        }
    })
}

/// Formats a worker log event as `"{timestamp}\t{message}"` in UTC.
#[must_use]
fn format_log_line(timestamp_ms: i64, message: &str) -> String {
    DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || format!("{timestamp_ms}\t{message}"),
        |timestamp| format!("{}\t{message}", timestamp.naive_utc()),
    )
}

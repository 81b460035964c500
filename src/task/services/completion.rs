//! Worker completion callbacks and parent status rollup.
//!
//! Subtask reports always end with a rollup of the parent task, including
//! when handling the report failed part-way. Task-level reports are only
//! accepted for modules that do not fan out.

use super::lifecycle::{MissingRecord, TaskLifecycleError, TaskLifecycleResult, TaskLifecycleService};
use crate::task::{
    domain::{
        Finding, FindingBody, FindingOwner, GitEngine, LinkContext, LogStreamRef, ReportKind, RollupOutcome,
        ScanModule, SubTask, SubTaskId, Task, TaskDomainError, TaskId, TaskProfile, TaskStatus,
        parse_dynamic_findings, parse_line_counts, parse_static_findings,
    },
    ports::{ArtifactCategory, ArtifactUpload, NextStep, ResultRequest, TaskRepository},
};
use mockable::Clock;
use tracing::{info, warn};

/// Status reported by a worker for a task or subtask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Reported status.
    pub status: TaskStatus,
    /// Log stream of the worker job, when known.
    pub log_stream: Option<LogStreamRef>,
}

impl StatusReport {
    /// Report without log stream coordinates.
    #[must_use]
    pub const fn new(status: TaskStatus) -> Self {
        Self {
            status,
            log_stream: None,
        }
    }

    /// Attaches the worker log stream.
    #[must_use]
    pub fn with_log_stream(mut self, log_stream: LogStreamRef) -> Self {
        self.log_stream = Some(log_stream);
        self
    }
}

/// Outcome of a subtask status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubTaskCompletion {
    /// Subtask after the report was applied.
    pub subtask: SubTask,
    /// Rollup applied to the parent task.
    pub rollup: RollupOutcome,
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Applies a worker status report to a subtask and rolls the parent up.
    ///
    /// On the first `COMPLETED` report of a scanning subtask the static
    /// report is ingested as findings; for autotest subtasks the browser
    /// media is uploaded. The first report is claimed atomically in the
    /// store, so repeated or concurrent `COMPLETED` reports only refresh the
    /// status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown subtasks, without
    /// touching any record. Other failures are returned after the parent
    /// rollup has run.
    pub async fn report_subtask_status(
        &self,
        subtask_id: SubTaskId,
        report: StatusReport,
    ) -> TaskLifecycleResult<SubTaskCompletion> {
        let mut subtask = self
            .repository
            .find_subtask(subtask_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(MissingRecord::SubTask(subtask_id)))?;
        let task = self.load_task(subtask.task_id()).await?;

        let applied = self.apply_subtask_report(&task, &mut subtask, report).await;
        let rollup = self.roll_up(task.id()).await;
        match (applied, rollup) {
            (Ok(()), Ok(outcome)) => Ok(SubTaskCompletion {
                subtask,
                rollup: outcome,
            }),
            (Ok(()), Err(err)) => Err(err),
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(rollup_err)) => {
                warn!(task_id = %task.id(), error = %rollup_err, "rollup after failed report also failed");
                Err(err)
            }
        }
    }

    async fn apply_subtask_report(
        &self,
        task: &Task,
        subtask: &mut SubTask,
        report: StatusReport,
    ) -> TaskLifecycleResult<()> {
        let first_completion = report.status == TaskStatus::Completed
            && self
                .repository
                .claim_subtask_completion(subtask.id(), self.clock.utc())
                .await?
                .is_some();
        if first_completion {
            let ingested = match task.module() {
                ScanModule::Scanning => self.ingest_static_report(task, subtask).await,
                ScanModule::Autotest => {
                    self.upload_media(task, subtask).await;
                    Ok(())
                }
                ScanModule::Cloc | ScanModule::Dast => Ok(()),
            };
            if let Err(err) = ingested {
                // `subtask` still carries the status held before the claim.
                self.repository.update_subtask(subtask).await?;
                return Err(err);
            }
        }

        subtask.update_status(report.status, &*self.clock);
        if let Some(log_stream) = report.log_stream {
            subtask.attach_log_stream(log_stream, &*self.clock);
        }
        self.repository.update_subtask(subtask).await?;
        info!(
            task_id = %task.id(),
            subtask_id = %subtask.id(),
            status = %subtask.status(),
            "subtask status updated"
        );

        if first_completion {
            self.gateways.worker.notify_next(NextStep::CheckAndScan).await?;
        }
        Ok(())
    }

    async fn ingest_static_report(&self, task: &Task, subtask: &SubTask) -> TaskLifecycleResult<()> {
        let request = ResultRequest {
            task_id: task.id(),
            source: Some(task.source().clone()),
            kind: ReportKind::for_scan_variant(subtask.variant()),
        };
        let Some(document) = self.gateways.workspace.fetch_result(&request).await? else {
            warn!(task_id = %task.id(), subtask_id = %subtask.id(), "no static report found");
            return Ok(());
        };

        let engine = match task.profile() {
            TaskProfile::Scanning { git_engine, .. } => *git_engine,
            _ => GitEngine::default(),
        };
        let vulnerabilities = parse_static_findings(
            &document,
            LinkContext {
                engine,
                source: task.source(),
                branch: task.branch().unwrap_or_default(),
            },
        )?;
        let owner = FindingOwner::SubTask {
            task_id: task.id(),
            subtask_id: subtask.id(),
        };
        let findings: Vec<Finding> = vulnerabilities
            .into_iter()
            .map(|vulnerability| {
                Finding::new(owner, FindingBody::Vulnerability(vulnerability), &*self.clock)
            })
            .collect();
        self.repository.store_findings(&findings).await?;
        info!(
            task_id = %task.id(),
            subtask_id = %subtask.id(),
            findings = findings.len(),
            "stored static findings"
        );
        Ok(())
    }

    async fn upload_media(&self, task: &Task, subtask: &SubTask) {
        let upload = ArtifactUpload {
            category: ArtifactCategory::AutotestMedia,
            task_id: task.id(),
            subtask_id: Some(subtask.id()),
            source: Some(task.source().clone()),
        };
        if let Err(err) = self.gateways.artifacts.upload(&upload).await {
            warn!(task_id = %task.id(), subtask_id = %subtask.id(), error = %err, "media upload failed");
        }
    }

    /// Recomputes the parent status; removes the workspace the first time the
    /// task reaches `COMPLETED`.
    async fn roll_up(&self, task_id: TaskId) -> TaskLifecycleResult<RollupOutcome> {
        let outcome = self.repository.roll_up(task_id, self.clock.utc()).await?;
        info!(
            task_id = %task_id,
            previous = %outcome.previous,
            current = %outcome.current(),
            "rolled up task status"
        );
        if outcome.completed_now() {
            self.gateways.workspace.remove_workspace(task_id).await?;
        }
        Ok(outcome)
    }

    /// Applies a worker status report to a task tracked without subtasks.
    ///
    /// On the first `COMPLETED` report, cloc tasks ingest their line counts
    /// and upload the detail file, and dast tasks ingest their findings and
    /// upload the HTML report. Later `COMPLETED` reports, concurrent ones
    /// included, return the stored task unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Validation`] for fan-out modules,
    /// [`TaskLifecycleError::NotFound`] for unknown tasks and
    /// [`TaskLifecycleError::Upload`] when a dast report cannot be stored; the
    /// task is then marked `ERROR` and keeps its findings.
    pub async fn report_task_status(
        &self,
        task_id: TaskId,
        report: StatusReport,
    ) -> TaskLifecycleResult<Task> {
        let mut task = self.load_task(task_id).await?;
        if task.module().fans_out() {
            return Err(TaskDomainError::FanOut(task.module()).into());
        }

        if report.status == TaskStatus::Completed {
            let claimed = self
                .repository
                .claim_task_completion(task_id, self.clock.utc())
                .await?;
            if claimed.is_none() {
                info!(task_id = %task_id, "task already completed");
                return self.load_task(task_id).await;
            }
            let before = task.clone();
            let completed = match task.module() {
                ScanModule::Cloc => self.complete_cloc(&mut task).await,
                ScanModule::Dast => self.complete_dast(&mut task).await,
                ScanModule::Scanning | ScanModule::Autotest => Ok(()),
            };
            if let Err(err) = completed {
                // A failed dast upload has already stored ERROR.
                if !matches!(err, TaskLifecycleError::Upload { .. }) {
                    self.repository.update_task(&before).await?;
                }
                return Err(err);
            }
        }

        task.set_status(report.status, &*self.clock);
        self.repository.update_task(&task).await?;
        info!(task_id = %task_id, status = %task.status(), "task status updated");
        Ok(task)
    }

    async fn complete_cloc(&self, task: &mut Task) -> TaskLifecycleResult<()> {
        let request = ResultRequest {
            task_id: task.id(),
            source: Some(task.source().clone()),
            kind: ReportKind::Cloc,
        };
        match self.gateways.workspace.fetch_result(&request).await? {
            Some(document) => {
                let owner = FindingOwner::Task { task_id: task.id() };
                let findings: Vec<Finding> = parse_line_counts(&document)?
                    .into_iter()
                    .map(|count| Finding::new(owner, FindingBody::LineCount(count), &*self.clock))
                    .collect();
                self.repository.store_findings(&findings).await?;
            }
            None => warn!(task_id = %task.id(), "no cloc summary found"),
        }

        let upload = ArtifactUpload {
            category: ArtifactCategory::Cloc,
            task_id: task.id(),
            subtask_id: None,
            source: Some(task.source().clone()),
        };
        match self.gateways.artifacts.upload(&upload).await {
            Ok(locator) => task.record_artifact(locator, &*self.clock)?,
            Err(err) => warn!(task_id = %task.id(), error = %err, "cloc detail upload failed"),
        }

        self.gateways.worker.notify_next(NextStep::CheckAndScan).await?;
        self.gateways.workspace.remove_workspace(task.id()).await?;
        Ok(())
    }

    async fn complete_dast(&self, task: &mut Task) -> TaskLifecycleResult<()> {
        let request = ResultRequest {
            task_id: task.id(),
            source: None,
            kind: ReportKind::Dast,
        };
        match self.gateways.workspace.fetch_result(&request).await? {
            Some(document) => {
                let owner = FindingOwner::Task { task_id: task.id() };
                let findings: Vec<Finding> = parse_dynamic_findings(&document)?
                    .into_iter()
                    .map(|vulnerability| {
                        Finding::new(owner, FindingBody::Vulnerability(vulnerability), &*self.clock)
                    })
                    .collect();
                self.repository.store_findings(&findings).await?;
            }
            None => warn!(task_id = %task.id(), "no dast report found"),
        }

        let upload = ArtifactUpload {
            category: ArtifactCategory::Dast,
            task_id: task.id(),
            subtask_id: None,
            source: None,
        };
        match self.gateways.artifacts.upload(&upload).await {
            Ok(locator) => task.record_artifact(locator, &*self.clock)?,
            Err(err) => {
                warn!(task_id = %task.id(), error = %err, "dast report upload failed");
                task.set_status(TaskStatus::Error, &*self.clock);
                self.repository.update_task(task).await?;
                return Err(TaskLifecycleError::Upload {
                    task_id: task.id(),
                    source: err,
                });
            }
        }

        self.gateways.workspace.remove_workspace(task.id()).await?;
        Ok(())
    }
}

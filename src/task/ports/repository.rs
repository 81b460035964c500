//! Repository port for task, subtask and finding persistence.

use crate::task::domain::{
    Finding, FindingId, OwnerId, RollupOutcome, ScanModule, SubTask, SubTaskId, Task, TaskId,
    TaskStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Selection applied when listing tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Restrict to one module.
    pub module: Option<ScanModule>,
    /// Restrict to one owner.
    pub owner: Option<OwnerId>,
}

impl TaskFilter {
    /// Returns `true` when `task` passes the filter.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.module.is_none_or(|module| task.module() == module)
            && self.owner.is_none_or(|owner| task.owner() == Some(owner))
    }
}

/// Task store contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the task ID already
    /// exists.
    async fn store_task(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Stores a new subtask under an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the owning task does not
    /// exist.
    async fn store_subtask(&self, subtask: &SubTask) -> TaskRepositoryResult<()>;

    /// Persists changes to an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    async fn update_task(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Finds a task by identifier.
    async fn find_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Lists tasks passing `filter`, newest first.
    async fn list_tasks(&self, filter: TaskFilter) -> TaskRepositoryResult<Vec<Task>>;

    /// Deletes a task together with its subtasks and findings.
    ///
    /// Returns the removed task, or `None` when it did not exist.
    async fn delete_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Finds a subtask by identifier.
    async fn find_subtask(&self, id: SubTaskId) -> TaskRepositoryResult<Option<SubTask>>;

    /// Persists changes to an existing subtask.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::SubTaskNotFound`] when the subtask does
    /// not exist.
    async fn update_subtask(&self, subtask: &SubTask) -> TaskRepositoryResult<()>;

    /// Moves a subtask to `COMPLETED` unless it is already there.
    ///
    /// The check and the write are one atomic step: of several concurrent
    /// completion reports for the same subtask exactly one gets the previous
    /// status back, the others get `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::SubTaskNotFound`] when the subtask does
    /// not exist.
    async fn claim_subtask_completion(
        &self,
        id: SubTaskId,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<Option<TaskStatus>>;

    /// Moves a task to `COMPLETED` unless it is already there.
    ///
    /// Same contract as [`Self::claim_subtask_completion`], for modules
    /// tracked without subtasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    async fn claim_task_completion(
        &self,
        id: TaskId,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<Option<TaskStatus>>;

    /// Lists a task's subtasks in creation order.
    async fn list_subtasks(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<SubTask>>;

    /// Appends findings.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when an owning task does not
    /// exist.
    async fn store_findings(&self, findings: &[Finding]) -> TaskRepositoryResult<()>;

    /// Lists every finding of a task, subtask findings included, in insertion
    /// order.
    async fn list_findings(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<Finding>>;

    /// Replaces the note of a finding and returns the updated finding.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::FindingNotFound`] when the finding does
    /// not exist.
    async fn update_finding_note(&self, id: FindingId, note: &str)
    -> TaskRepositoryResult<Finding>;

    /// Recomputes a task's status from its subtasks.
    ///
    /// The read of subtask statuses and the write of the task status happen
    /// under one per-task lock, so concurrent rollups for the same task are
    /// serialised and none overwrites a newer result.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    async fn roll_up(&self, task_id: TaskId, now: DateTime<Utc>)
    -> TaskRepositoryResult<RollupOutcome>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The subtask was not found.
    #[error("subtask not found: {0}")]
    SubTaskNotFound(SubTaskId),

    /// The finding was not found.
    #[error("finding not found: {0}")]
    FindingNotFound(FindingId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

impl From<diesel::result::Error> for TaskRepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}

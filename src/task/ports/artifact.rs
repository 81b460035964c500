//! Durable report storage.

use crate::task::domain::{ArtifactLocator, SourceLocator, SubTaskId, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for artifact storage operations.
pub type ArtifactStoreResult<T> = Result<T, ArtifactStoreError>;

/// Kind of consolidated report pushed to durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactCategory {
    /// Per-file code-line count (`cloc/{task}/cloc_detail.csv`).
    Cloc,
    /// Dynamic scan HTML report (`dast/{task}/report.html`).
    Dast,
    /// Browser test report site copied into media storage.
    AutotestMedia,
}

impl ArtifactCategory {
    /// Object key prefix of the category.
    #[must_use]
    pub const fn folder(self) -> &'static str {
        match self {
            Self::Cloc => "cloc",
            Self::Dast => "dast",
            Self::AutotestMedia => "results",
        }
    }

    /// Report file name produced by the worker, if the category is a single file.
    #[must_use]
    pub const fn file_name(self) -> Option<&'static str> {
        match self {
            Self::Cloc => Some("cloc_detail.csv"),
            Self::Dast => Some("report.html"),
            Self::AutotestMedia => None,
        }
    }

    /// Object key the report is stored under.
    #[must_use]
    pub fn object_key(self, task_id: TaskId, subtask_id: Option<SubTaskId>) -> String {
        match (self.file_name(), subtask_id) {
            (Some(file), _) => format!("{}/{task_id}/{file}", self.folder()),
            (None, Some(subtask)) => format!("{}/{task_id}/{subtask}", self.folder()),
            (None, None) => format!("{}/{task_id}", self.folder()),
        }
    }
}

/// Upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactUpload {
    /// Report category.
    pub category: ArtifactCategory,
    /// Owning task.
    pub task_id: TaskId,
    /// Owning subtask, for per-subtask reports.
    pub subtask_id: Option<SubTaskId>,
    /// Repository the report was produced in; absent for dast.
    pub source: Option<SourceLocator>,
}

/// Durable storage contract.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Pushes a consolidated report and returns its locator.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::MissingReport`] when the worker did not
    /// write the report.
    async fn upload(&self, upload: &ArtifactUpload) -> ArtifactStoreResult<ArtifactLocator>;

    /// Returns a time-limited download URL.
    async fn presigned_link(
        &self,
        locator: &ArtifactLocator,
        expires_in: Duration,
    ) -> ArtifactStoreResult<String>;

    /// Deletes a stored artifact.
    async fn delete(&self, locator: &ArtifactLocator) -> ArtifactStoreResult<()>;

    /// Deletes every media report copied for a task.
    async fn delete_media(&self, task_id: TaskId) -> ArtifactStoreResult<()>;
}

/// Errors returned by artifact storage adapters.
#[derive(Debug, Clone, Error)]
pub enum ArtifactStoreError {
    /// The report to upload is missing from the workspace.
    #[error("report not found: {0}")]
    MissingReport(String),

    /// The storage backend failed.
    #[error("artifact storage error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl ArtifactStoreError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}

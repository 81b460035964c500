//! Shared worker workspace where repositories are cloned and reports land.

use crate::task::domain::{ReportKind, ResultDocument, SourceLocator, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for workspace operations.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Locates a worker report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRequest {
    /// Task the report belongs to.
    pub task_id: TaskId,
    /// Repository the report was produced for; absent for dast.
    pub source: Option<SourceLocator>,
    /// Report to fetch.
    pub kind: ReportKind,
}

/// Workspace contract.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Reads a report; `None` when it has not been written.
    async fn fetch_result(&self, request: &ResultRequest) -> WorkspaceResult<Option<ResultDocument>>;

    /// Removes the task's working directory. Missing directories are ignored.
    async fn remove_workspace(&self, task_id: TaskId) -> WorkspaceResult<()>;
}

/// Errors returned by workspace adapters.
#[derive(Debug, Clone, Error)]
pub enum WorkspaceError {
    /// A report exists but is not valid JSON.
    #[error("unreadable report {path}: {source}")]
    UnreadableReport {
        /// Report path relative to the workspace root.
        path: String,
        /// Decoding failure.
        source: Arc<serde_json::Error>,
    },

    /// Filesystem failure.
    #[error("workspace I/O error: {0}")]
    Io(Arc<std::io::Error>),
}

impl WorkspaceError {
    /// Wraps an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

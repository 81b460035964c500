//! Media directory holding per-run reports.

use crate::load_test::domain::LoadTestId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for report store operations.
pub type ReportStoreResult<T> = Result<T, ReportStoreError>;

/// Access to the media directory load-test tools write into.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Creates the output directory of a run if it does not exist.
    async fn prepare(&self, id: LoadTestId) -> ReportStoreResult<()>;

    /// Writes `contents` to `name` inside the output directory of a run.
    async fn write(&self, id: LoadTestId, name: &str, contents: &[u8]) -> ReportStoreResult<()>;

    /// Removes a directory under the media root; missing directories are
    /// ignored.
    async fn remove_dir(&self, path: &str) -> ReportStoreResult<()>;
}

/// Errors returned by report stores.
#[derive(Debug, Clone, Error)]
pub enum ReportStoreError {
    /// Filesystem failure.
    #[error("report store I/O error: {0}")]
    Io(Arc<std::io::Error>),
}

impl ReportStoreError {
    /// Wraps an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

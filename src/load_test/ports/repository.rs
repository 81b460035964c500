//! Load-test run store.

use crate::load_test::domain::{LoadTest, LoadTestId};
use crate::task::domain::OwnerId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for load-test repository operations.
pub type LoadTestRepositoryResult<T> = Result<T, LoadTestRepositoryError>;

/// Persistence contract for load-test runs.
#[async_trait]
pub trait LoadTestRepository: Send + Sync {
    /// Stores a new run.
    async fn store(&self, run: &LoadTest) -> LoadTestRepositoryResult<()>;

    /// Replaces a stored run.
    ///
    /// # Errors
    ///
    /// Returns [`LoadTestRepositoryError::NotFound`] when the run was deleted.
    async fn update(&self, run: &LoadTest) -> LoadTestRepositoryResult<()>;

    /// Finds a run by id.
    async fn find(&self, id: LoadTestId) -> LoadTestRepositoryResult<Option<LoadTest>>;

    /// Lists runs, newest first, optionally restricted to one owner.
    async fn list(&self, owner: Option<OwnerId>) -> LoadTestRepositoryResult<Vec<LoadTest>>;

    /// Deletes a run, returning it when it existed.
    async fn delete(&self, id: LoadTestId) -> LoadTestRepositoryResult<Option<LoadTest>>;
}

/// Errors returned by load-test repositories.
#[derive(Debug, Clone, Error)]
pub enum LoadTestRepositoryError {
    /// A run with the same id already exists.
    #[error("duplicate load test: {0}")]
    Duplicate(LoadTestId),

    /// The run does not exist.
    #[error("load test not found: {0}")]
    NotFound(LoadTestId),

    /// Persistence failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LoadTestRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

//! Repository port for schedule persistence.

use crate::schedule::domain::{Schedule, ScheduleId};
use crate::task::domain::OwnerId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for schedule repository operations.
pub type ScheduleRepositoryResult<T> = Result<T, ScheduleRepositoryError>;

/// Schedule persistence contract.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Stores a new schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleRepositoryError::DuplicateSchedule`] when the id is
    /// already stored.
    async fn store(&self, schedule: &Schedule) -> ScheduleRepositoryResult<()>;

    /// Finds a schedule by id.
    async fn find(&self, id: ScheduleId) -> ScheduleRepositoryResult<Option<Schedule>>;

    /// Lists schedules, newest first, optionally restricted to one owner.
    async fn list(&self, owner: Option<OwnerId>) -> ScheduleRepositoryResult<Vec<Schedule>>;

    /// Deletes a schedule, returning it when it existed.
    async fn delete(&self, id: ScheduleId) -> ScheduleRepositoryResult<Option<Schedule>>;
}

/// Errors returned by schedule repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ScheduleRepositoryError {
    /// A schedule with the same identifier already exists.
    #[error("duplicate schedule identifier: {0}")]
    DuplicateSchedule(ScheduleId),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ScheduleRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

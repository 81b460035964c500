//! Secret store and trigger registry used by schedules.

use crate::schedule::domain::{ScheduleId, ScheduledScan};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for schedule gateway operations.
pub type ScheduleGatewayResult<T> = Result<T, ScheduleGatewayError>;

/// External capabilities backing a schedule.
#[async_trait]
pub trait ScheduleGateway: Send + Sync {
    /// Stores a write-only secret, overwriting any previous value.
    async fn put_secret(&self, name: &str, value: &str) -> ScheduleGatewayResult<()>;

    /// Deletes a secret.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleGatewayError::NotFound`] when no such secret exists.
    async fn delete_secret(&self, name: &str) -> ScheduleGatewayResult<()>;

    /// Registers a trigger that delivers `payload` on `expression`.
    async fn register_trigger(
        &self,
        id: ScheduleId,
        expression: &str,
        payload: &ScheduledScan,
    ) -> ScheduleGatewayResult<()>;

    /// Removes a trigger and its target binding.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleGatewayError::NotFound`] when no such trigger exists.
    async fn deregister_trigger(&self, id: ScheduleId) -> ScheduleGatewayResult<()>;
}

/// Errors returned by schedule gateway implementations.
#[derive(Debug, Clone, Error)]
pub enum ScheduleGatewayError {
    /// The named secret or trigger does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Backend failure.
    #[error("schedule gateway error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl ScheduleGatewayError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}

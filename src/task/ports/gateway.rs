//! Outbound capabilities of the external worker platform.

use crate::task::domain::{DispatchPayload, LogStreamRef};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for worker gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Delivery report returned by [`WorkerGateway::enqueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueReceipt {
    /// Whether the queue accepted the message.
    pub accepted: bool,
    /// Queue message identifier, when assigned.
    pub message_id: Option<String>,
}

impl EnqueueReceipt {
    /// Receipt for an accepted message.
    #[must_use]
    pub fn accepted(message_id: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message_id: Some(message_id.into()),
        }
    }

    /// Receipt for a rejected message.
    #[must_use]
    pub const fn rejected() -> Self {
        Self {
            accepted: false,
            message_id: None,
        }
    }
}

/// Downstream trigger nudged after dispatch or completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NextStep {
    /// Poll the queue and clone newly submitted repositories.
    CheckAndClone,
    /// Start the next scan for already cloned repositories.
    CheckAndScan,
}

/// One worker log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Event time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Log message.
    pub message: String,
}

/// Worker platform contract.
#[async_trait]
pub trait WorkerGateway: Send + Sync {
    /// Submits a payload to the worker queue.
    async fn enqueue(&self, payload: &DispatchPayload) -> GatewayResult<EnqueueReceipt>;

    /// Invokes the listener function directly with a payload.
    async fn invoke_listener(&self, payload: &DispatchPayload) -> GatewayResult<()>;

    /// Fires a fire-and-forget nudge to a downstream trigger.
    async fn notify_next(&self, step: NextStep) -> GatewayResult<()>;

    /// Reads the log events of a worker stream.
    async fn fetch_log_lines(&self, stream: &LogStreamRef) -> GatewayResult<Vec<LogLine>>;
}

/// Errors returned by gateway adapters.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The backing service failed.
    #[error("worker gateway error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl GatewayError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}

//! Recording worker gateway for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{DispatchPayload, LogStreamRef},
    ports::{EnqueueReceipt, GatewayError, GatewayResult, LogLine, NextStep, WorkerGateway},
};

/// Worker gateway that records every call.
///
/// Enqueues are accepted unless [`Self::reject_enqueues`] was called.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkerGateway {
    state: Arc<RwLock<GatewayState>>,
}

#[derive(Debug, Default)]
struct GatewayState {
    reject: bool,
    fail_notifications: bool,
    enqueued: Vec<DispatchPayload>,
    invoked: Vec<DispatchPayload>,
    notifications: Vec<NextStep>,
    logs: HashMap<LogStreamRef, Vec<LogLine>>,
}

impl InMemoryWorkerGateway {
    /// Creates a gateway that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent enqueues report a failed delivery.
    pub fn reject_enqueues(&self) {
        if let Ok(mut state) = self.state.write() {
            state.reject = true;
        }
    }

    /// Makes subsequent nudges fail.
    pub fn fail_notifications(&self) {
        if let Ok(mut state) = self.state.write() {
            state.fail_notifications = true;
        }
    }

    /// Seeds log events for a stream.
    pub fn seed_logs(&self, stream: LogStreamRef, lines: Vec<LogLine>) {
        if let Ok(mut state) = self.state.write() {
            state.logs.insert(stream, lines);
        }
    }

    /// Payloads submitted to the queue.
    #[must_use]
    pub fn enqueued(&self) -> Vec<DispatchPayload> {
        self.state
            .read()
            .map(|state| state.enqueued.clone())
            .unwrap_or_default()
    }

    /// Payloads sent straight to the listener.
    #[must_use]
    pub fn invoked(&self) -> Vec<DispatchPayload> {
        self.state
            .read()
            .map(|state| state.invoked.clone())
            .unwrap_or_default()
    }

    /// Nudges fired so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<NextStep> {
        self.state
            .read()
            .map(|state| state.notifications.clone())
            .unwrap_or_default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> GatewayError {
    GatewayError::backend(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl WorkerGateway for InMemoryWorkerGateway {
    async fn enqueue(&self, payload: &DispatchPayload) -> GatewayResult<EnqueueReceipt> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.reject {
            return Ok(EnqueueReceipt::rejected());
        }
        state.enqueued.push(payload.clone());
        Ok(EnqueueReceipt::accepted(payload.deduplication_id()))
    }

    async fn invoke_listener(&self, payload: &DispatchPayload) -> GatewayResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.invoked.push(payload.clone());
        Ok(())
    }

    async fn notify_next(&self, step: NextStep) -> GatewayResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.fail_notifications {
            return Err(GatewayError::backend(std::io::Error::other(
                "trigger unavailable",
            )));
        }
        state.notifications.push(step);
        Ok(())
    }

    async fn fetch_log_lines(&self, stream: &LogStreamRef) -> GatewayResult<Vec<LogLine>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.logs.get(stream).cloned().unwrap_or_default())
    }
}

//! In-memory secret store and trigger registry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::schedule::{
    domain::{ScheduleId, ScheduledScan},
    ports::{ScheduleGateway, ScheduleGatewayError, ScheduleGatewayResult},
};

/// Trigger registered with [`InMemoryScheduleGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredTrigger {
    /// Trigger expression.
    pub expression: String,
    /// Delivered payload.
    pub payload: ScheduledScan,
}

/// Secret store and trigger registry kept in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScheduleGateway {
    state: Arc<RwLock<GatewayState>>,
}

#[derive(Debug, Default)]
struct GatewayState {
    secrets: HashMap<String, String>,
    triggers: HashMap<ScheduleId, RegisteredTrigger>,
}

impl InMemoryScheduleGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored value of a secret.
    #[must_use]
    pub fn secret(&self, name: &str) -> Option<String> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.secrets.get(name).cloned())
    }

    /// Returns the trigger registered for a schedule.
    #[must_use]
    pub fn trigger(&self, id: ScheduleId) -> Option<RegisteredTrigger> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.triggers.get(&id).cloned())
    }
}

fn lock_error(err: impl std::fmt::Display) -> ScheduleGatewayError {
    ScheduleGatewayError::backend(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ScheduleGateway for InMemoryScheduleGateway {
    async fn put_secret(&self, name: &str, value: &str) -> ScheduleGatewayResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.secrets.insert(name.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete_secret(&self, name: &str) -> ScheduleGatewayResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state
            .secrets
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ScheduleGatewayError::NotFound(name.to_owned()))
    }

    async fn register_trigger(
        &self,
        id: ScheduleId,
        expression: &str,
        payload: &ScheduledScan,
    ) -> ScheduleGatewayResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.triggers.insert(
            id,
            RegisteredTrigger {
                expression: expression.to_owned(),
                payload: payload.clone(),
            },
        );
        Ok(())
    }

    async fn deregister_trigger(&self, id: ScheduleId) -> ScheduleGatewayResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state
            .triggers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ScheduleGatewayError::NotFound(id.to_string()))
    }
}

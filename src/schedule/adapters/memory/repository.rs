//! In-memory schedule store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::schedule::{
    domain::{Schedule, ScheduleId},
    ports::{ScheduleRepository, ScheduleRepositoryError, ScheduleRepositoryResult},
};
use crate::task::domain::OwnerId;

/// Thread-safe in-memory schedule repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScheduleRepository {
    state: Arc<RwLock<HashMap<ScheduleId, Schedule>>>,
}

impl InMemoryScheduleRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> ScheduleRepositoryError {
    ScheduleRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ScheduleRepository for InMemoryScheduleRepository {
    async fn store(&self, schedule: &Schedule) -> ScheduleRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.contains_key(&schedule.id()) {
            return Err(ScheduleRepositoryError::DuplicateSchedule(schedule.id()));
        }
        state.insert(schedule.id(), schedule.clone());
        Ok(())
    }

    async fn find(&self, id: ScheduleId) -> ScheduleRepositoryResult<Option<Schedule>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.get(&id).cloned())
    }

    async fn list(&self, owner: Option<OwnerId>) -> ScheduleRepositoryResult<Vec<Schedule>> {
        let state = self.state.read().map_err(lock_error)?;
        let mut schedules: Vec<Schedule> = state
            .values()
            .filter(|schedule| owner.is_none_or(|id| schedule.owner() == id))
            .cloned()
            .collect();
        schedules.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        Ok(schedules)
    }

    async fn delete(&self, id: ScheduleId) -> ScheduleRepositoryResult<Option<Schedule>> {
        let mut state = self.state.write().map_err(lock_error)?;
        Ok(state.remove(&id))
    }
}

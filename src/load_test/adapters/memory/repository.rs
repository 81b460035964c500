//! In-memory load-test store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::load_test::{
    domain::{LoadTest, LoadTestId},
    ports::{LoadTestRepository, LoadTestRepositoryError, LoadTestRepositoryResult},
};
use crate::task::domain::OwnerId;

/// Thread-safe in-memory load-test repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoadTestRepository {
    state: Arc<RwLock<HashMap<LoadTestId, LoadTest>>>,
}

impl InMemoryLoadTestRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> LoadTestRepositoryError {
    LoadTestRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl LoadTestRepository for InMemoryLoadTestRepository {
    async fn store(&self, run: &LoadTest) -> LoadTestRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.contains_key(&run.id()) {
            return Err(LoadTestRepositoryError::Duplicate(run.id()));
        }
        state.insert(run.id(), run.clone());
        Ok(())
    }

    async fn update(&self, run: &LoadTest) -> LoadTestRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let stored = state
            .get_mut(&run.id())
            .ok_or(LoadTestRepositoryError::NotFound(run.id()))?;
        *stored = run.clone();
        Ok(())
    }

    async fn find(&self, id: LoadTestId) -> LoadTestRepositoryResult<Option<LoadTest>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.get(&id).cloned())
    }

    async fn list(&self, owner: Option<OwnerId>) -> LoadTestRepositoryResult<Vec<LoadTest>> {
        let state = self.state.read().map_err(lock_error)?;
        let mut runs: Vec<LoadTest> = state
            .values()
            .filter(|run| owner.is_none_or(|id| run.owner() == Some(id)))
            .cloned()
            .collect();
        runs.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        Ok(runs)
    }

    async fn delete(&self, id: LoadTestId) -> LoadTestRepositoryResult<Option<LoadTest>> {
        let mut state = self.state.write().map_err(lock_error)?;
        Ok(state.remove(&id))
    }
}

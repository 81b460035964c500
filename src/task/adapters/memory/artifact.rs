//! In-memory durable report storage.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::task::{
    domain::{ArtifactLocator, TaskId},
    ports::{ArtifactCategory, ArtifactStore, ArtifactStoreError, ArtifactStoreResult, ArtifactUpload},
};

/// Artifact store keeping object keys in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactStore {
    state: Arc<RwLock<ArtifactState>>,
}

#[derive(Debug, Default)]
struct ArtifactState {
    missing: bool,
    uploads: Vec<ArtifactUpload>,
    objects: BTreeSet<String>,
    deleted: Vec<String>,
}

impl InMemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent uploads fail as if the worker wrote no report.
    pub fn fail_uploads(&self) {
        if let Ok(mut state) = self.state.write() {
            state.missing = true;
        }
    }

    /// Upload attempts, successful or not.
    #[must_use]
    pub fn uploads(&self) -> Vec<ArtifactUpload> {
        self.state
            .read()
            .map(|state| state.uploads.clone())
            .unwrap_or_default()
    }

    /// Object keys currently stored.
    #[must_use]
    pub fn objects(&self) -> Vec<String> {
        self.state
            .read()
            .map(|state| state.objects.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Object keys deleted so far.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        self.state
            .read()
            .map(|state| state.deleted.clone())
            .unwrap_or_default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> ArtifactStoreError {
    ArtifactStoreError::backend(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn upload(&self, upload: &ArtifactUpload) -> ArtifactStoreResult<ArtifactLocator> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.uploads.push(upload.clone());
        let key = upload.category.object_key(upload.task_id, upload.subtask_id);
        if state.missing {
            return Err(ArtifactStoreError::MissingReport(key));
        }
        state.objects.insert(key.clone());
        Ok(ArtifactLocator::new(key))
    }

    async fn presigned_link(
        &self,
        locator: &ArtifactLocator,
        expires_in: Duration,
    ) -> ArtifactStoreResult<String> {
        let state = self.state.read().map_err(lock_error)?;
        if !state.objects.contains(locator.as_str()) {
            return Err(ArtifactStoreError::MissingReport(locator.to_string()));
        }
        Ok(format!(
            "memory://{}?expires={}",
            locator.as_str(),
            expires_in.as_secs()
        ))
    }

    async fn delete(&self, locator: &ArtifactLocator) -> ArtifactStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.objects.remove(locator.as_str());
        state.deleted.push(locator.to_string());
        Ok(())
    }

    async fn delete_media(&self, task_id: TaskId) -> ArtifactStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let prefix = ArtifactCategory::AutotestMedia.object_key(task_id, None);
        let removed: Vec<String> = state
            .objects
            .iter()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();
        for key in removed {
            state.objects.remove(&key);
            state.deleted.push(key);
        }
        Ok(())
    }
}

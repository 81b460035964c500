//! Report store kept in memory.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use crate::load_test::{
    domain::LoadTestId,
    ports::{ReportStore, ReportStoreError, ReportStoreResult},
};

/// Media directory kept in memory; paths are relative to the media root.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReportStore {
    state: Arc<RwLock<ReportState>>,
}

#[derive(Debug, Default)]
struct ReportState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
}

impl InMemoryReportStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file, as an upload would.
    pub fn seed(&self, path: &str, contents: &[u8]) {
        if let Ok(mut state) = self.state.write() {
            if let Some((dir, _)) = path.split_once('/') {
                state.dirs.insert(dir.to_owned());
            }
            state.files.insert(path.to_owned(), contents.to_vec());
        }
    }

    /// Returns the contents of a file as UTF-8 text.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<String> {
        self.state.read().ok().and_then(|state| {
            state
                .files
                .get(path)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        })
    }

    /// Returns whether a directory exists.
    #[must_use]
    pub fn has_dir(&self, path: &str) -> bool {
        self.state
            .read()
            .is_ok_and(|state| state.dirs.contains(path))
    }
}

fn lock_error(err: impl std::fmt::Display) -> ReportStoreError {
    ReportStoreError::io(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn prepare(&self, id: LoadTestId) -> ReportStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.dirs.insert(id.to_string());
        Ok(())
    }

    async fn write(&self, id: LoadTestId, name: &str, contents: &[u8]) -> ReportStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let dir = id.to_string();
        if !state.dirs.contains(&dir) {
            return Err(ReportStoreError::io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{dir} does not exist"),
            )));
        }
        state.files.insert(format!("{dir}/{name}"), contents.to_vec());
        Ok(())
    }

    async fn remove_dir(&self, path: &str) -> ReportStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let prefix = format!("{path}/");
        state.dirs.remove(path);
        state.files.retain(|file, _| !file.starts_with(&prefix));
        Ok(())
    }
}

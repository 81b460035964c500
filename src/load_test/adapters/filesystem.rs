//! Media directory on local disk.
//!
//! Each run writes into `{media_root}/{id}/`; uploaded plans live in
//! timestamped directories beside them. Access goes through a capability
//! directory opened at the media root.

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io::ErrorKind;
use std::sync::Arc;

use crate::load_test::{
    domain::LoadTestId,
    ports::{ReportStore, ReportStoreError, ReportStoreResult},
};

/// Report store rooted at the media directory.
#[derive(Debug, Clone)]
pub struct FsReportStore {
    root: Arc<str>,
}

impl FsReportStore {
    /// Creates an adapter rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: Arc::from(root.into()),
        }
    }

    async fn run_blocking<F, T>(&self, f: F) -> ReportStoreResult<T>
    where
        F: FnOnce(&Dir) -> std::io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || {
            let dir = Dir::open_ambient_dir(&*root, ambient_authority())?;
            f(&dir)
        })
        .await
        .map_err(|err| ReportStoreError::io(std::io::Error::other(err)))?
        .map_err(ReportStoreError::io)
    }
}

#[async_trait]
impl ReportStore for FsReportStore {
    async fn prepare(&self, id: LoadTestId) -> ReportStoreResult<()> {
        self.run_blocking(move |dir| dir.create_dir_all(id.to_string()))
            .await
    }

    async fn write(&self, id: LoadTestId, name: &str, contents: &[u8]) -> ReportStoreResult<()> {
        let path = format!("{id}/{name}");
        let bytes = contents.to_vec();
        self.run_blocking(move |dir| dir.write(path, bytes)).await
    }

    async fn remove_dir(&self, path: &str) -> ReportStoreResult<()> {
        let target = path.to_owned();
        self.run_blocking(move |dir| match dir.remove_dir_all(&target) {
            Ok(()) => {
                tracing::info!(path = %target, "removed load-test media");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        })
        .await
    }
}

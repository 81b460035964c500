//! Worker workspace on a shared filesystem volume.
//!
//! Workers clone into `{root}/{task}/{repository}` and write their reports
//! there; dynamic scans write to `{root}/{task}/wrk`. All access goes
//! through a capability directory opened at the configured root.

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io::ErrorKind;
use std::sync::Arc;

use crate::task::{
    domain::{ReportFormat, ReportKind, ResultDocument, TaskId},
    ports::{ResultRequest, WorkspaceError, WorkspaceResult, WorkspaceStore},
};

const SAST_REPORT: &str = "gl-sast-report.json";
const SECRET_REPORT: &str = "gl-secret-detection-report.json";
const CLOC_REPORT: &str = "cloc_summary.json";
const CLOC_COMPARISON_REPORT: &str = "cloc_comparison_summary.json";
const DAST_REPORT: &str = "gl-dast-report.json";
const DAST_DIR: &str = "wrk";

/// Workspace adapter reading reports from the shared volume.
#[derive(Debug, Clone)]
pub struct FsWorkspaceStore {
    root: Arc<str>,
}

impl FsWorkspaceStore {
    /// Creates an adapter rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: Arc::from(root.into()),
        }
    }

    async fn run_blocking<F, T>(&self, f: F) -> WorkspaceResult<T>
    where
        F: FnOnce(&Dir) -> WorkspaceResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || {
            let dir = Dir::open_ambient_dir(&*root, ambient_authority())
                .map_err(WorkspaceError::io)?;
            f(&dir)
        })
        .await
        .map_err(|err| WorkspaceError::io(std::io::Error::other(err)))?
    }
}

fn candidates(request: &ResultRequest) -> WorkspaceResult<Vec<(String, ReportFormat)>> {
    let task_dir = request.task_id.to_string();
    if request.kind == ReportKind::Dast {
        return Ok(vec![(
            format!("{task_dir}/{DAST_DIR}/{DAST_REPORT}"),
            ReportFormat::Dast,
        )]);
    }

    let repository = request
        .source
        .as_ref()
        .ok_or_else(|| {
            WorkspaceError::io(std::io::Error::new(
                ErrorKind::InvalidInput,
                "repository reports need a source locator",
            ))
        })?
        .repository_name()
        .map_err(|err| WorkspaceError::io(std::io::Error::new(ErrorKind::InvalidInput, err)))?;
    let in_repo = |file: &str| format!("{task_dir}/{repository}/{file}");

    Ok(match request.kind {
        ReportKind::Sast => vec![(in_repo(SAST_REPORT), ReportFormat::Sast)],
        ReportKind::SecretDetection => {
            vec![(in_repo(SECRET_REPORT), ReportFormat::SecretDetection)]
        }
        ReportKind::Cloc => vec![
            (in_repo(CLOC_COMPARISON_REPORT), ReportFormat::ClocComparison),
            (in_repo(CLOC_REPORT), ReportFormat::ClocSummary),
        ],
        ReportKind::Dast => Vec::new(),
    })
}

fn read_report(dir: &Dir, path: &str, format: ReportFormat) -> WorkspaceResult<Option<ResultDocument>> {
    let contents = match dir.read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(WorkspaceError::io(err)),
    };
    if contents.trim().is_empty() {
        return Ok(None);
    }
    let body = serde_json::from_str(&contents).map_err(|err| WorkspaceError::UnreadableReport {
        path: path.to_owned(),
        source: Arc::new(err),
    })?;
    Ok(Some(ResultDocument { format, body }))
}

#[async_trait]
impl WorkspaceStore for FsWorkspaceStore {
    async fn fetch_result(
        &self,
        request: &ResultRequest,
    ) -> WorkspaceResult<Option<ResultDocument>> {
        let paths = candidates(request)?;
        let task_id = request.task_id;
        let document = self
            .run_blocking(move |dir| {
                for (path, format) in &paths {
                    if dir.exists(path) {
                        return read_report(dir, path, *format);
                    }
                }
                Ok(None)
            })
            .await?;
        if document.is_none() {
            tracing::warn!(task_id = %task_id, "result file not found");
        }
        Ok(document)
    }

    async fn remove_workspace(&self, task_id: TaskId) -> WorkspaceResult<()> {
        self.run_blocking(move |dir| match dir.remove_dir_all(task_id.to_string()) {
            Ok(()) => {
                tracing::info!(task_id = %task_id, "removed task workspace");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(WorkspaceError::io(err)),
        })
        .await
    }
}

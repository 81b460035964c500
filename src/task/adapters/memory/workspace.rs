//! In-memory worker workspace.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{ReportKind, ResultDocument, TaskId},
    ports::{ResultRequest, WorkspaceError, WorkspaceResult, WorkspaceStore},
};

/// Workspace holding seeded report documents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkspaceStore {
    state: Arc<RwLock<WorkspaceState>>,
}

#[derive(Debug, Default)]
struct WorkspaceState {
    reports: HashMap<(TaskId, ReportKind), ResultDocument>,
    removed: Vec<TaskId>,
}

impl InMemoryWorkspaceStore {
    /// Creates an empty workspace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `document` available for `task_id` and `kind`.
    pub fn seed_report(&self, task_id: TaskId, kind: ReportKind, document: ResultDocument) {
        if let Ok(mut state) = self.state.write() {
            state.reports.insert((task_id, kind), document);
        }
    }

    /// Task directories removed so far, in call order.
    #[must_use]
    pub fn removed(&self) -> Vec<TaskId> {
        self.state
            .read()
            .map(|state| state.removed.clone())
            .unwrap_or_default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> WorkspaceError {
    WorkspaceError::io(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl WorkspaceStore for InMemoryWorkspaceStore {
    async fn fetch_result(
        &self,
        request: &ResultRequest,
    ) -> WorkspaceResult<Option<ResultDocument>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.reports.get(&(request.task_id, request.kind)).cloned())
    }

    async fn remove_workspace(&self, task_id: TaskId) -> WorkspaceResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.reports.retain(|(owner, _), _| *owner != task_id);
        state.removed.push(task_id);
        Ok(())
    }
}

//! In-memory task store for lifecycle tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{
        Finding, FindingId, RollupDecision, RollupOutcome, SubTask, SubTaskId, Task, TaskId,
        TaskStatus, decide_rollup,
    },
    ports::{TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
///
/// A single write lock covers the whole store, which also serialises
/// rollups for the same task.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
    subtasks: HashMap<SubTaskId, SubTask>,
    subtask_order: HashMap<TaskId, Vec<SubTaskId>>,
    findings: Vec<Finding>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl InMemoryTaskState {
    fn subtasks_of(&self, task_id: TaskId) -> Vec<SubTask> {
        self.subtask_order
            .get(&task_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.subtasks.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn lock_error(err: impl Display) -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store_task(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn store_subtask(&self, subtask: &SubTask) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if !state.tasks.contains_key(&subtask.task_id()) {
            return Err(TaskRepositoryError::NotFound(subtask.task_id()));
        }
        state
            .subtask_order
            .entry(subtask.task_id())
            .or_default()
            .push(subtask.id());
        state.subtasks.insert(subtask.id(), subtask.clone());
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let stored = state
            .tasks
            .get_mut(&task.id())
            .ok_or(TaskRepositoryError::NotFound(task.id()))?;
        *stored = task.clone();
        Ok(())
    }

    async fn find_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, filter: TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(lock_error)?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        tasks.sort_by(|left, right| {
            right
                .created_at()
                .cmp(&left.created_at())
                .then_with(|| right.id().cmp(&left.id()))
        });
        Ok(tasks)
    }

    async fn delete_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let mut state = self.state.write().map_err(lock_error)?;
        let Some(task) = state.tasks.remove(&id) else {
            return Ok(None);
        };
        for subtask_id in state.subtask_order.remove(&id).unwrap_or_default() {
            state.subtasks.remove(&subtask_id);
        }
        state.findings.retain(|finding| finding.owner().task_id() != id);
        Ok(Some(task))
    }

    async fn find_subtask(&self, id: SubTaskId) -> TaskRepositoryResult<Option<SubTask>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.subtasks.get(&id).cloned())
    }

    async fn update_subtask(&self, subtask: &SubTask) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let stored = state
            .subtasks
            .get_mut(&subtask.id())
            .ok_or(TaskRepositoryError::SubTaskNotFound(subtask.id()))?;
        *stored = subtask.clone();
        Ok(())
    }

    async fn claim_subtask_completion(
        &self,
        id: SubTaskId,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<Option<TaskStatus>> {
        let mut state = self.state.write().map_err(lock_error)?;
        let subtask = state
            .subtasks
            .get_mut(&id)
            .ok_or(TaskRepositoryError::SubTaskNotFound(id))?;
        let previous = subtask.status();
        if previous == TaskStatus::Completed {
            return Ok(None);
        }
        subtask.set_status_at(TaskStatus::Completed, now);
        Ok(Some(previous))
    }

    async fn claim_task_completion(
        &self,
        id: TaskId,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<Option<TaskStatus>> {
        let mut state = self.state.write().map_err(lock_error)?;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or(TaskRepositoryError::NotFound(id))?;
        let previous = task.status();
        if previous == TaskStatus::Completed {
            return Ok(None);
        }
        task.set_status_at(TaskStatus::Completed, now);
        Ok(Some(previous))
    }

    async fn list_subtasks(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<SubTask>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.subtasks_of(task_id))
    }

    async fn store_findings(&self, findings: &[Finding]) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if let Some(orphan) = findings
            .iter()
            .map(|finding| finding.owner().task_id())
            .find(|task_id| !state.tasks.contains_key(task_id))
        {
            return Err(TaskRepositoryError::NotFound(orphan));
        }
        state.findings.extend_from_slice(findings);
        Ok(())
    }

    async fn list_findings(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<Finding>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .findings
            .iter()
            .filter(|finding| finding.owner().task_id() == task_id)
            .cloned()
            .collect())
    }

    async fn update_finding_note(
        &self,
        id: FindingId,
        note: &str,
    ) -> TaskRepositoryResult<Finding> {
        let mut state = self.state.write().map_err(lock_error)?;
        let finding = state
            .findings
            .iter_mut()
            .find(|finding| finding.id() == id)
            .ok_or(TaskRepositoryError::FindingNotFound(id))?;
        finding.set_note(note);
        Ok(finding.clone())
    }

    async fn roll_up(
        &self,
        task_id: TaskId,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<RollupOutcome> {
        let mut state = self.state.write().map_err(lock_error)?;
        let decision = decide_rollup(
            state
                .subtasks_of(task_id)
                .iter()
                .map(SubTask::status),
        );
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or(TaskRepositoryError::NotFound(task_id))?;
        let previous = task.status();
        if let RollupDecision::Set(status) = decision {
            task.set_status_at(status, now);
        }
        Ok(RollupOutcome {
            task_id,
            previous,
            decision,
        })
    }
}

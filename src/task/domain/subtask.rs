//! Variant-specific unit of work under a task.

use super::{SubTaskId, TaskId, TaskStatus, Variant};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Log group and stream a worker writes a subtask's output to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogStreamRef {
    /// Log group name.
    pub group: String,
    /// Log stream name within the group.
    pub stream: String,
}

impl LogStreamRef {
    /// Creates a log stream reference.
    #[must_use]
    pub fn new(group: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            stream: stream.into(),
        }
    }
}

/// Subtask entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    id: SubTaskId,
    task_id: TaskId,
    variant: Variant,
    status: TaskStatus,
    log_stream: Option<LogStreamRef>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted subtask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSubTaskData {
    /// Persisted subtask identifier.
    pub id: SubTaskId,
    /// Owning task.
    pub task_id: TaskId,
    /// Persisted variant.
    pub variant: Variant,
    /// Persisted status.
    pub status: TaskStatus,
    /// Persisted log stream, if any.
    pub log_stream: Option<LogStreamRef>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl SubTask {
    /// Creates a pending subtask for `task_id`.
    #[must_use]
    pub fn new(task_id: TaskId, variant: Variant, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: SubTaskId::new(),
            task_id,
            variant,
            status: TaskStatus::Pending,
            log_stream: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a subtask from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedSubTaskData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            variant: data.variant,
            status: data.status,
            log_stream: data.log_stream,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the subtask identifier.
    #[must_use]
    pub const fn id(&self) -> SubTaskId {
        self.id
    }

    /// Returns the owning task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the variant discriminator.
    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.variant
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the worker log stream, if reported.
    #[must_use]
    pub const fn log_stream(&self) -> Option<&LogStreamRef> {
        self.log_stream.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Path of the browser report copied into media storage.
    ///
    /// Only browser variants produce a media report.
    #[must_use]
    pub fn media_report_path(&self) -> Option<String> {
        matches!(self.variant, Variant::Browser(_))
            .then(|| format!("/api/media/{}/{}/index.html", self.task_id, self.id))
    }

    /// Applies a status reported by a worker.
    pub fn update_status(&mut self, status: TaskStatus, clock: &impl Clock) {
        self.status = status;
        self.updated_at = clock.utc();
    }

    /// Sets the status with an explicit mutation time.
    pub const fn set_status_at(&mut self, status: TaskStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
    }

    /// Records the log stream a worker reported.
    pub fn attach_log_stream(&mut self, log_stream: LogStreamRef, clock: &impl Clock) {
        self.log_stream = Some(log_stream);
        self.updated_at = clock.utc();
    }
}

//! Result rows produced by completion handling.

use super::{FindingId, SubTaskId, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Severity bucket counted as critical on the dashboard.
pub const SEVERITY_CRITICAL: &str = "Critical";
/// Severity bucket counted as high risk on the dashboard.
pub const SEVERITY_HIGH: &str = "High";

/// Record a finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FindingOwner {
    /// Finding attached directly to a task (non-fan-out modules).
    Task {
        /// Owning task.
        task_id: TaskId,
    },
    /// Finding attached to a subtask.
    SubTask {
        /// Task owning the subtask.
        task_id: TaskId,
        /// Owning subtask.
        subtask_id: SubTaskId,
    },
}

impl FindingOwner {
    /// Returns the task the finding ultimately belongs to.
    #[must_use]
    pub const fn task_id(self) -> TaskId {
        match self {
            Self::Task { task_id } | Self::SubTask { task_id, .. } => task_id,
        }
    }

    /// Returns the owning subtask, if any.
    #[must_use]
    pub const fn subtask_id(self) -> Option<SubTaskId> {
        match self {
            Self::Task { .. } => None,
            Self::SubTask { subtask_id, .. } => Some(subtask_id),
        }
    }
}

/// Security finding reported by a static or dynamic scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// Finding description.
    pub description: Option<String>,
    /// Scanner message; the deduplication key for dynamic scans.
    pub message: Option<String>,
    /// Severity label as reported (`Critical`, `High`, ...).
    pub severity: Option<String>,
    /// Scanner confidence.
    pub confidence: Option<String>,
    /// Suggested remediation.
    pub solution: Option<String>,
    /// Associated CVE identifier.
    pub cve: Option<String>,
    /// File path or comma-joined URLs the finding was observed at.
    pub location: Option<String>,
    /// Start line within `location`.
    pub line: Option<String>,
    /// Deep link into the source-control engine.
    pub link: Option<String>,
    /// Scan start time reported by the worker.
    pub scan_started_at: Option<String>,
    /// Scan end time reported by the worker.
    pub scan_ended_at: Option<String>,
}

/// Line-count row produced by a code counting run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCount {
    /// Counted language; absent for comparison totals.
    pub language: Option<String>,
    /// Comparison action (`added`, `removed`, `modified`, `same`).
    pub action: Option<String>,
    /// Row title; `SUM` for comparison totals.
    pub title: Option<String>,
    /// Number of files.
    pub files: u64,
    /// Blank lines.
    pub blank: u64,
    /// Comment lines.
    pub comment: u64,
    /// Code lines.
    pub code: u64,
}

/// Structured content of a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingBody {
    /// Security finding.
    Vulnerability(Vulnerability),
    /// Line-count row.
    LineCount(LineCount),
}

/// Finding (result row) entity.
///
/// Findings are append-only; only the note is editable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    id: FindingId,
    owner: FindingOwner,
    body: FindingBody,
    note: String,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedFindingData {
    /// Persisted finding identifier.
    pub id: FindingId,
    /// Persisted owner.
    pub owner: FindingOwner,
    /// Persisted content.
    pub body: FindingBody,
    /// Persisted note.
    pub note: String,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Finding {
    /// Creates a finding with an empty note.
    #[must_use]
    pub fn new(owner: FindingOwner, body: FindingBody, clock: &impl Clock) -> Self {
        Self {
            id: FindingId::new(),
            owner,
            body,
            note: String::new(),
            created_at: clock.utc(),
        }
    }

    /// Reconstructs a finding from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedFindingData) -> Self {
        Self {
            id: data.id,
            owner: data.owner,
            body: data.body,
            note: data.note,
            created_at: data.created_at,
        }
    }

    /// Returns the finding identifier.
    #[must_use]
    pub const fn id(&self) -> FindingId {
        self.id
    }

    /// Returns the owning record.
    #[must_use]
    pub const fn owner(&self) -> FindingOwner {
        self.owner
    }

    /// Returns the structured content.
    #[must_use]
    pub const fn body(&self) -> &FindingBody {
        &self.body
    }

    /// Returns the user note.
    #[must_use]
    pub fn note(&self) -> &str {
        &self.note
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the severity label of security findings.
    #[must_use]
    pub fn severity(&self) -> Option<&str> {
        match &self.body {
            FindingBody::Vulnerability(vulnerability) => vulnerability.severity.as_deref(),
            FindingBody::LineCount(_) => None,
        }
    }

    /// Replaces the user note.
    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }
}

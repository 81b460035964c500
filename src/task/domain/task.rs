//! Task aggregate root and module profiles.

use super::{GitEngine, OwnerId, ScanModule, SourceLocator, TaskDomainError, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Run type of a scanning task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanRunType {
    /// Static application security testing.
    #[default]
    Sast,
    /// Dynamic application security testing.
    Dast,
}

impl ScanRunType {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sast => "SAST",
            Self::Dast => "DAST",
        }
    }
}

impl TryFrom<&str> for ScanRunType {
    type Error = TaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "SAST" => Ok(Self::Sast),
            "DAST" => Ok(Self::Dast),
            _ => Err(TaskDomainError::InvalidRunType {
                module: ScanModule::Scanning,
                run_type: value.to_owned(),
            }),
        }
    }
}

/// Optional revision comparison for a code-line count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClocComparison {
    /// First branch to compare.
    pub compared_branch1: Option<String>,
    /// Second branch to compare.
    pub compared_branch2: Option<String>,
    /// First commit to compare.
    pub commit_id1: Option<String>,
    /// Second commit to compare.
    pub commit_id2: Option<String>,
}

impl ClocComparison {
    /// Returns `true` when both branches or both commits are present.
    #[must_use]
    pub fn is_comparison(&self) -> bool {
        let both = |first: &Option<String>, second: &Option<String>| {
            first.as_deref().is_some_and(|value| !value.is_empty())
                && second.as_deref().is_some_and(|value| !value.is_empty())
        };
        both(&self.compared_branch1, &self.compared_branch2) || both(&self.commit_id1, &self.commit_id2)
    }
}

/// Module-specific attributes of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "module", rename_all = "snake_case")]
pub enum TaskProfile {
    /// Static analysis of a git repository.
    Scanning {
        /// Engine hosting the repository, used for deep links.
        git_engine: GitEngine,
        /// Requested run type.
        run_type: ScanRunType,
        /// User-supplied exclude paths, before defaults are appended.
        exclude_path: Option<String>,
    },
    /// Browser test suite run.
    Autotest,
    /// Code-line count.
    Cloc {
        /// Languages to include (`*` for all).
        include_lang: String,
        /// Directories to exclude (`*` for none).
        exclude_dir: String,
        /// Optional revision comparison.
        comparison: ClocComparison,
    },
    /// Dynamic scan of a target URL.
    Dast {
        /// Whether an active (full) scan was requested.
        full_scan: bool,
        /// Path on the target to scan from.
        dast_path: Option<String>,
        /// Uploaded scan definition file.
        filename: Option<String>,
    },
}

impl TaskProfile {
    /// Returns the module the profile belongs to.
    #[must_use]
    pub const fn module(&self) -> ScanModule {
        match self {
            Self::Scanning { .. } => ScanModule::Scanning,
            Self::Autotest => ScanModule::Autotest,
            Self::Cloc { .. } => ScanModule::Cloc,
            Self::Dast { .. } => ScanModule::Dast,
        }
    }

    /// Returns the run kind reported for the task.
    #[must_use]
    pub const fn run_kind(&self) -> &'static str {
        match self {
            Self::Scanning { run_type, .. } => run_type.as_str(),
            Self::Autotest => "SELENIUM",
            Self::Cloc { .. } => "CLOC",
            Self::Dast { .. } => "DAST",
        }
    }
}

/// Locator of a durable artifact (object key in report storage).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactLocator(String);

impl ArtifactLocator {
    /// Wraps an object key.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the object key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    profile: TaskProfile,
    source: SourceLocator,
    branch: Option<String>,
    status: TaskStatus,
    owner: Option<OwnerId>,
    artifact: Option<ArtifactLocator>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Module attributes.
    pub profile: TaskProfile,
    /// Git URL or target URL.
    pub source: SourceLocator,
    /// Branch or ref, when the module uses one.
    pub branch: Option<String>,
    /// Owning user.
    pub owner: Option<OwnerId>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted module attributes.
    pub profile: TaskProfile,
    /// Persisted source locator.
    pub source: SourceLocator,
    /// Persisted branch, if any.
    pub branch: Option<String>,
    /// Persisted status.
    pub status: TaskStatus,
    /// Persisted owner, if any.
    pub owner: Option<OwnerId>,
    /// Persisted artifact locator, if any.
    pub artifact: Option<ArtifactLocator>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new pending task.
    #[must_use]
    pub fn new(draft: TaskDraft, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            profile: draft.profile,
            source: draft.source,
            branch: draft.branch,
            status: TaskStatus::Pending,
            owner: draft.owner,
            artifact: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            profile: data.profile,
            source: data.source,
            branch: data.branch,
            status: data.status,
            owner: data.owner,
            artifact: data.artifact,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the module attributes.
    #[must_use]
    pub const fn profile(&self) -> &TaskProfile {
        &self.profile
    }

    /// Returns the module the task belongs to.
    #[must_use]
    pub const fn module(&self) -> ScanModule {
        self.profile.module()
    }

    /// Returns the source locator.
    #[must_use]
    pub const fn source(&self) -> &SourceLocator {
        &self.source
    }

    /// Returns the branch or ref, if any.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the owning user, if any.
    #[must_use]
    pub const fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    /// Returns the durable artifact locator, if one was recorded.
    #[must_use]
    pub const fn artifact(&self) -> Option<&ArtifactLocator> {
        self.artifact.as_ref()
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

    /// Sets the task status and touches the update timestamp.
    pub fn set_status(&mut self, status: TaskStatus, clock: &impl Clock) {
        self.status = status;
        self.touch(clock);
    }

    /// Sets the task status with an explicit mutation time.
    ///
    /// Used by stores that compute a rollup inside their own lock.
    pub const fn set_status_at(&mut self, status: TaskStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
    }

    /// Records the durable artifact produced for this task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::ArtifactAlreadyRecorded`] when an artifact
    /// locator is already set.
    pub fn record_artifact(
        &mut self,
        locator: ArtifactLocator,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if self.artifact.is_some() {
            return Err(TaskDomainError::ArtifactAlreadyRecorded(self.id));
        }
        self.artifact = Some(locator);
        self.touch(clock);
        Ok(())
    }

    /// Updates the `updated_at` timestamp to the current clock time.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}

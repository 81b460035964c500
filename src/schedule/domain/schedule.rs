//! Schedule records and the payload their triggers carry.

use super::Recurrence;
use crate::task::domain::{GitEngine, OwnerId, ScanRunType, SourceLocator, Variant};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a schedule; also names its secret and trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(Uuid);

impl ScheduleId {
    /// Creates a new random schedule identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a schedule identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ScheduleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated parameters of a new schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDraft {
    /// Engine hosting the repository.
    pub git_engine: GitEngine,
    /// Repository URL.
    pub source: SourceLocator,
    /// Branch to scan.
    pub branch: String,
    /// Git user; the password lives in the schedule's secret.
    pub git_user: String,
    /// Analysers to run.
    pub languages: Vec<Variant>,
    /// User-supplied exclude paths.
    pub exclude_path: Option<String>,
    /// Requested run type.
    pub run_type: ScanRunType,
    /// When the scan fires.
    pub recurrence: Recurrence,
    /// Owning user.
    pub owner: OwnerId,
}

/// Stored schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    id: ScheduleId,
    draft: ScheduleDraft,
    created_at: DateTime<Utc>,
}

impl Schedule {
    /// Creates a schedule with a fresh identifier.
    #[must_use]
    pub fn new(draft: ScheduleDraft, clock: &impl Clock) -> Self {
        Self {
            id: ScheduleId::new(),
            draft,
            created_at: clock.utc(),
        }
    }

    /// Returns the schedule identifier.
    #[must_use]
    pub const fn id(&self) -> ScheduleId {
        self.id
    }

    /// Returns the engine hosting the repository.
    #[must_use]
    pub const fn git_engine(&self) -> GitEngine {
        self.draft.git_engine
    }

    /// Returns the repository URL.
    #[must_use]
    pub const fn source(&self) -> &SourceLocator {
        &self.draft.source
    }

    /// Returns the branch to scan.
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.draft.branch
    }

    /// Returns the git user.
    #[must_use]
    pub fn git_user(&self) -> &str {
        &self.draft.git_user
    }

    /// Returns the analysers to run.
    #[must_use]
    pub fn languages(&self) -> &[Variant] {
        &self.draft.languages
    }

    /// Returns the requested run type.
    #[must_use]
    pub const fn run_type(&self) -> ScanRunType {
        self.draft.run_type
    }

    /// Returns the recurrence.
    #[must_use]
    pub const fn recurrence(&self) -> &Recurrence {
        &self.draft.recurrence
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn owner(&self) -> OwnerId {
        self.draft.owner
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Builds the payload the schedule's trigger delivers.
    #[must_use]
    pub fn scheduled_scan(&self) -> ScheduledScan {
        ScheduledScan {
            schedule_id: self.id,
            git_engine: self.draft.git_engine,
            git_url: self.draft.source.as_str().to_owned(),
            git_user: self.draft.git_user.clone(),
            branch: self.draft.branch.clone(),
            language: self
                .draft
                .languages
                .iter()
                .map(|variant| variant.as_str())
                .collect::<Vec<_>>()
                .join(","),
            exclude_path: self.draft.exclude_path.clone().unwrap_or_default(),
            owner: self.draft.owner,
            run_type: self.draft.run_type,
        }
    }
}

/// Payload delivered by a schedule trigger when it fires.
///
/// It names the secret holding the git password through `schedule_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledScan {
    /// Schedule that fired.
    pub schedule_id: ScheduleId,
    /// Engine hosting the repository.
    pub git_engine: GitEngine,
    /// Repository URL.
    pub git_url: String,
    /// Git user.
    pub git_user: String,
    /// Branch to scan.
    pub branch: String,
    /// Comma-separated analysers.
    pub language: String,
    /// User-supplied exclude paths, empty when none.
    pub exclude_path: String,
    /// Owning user.
    pub owner: OwnerId,
    /// Requested run type.
    pub run_type: ScanRunType,
}

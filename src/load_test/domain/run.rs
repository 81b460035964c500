//! Load-test records and their run kinds.

use super::LoadTestDomainError;
use crate::task::domain::OwnerId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a load-test run; also names its media directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadTestId(Uuid);

impl LoadTestId {
    /// Creates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for LoadTestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LoadTestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run kind of a load test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadTestMode {
    /// Parameterised run of the configured plan.
    Config,
    /// Run of a user-supplied plan file.
    Script,
    /// ZAP quick scan with an exported report.
    Security,
}

impl LoadTestMode {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "CONFIG",
            Self::Script => "SCRIPT",
            Self::Security => "SECURITY",
        }
    }
}

impl TryFrom<&str> for LoadTestMode {
    type Error = LoadTestDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "CONFIG" => Ok(Self::Config),
            "SCRIPT" => Ok(Self::Script),
            "SECURITY" => Ok(Self::Security),
            _ => Err(LoadTestDomainError::InvalidMode(value.to_owned())),
        }
    }
}

impl fmt::Display for LoadTestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a load-test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadTestStatus {
    /// Queued or executing.
    Running,
    /// The tool exited successfully and its report is linked.
    Completed,
    /// The tool failed or could not be launched.
    Error,
}

impl LoadTestStatus {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }
}

impl TryFrom<&str> for LoadTestStatus {
    type Error = LoadTestDomainError;

    fn try_from(value: &str) -> Result<Self, LoadTestDomainError> {
        match value {
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "ERROR" => Ok(Self::Error),
            _ => Err(LoadTestDomainError::InvalidStatus(value.to_owned())),
        }
    }
}

/// Validated parameters of a run, by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "run_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadTestPlan {
    /// Parameterised run of the configured plan.
    Config {
        /// Target host.
        domain: String,
        /// Target port.
        port: u32,
        /// Target protocol.
        protocol: String,
        /// Ramp-up period in seconds.
        ramp_time: u32,
        /// Concurrent threads.
        num_threads: u32,
        /// Iterations per thread.
        loops: u32,
    },
    /// Run of an uploaded plan, relative to the media root.
    Script {
        /// Uploaded plan file.
        plan_file: String,
    },
    /// ZAP quick scan of a domain.
    Security {
        /// Target URL; `http://` is prefixed when no scheme is present.
        domain: String,
    },
}

impl LoadTestPlan {
    /// Returns the run kind.
    #[must_use]
    pub const fn mode(&self) -> LoadTestMode {
        match self {
            Self::Config { .. } => LoadTestMode::Config,
            Self::Script { .. } => LoadTestMode::Script,
            Self::Security { .. } => LoadTestMode::Security,
        }
    }

    /// Builds a security plan, prefixing `http://` when `domain` lacks a
    /// scheme.
    #[must_use]
    pub fn security(domain: &str) -> Self {
        let target = domain.trim();
        let url = if target.contains("http") {
            target.to_owned()
        } else {
            format!("http://{target}")
        };
        Self::Security { domain: url }
    }

    /// Builds a script plan from an uploaded file path.
    ///
    /// # Errors
    ///
    /// Returns [`LoadTestDomainError::InvalidPlanFile`] when the path is
    /// absolute or walks out of the media root.
    pub fn script(plan_file: &str) -> Result<Self, LoadTestDomainError> {
        let path = plan_file.trim();
        if path.starts_with('/') || path.split('/').any(|segment| segment == "..") {
            return Err(LoadTestDomainError::InvalidPlanFile(plan_file.to_owned()));
        }
        Ok(Self::Script {
            plan_file: path.to_owned(),
        })
    }

    /// Returns the upload directory holding a script plan, if any.
    #[must_use]
    pub fn upload_dir(&self) -> Option<&str> {
        match self {
            Self::Script { plan_file } => plan_file
                .split('/')
                .next()
                .filter(|segment| !segment.is_empty() && segment.len() < plan_file.len()),
            Self::Config { .. } | Self::Security { .. } => None,
        }
    }
}

/// Load-test run record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTest {
    id: LoadTestId,
    plan: LoadTestPlan,
    status: LoadTestStatus,
    report: Option<String>,
    owner: Option<OwnerId>,
    created_at: DateTime<Utc>,
}

impl LoadTest {
    /// Creates a running record.
    #[must_use]
    pub fn new(plan: LoadTestPlan, owner: Option<OwnerId>, clock: &impl Clock) -> Self {
        Self {
            id: LoadTestId::new(),
            plan,
            status: LoadTestStatus::Running,
            report: None,
            owner,
            created_at: clock.utc(),
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> LoadTestId {
        self.id
    }

    /// Returns the run parameters.
    #[must_use]
    pub const fn plan(&self) -> &LoadTestPlan {
        &self.plan
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> LoadTestStatus {
        self.status
    }

    /// Returns the report or failure-output link, once finished.
    #[must_use]
    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    /// Returns the owning user, if any.
    #[must_use]
    pub const fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    /// Returns the submission timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Marks the run finished with `status`, linking `report`.
    pub fn finish(&mut self, status: LoadTestStatus, report: String) {
        self.status = status;
        self.report = Some(report);
    }
}

//! Error types for task domain validation and parsing.

use super::{ScanModule, TaskId};
use thiserror::Error;

/// Errors returned while constructing or validating task domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// A required request field is absent or empty.
    #[error("{0}: this field is required")]
    MissingField(&'static str),

    /// One or more variant tokens are not in the module's enumeration.
    #[error("invalid {kind} for {module}: {}", tokens.join(","))]
    InvalidVariants {
        /// Module whose enumeration was checked.
        module: ScanModule,
        /// Human-readable variant kind (`browser`, `language`).
        kind: &'static str,
        /// Offending tokens in request order.
        tokens: Vec<String>,
    },

    /// The source locator is empty or yields no repository name.
    #[error("invalid source locator: {0}")]
    InvalidSourceLocator(String),

    /// The git engine value is unsupported.
    #[error("unsupported git engine: {0}")]
    InvalidGitEngine(String),

    /// The run type value is not valid for the module.
    #[error("invalid run type '{run_type}' for {module}")]
    InvalidRunType {
        /// Module being created.
        module: ScanModule,
        /// Rejected run type.
        run_type: String,
    },

    /// Only superusers may create tasks on behalf of another user.
    #[error("owner override requires a superuser")]
    OwnerOverrideForbidden,

    /// The operation is only valid for modules that fan out into subtasks.
    #[error("{0} tasks have no subtasks")]
    NotFanOut(ScanModule),

    /// The operation is only valid for modules tracked at task level.
    #[error("{0} tasks are tracked through their subtasks")]
    FanOut(ScanModule),

    /// Dispatch can only be resumed while a task is still pending.
    #[error("task {0} has already left PENDING")]
    DispatchAlreadyStarted(TaskId),

    /// A durable artifact locator can only be recorded once.
    #[error("task {0} already has an artifact")]
    ArtifactAlreadyRecorded(TaskId),
}

/// Error returned while parsing task statuses from persistence or callbacks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing module tags from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown scan module: {0}")]
pub struct ParseScanModuleError(pub String);

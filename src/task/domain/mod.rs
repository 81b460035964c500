//! Domain model for scan task lifecycle management.
//!
//! A task belongs to one module (scanning, autotest, cloc, dast). Fan-out
//! modules split a task into one subtask per requested variant; the parent
//! status is derived from its subtasks by [`decide_rollup`]. Findings are
//! parsed from worker result documents and are append-only apart from
//! their note. Infrastructure concerns stay outside this boundary.

mod credentials;
mod error;
mod finding;
mod ids;
mod link;
mod module;
mod payload;
mod report;
mod rollup;
mod status;
mod subtask;
mod task;

pub use credentials::GitCredentials;
pub use error::{ParseScanModuleError, ParseTaskStatusError, TaskDomainError};
pub use finding::{
    Finding, FindingBody, FindingOwner, LineCount, PersistedFindingData, SEVERITY_CRITICAL,
    SEVERITY_HIGH, Vulnerability,
};
pub use ids::{FindingId, OwnerId, SourceLocator, SubTaskId, TaskId};
pub use link::GitEngine;
pub use module::{Browser, Language, ScanModule, Variant};
pub use payload::{ABSENT_FIELD, DispatchInputs, DispatchPayload, merge_exclude_paths};
pub use report::{
    LinkContext, ReportFormat, ReportKind, ReportParseError, ResultDocument, parse_dynamic_findings,
    parse_line_counts, parse_static_findings,
};
pub use rollup::{RollupDecision, RollupOutcome, decide_rollup};
pub use status::TaskStatus;
pub use subtask::{LogStreamRef, PersistedSubTaskData, SubTask};
pub use task::{
    ArtifactLocator, ClocComparison, PersistedTaskData, ScanRunType, Task, TaskDraft, TaskProfile,
};

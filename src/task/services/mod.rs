//! Application services for task lifecycle orchestration.

mod completion;
mod dashboard;
mod lifecycle;

pub use completion::{StatusReport, SubTaskCompletion};
pub use dashboard::{
    ClocCounts, Overview, RECENT_RUN_LIMIT, RecentRun, RepositoryCounts, SeverityCounts,
};
pub use lifecycle::{
    CreateTaskRequest, ExternalServiceError, LifecycleSettings, MissingRecord, Requester,
    ResumeDispatch, SubTaskLog, TaskDetails, TaskGateways, TaskLifecycleError,
    TaskLifecycleResult, TaskLifecycleService,
};

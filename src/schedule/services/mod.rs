//! Application services for scheduled scans.

mod manager;

pub use manager::{
    CreateScheduleRequest, ScheduleService, ScheduleServiceError, ScheduleServiceResult,
    scheduled_task_request,
};

//! Port contracts for scheduled scans.

mod gateway;
mod repository;

pub use gateway::{ScheduleGateway, ScheduleGatewayError, ScheduleGatewayResult};
pub use repository::{ScheduleRepository, ScheduleRepositoryError, ScheduleRepositoryResult};

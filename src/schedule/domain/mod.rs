//! Domain model for scheduled scans.

mod error;
mod recurrence;
mod schedule;

pub use error::ScheduleDomainError;
pub use recurrence::{DaysOfWeek, Recurrence, RecurrenceRule};
pub use schedule::{Schedule, ScheduleDraft, ScheduleId, ScheduledScan};

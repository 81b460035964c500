//! Validation errors for schedules.

use crate::task::domain::TaskDomainError;
use thiserror::Error;

/// Errors returned while validating a schedule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleDomainError {
    /// A required field is absent or empty.
    #[error("{0}: this field is required")]
    MissingField(&'static str),

    /// Neither a day-of-week set nor a date was given.
    #[error("must select value date or day_of_week")]
    MissingRecurrence,

    /// Both a day-of-week set and a date were given.
    #[error("date and day_of_week are mutually exclusive")]
    ConflictingRecurrence,

    /// The time of day is not `HH:MM`.
    #[error("invalid time: {0}")]
    InvalidTime(String),

    /// The date is not `YYYY-MM-DD`.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// The day-of-week set contains an unknown token.
    #[error("invalid day_of_week: {0}")]
    InvalidDayOfWeek(String),

    /// A one-shot schedule must fire strictly in the future.
    #[error("invalid date time: {0} is not in the future")]
    NotInFuture(String),

    /// A scanning parameter was rejected.
    #[error(transparent)]
    Task(#[from] TaskDomainError),
}

//! Error types for load-test validation.

use super::LoadTestMode;
use thiserror::Error;

/// Errors returned while validating a load-test submission.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadTestDomainError {
    /// The run kind is not `CONFIG`, `SCRIPT` or `SECURITY`.
    #[error("unknown load-test run type: {0}")]
    InvalidMode(String),

    /// A field required by the run kind is absent or empty.
    #[error("{field}: this field is required for {mode} runs")]
    MissingField {
        /// Run kind being validated.
        mode: LoadTestMode,
        /// Missing field.
        field: &'static str,
    },

    /// The plan file path escapes the media directory.
    #[error("invalid plan file path: {0}")]
    InvalidPlanFile(String),

    /// A persisted status value is unknown.
    #[error("unknown load-test status: {0}")]
    InvalidStatus(String),
}

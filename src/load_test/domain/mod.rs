//! Domain model for load-test runs.

mod command;
mod error;
mod run;

pub use command::{LaunchCommand, LaunchPlan, LaunchSettings, shell_escape};
pub use error::LoadTestDomainError;
pub use run::{LoadTest, LoadTestId, LoadTestMode, LoadTestPlan, LoadTestStatus};

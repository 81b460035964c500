//! Port contracts for load-test runs: the run store, the process launcher
//! and the media directory reports are written to.

mod reports;
mod repository;
mod runner;

pub use reports::{ReportStore, ReportStoreError, ReportStoreResult};
pub use repository::{LoadTestRepository, LoadTestRepositoryError, LoadTestRepositoryResult};
pub use runner::{CommandOutput, CommandRunner, CommandRunnerError, CommandRunnerResult};

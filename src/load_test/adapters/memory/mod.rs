//! In-memory adapters for load-test ports.

mod reports;
mod repository;
mod runner;

pub use reports::InMemoryReportStore;
pub use repository::InMemoryLoadTestRepository;
pub use runner::{ScriptedCommandRunner, ScriptedOutcome};

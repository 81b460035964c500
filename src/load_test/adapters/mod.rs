//! Adapters for load-test ports.
//!
//! - [`memory`]: in-memory store, scripted runner and report store for tests
//! - [`process::TokioCommandRunner`]: launches tools with `tokio::process`
//! - [`filesystem::FsReportStore`]: media directory on local disk

pub mod filesystem;
pub mod memory;
pub mod process;

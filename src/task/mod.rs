//! Scan task lifecycle management.
//!
//! A task records one requested job in a module (scanning, autotest, cloc or
//! dast). Creation validates the request, stores the task with one subtask
//! per requested variant and hands a dispatch payload to the worker
//! platform. Workers report back per subtask (or per task for modules that
//! do not fan out); each report is applied and the parent status is rolled
//! up. Completed jobs leave result documents in the shared workspace, which
//! are parsed into findings. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

//! citool: task lifecycle core for repository and URL scanning jobs.
//!
//! Users launch static analysis, browser test suites, code-line counts,
//! dynamic scans and load tests. Each job is recorded as a task, handed to
//! an external worker and completed through a status callback that parses
//! the worker's report into findings.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, filesystem,
//!   processes, in-memory)
//! - **Services**: Orchestration over the ports
//!
//! # Modules
//!
//! - [`config`]: TOML runtime configuration
//! - [`task`]: Task/subtask lifecycle, status rollup and completion handling
//! - [`schedule`]: Recurring and one-shot scheduled scans
//! - [`load_test`]: Load tests executed by an in-process worker

pub mod config;
pub mod load_test;
pub mod schedule;
pub mod task;

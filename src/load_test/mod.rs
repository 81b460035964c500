//! Load-test runs executed on the serving host.
//!
//! Unlike the scan modules, load tests are not handed to the worker
//! platform. A submitted run is stored as `RUNNING` and queued to a single
//! in-process worker that launches `JMeter` (or ZAP for security runs),
//! then records the report link or the captured failure output.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Submission and execution services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

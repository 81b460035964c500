//! Recurring and one-shot scheduled scans.
//!
//! A schedule pairs a recurrence (days of the week or a single date, plus a
//! UTC time of day) with the parameters of a scanning task. Creating one
//! stores the record, keeps the git password in an external secret and
//! registers a trigger that later submits a scanning task on the owner's
//! behalf. The module follows the same layout as [`crate::task`]:
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

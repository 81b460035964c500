//! Adapters for task lifecycle ports.
//!
//! - [`memory`]: in-memory store and recording gateways for tests
//! - [`filesystem::FsWorkspaceStore`]: reports on the shared worker volume
//! - [`postgres::PostgresTaskRepository`]: `PostgreSQL` persistence through
//!   Diesel

pub mod filesystem;
pub mod memory;
pub mod postgres;

//! `PostgreSQL` adapters for task lifecycle persistence.
//!
//! Schema migrations live under `migrations/` at the crate root.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresTaskRepository, TaskPgPool};

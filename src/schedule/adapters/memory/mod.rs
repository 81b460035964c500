//! In-memory schedule adapters for tests and local runs.

mod gateway;
mod repository;

pub use gateway::{InMemoryScheduleGateway, RegisteredTrigger};
pub use repository::InMemoryScheduleRepository;

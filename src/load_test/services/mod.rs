//! Submission and background execution of load-test runs.

mod executor;
mod manager;
mod worker;

pub use executor::{LoadTestExecutor, LoadTestSettings};
pub use manager::{
    CreateLoadTestRequest, LoadTestService, LoadTestServiceError, LoadTestServiceResult,
};
pub use worker::{LoadTestQueue, spawn_load_test_worker};

//! Unit tests for load-test services.

mod service_tests;

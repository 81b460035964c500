//! Unit tests for task lifecycle management.

mod support;

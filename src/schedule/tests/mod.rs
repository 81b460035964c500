//! Unit tests for schedule services.

//! Step definitions for subtask rollup scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;

//! Mock implementations for testing.
//!
//! This module provides `MockFs`, `MockRunner` and pre-built host scenarios
//! for testing collectors without access to a live `/proc`, `/sys` or `/dev`.

mod filesystem;
mod runner;
pub mod scenarios;

pub use filesystem::MockFs;
pub use runner::MockRunner;

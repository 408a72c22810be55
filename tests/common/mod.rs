//! Shared test utilities

#![allow(dead_code, unused_imports)]

pub mod mock_platform;
pub mod mock_runner;

pub use mock_platform::{MockPlatformService, comment, make_pr, pr_ref, review};
pub use mock_runner::MockRunner;

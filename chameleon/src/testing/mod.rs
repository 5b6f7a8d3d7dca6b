//! Testing utilities for chameleon pipelines.
//!
//! This module provides:
//! - A scriptable mock engine adapter
//! - A plugin that records which stages ran
//! - Request, mount and context fixtures

mod fixtures;
mod mocks;

pub use fixtures::{mount, test_context, test_request, TEST_SOURCE_URL};
pub use mocks::{MockAdapter, RecordingPlugin};

//! Pipeline execution.
//!
//! This module provides:
//! - The stage hooks plugins tap into
//! - The pipeline with `run`, `run_from`, `run_stages` and `dispose`
//! - Run errors and teardown reports

mod execution;
mod hooks;
mod runner;


pub use hooks::{ParseVerdict, StageHooks, StageInterceptor};
pub use runner::{DisposeReport, Pipeline, RunError};

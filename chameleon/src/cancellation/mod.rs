//! Cooperative cancellation and stage cleanup utilities.
//!
//! This module provides:
//! - CancellationToken for cooperative cancellation
//! - StageCleanup callbacks and the runner that executes them

mod cleanup;
mod token;

pub(crate) use cleanup::{panic_message, run_cleanups};
pub use cleanup::{CleanupFailure, CleanupFn, CleanupFuture, StageCleanup};
pub use token::{CancelCallback, CancellationToken};

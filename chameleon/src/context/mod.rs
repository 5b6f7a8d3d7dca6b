//! The rendering context shared by every stage of a run.
//!
//! This module provides:
//! - RenderingContext, the per-run data record
//! - StageMetadata for locks, cleanups and completion flags
//! - RenderState for render-loop bookkeeping

mod metadata;
mod rendering;

pub use metadata::{MetadataSnapshot, StageLockGuard, StageMetadata};
pub use rendering::{RenderState, RenderingContext, SharedContext};

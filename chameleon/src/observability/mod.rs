//! Observability utilities.
//!
//! This module provides:
//! - Log records for tap timing and errors
//! - Log sinks the hook logger reports to
//! - A helper installing the global `tracing` subscriber

mod records;
mod sink;
mod subscriber;

pub use records::{LogEntry, LogKind, LogStatus};
pub use sink::{LogObserver, LogSink, NoOpLogSink, PipelineLogger, TracingLogSink};
pub use subscriber::init_tracing;

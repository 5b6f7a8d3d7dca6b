//! Destinations for log records.

use super::LogEntry;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

/// Receives log records.
///
/// Callers discard whatever a sink returns or raises; a sink can never fail
/// the operation being logged.
pub trait LogSink: Send + Sync {
    /// Records one entry.
    fn record(&self, entry: &LogEntry) -> anyhow::Result<()>;
}

/// A sink that discards all records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogSink;

impl LogSink for NoOpLogSink {
    fn record(&self, _entry: &LogEntry) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A sink that forwards records to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn record(&self, entry: &LogEntry) -> anyhow::Result<()> {
        let hook = entry.hook.as_deref().unwrap_or("-");
        let plugin = entry.plugin.as_deref().unwrap_or("-");
        match &entry.error {
            Some(error) => warn!(
                kind = ?entry.kind,
                hook,
                plugin,
                duration_ms = entry.duration_ms,
                error = %error,
                "Tap failed"
            ),
            None => info!(
                kind = ?entry.kind,
                hook,
                plugin,
                duration_ms = entry.duration_ms,
                "Tap completed"
            ),
        }
        Ok(())
    }
}

/// Callback invoked with every record pushed to a [`PipelineLogger`].
pub type LogObserver = Arc<dyn Fn(&LogEntry) + Send + Sync>;

/// Collects records in memory and optionally forwards each to an observer.
///
/// Unbounded by default. A logger built with [`PipelineLogger::with_capacity`]
/// keeps only the newest `capacity` records; the observer still sees every
/// record.
#[derive(Default)]
pub struct PipelineLogger {
    records: RwLock<VecDeque<LogEntry>>,
    capacity: Option<usize>,
    observer: RwLock<Option<LogObserver>>,
}

impl PipelineLogger {
    /// Creates an empty, unbounded logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logger that keeps at most `capacity` records.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
            observer: RwLock::new(None),
        }
    }

    /// Returns the record limit, `None` when unbounded.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Appends a record and notifies the observer.
    ///
    /// At capacity the oldest record is evicted.
    pub fn push(&self, entry: LogEntry) {
        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer(&entry);
        }

        let mut records = self.records.write();
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while records.len() >= capacity {
                records.pop_front();
            }
        }
        records.push_back(entry);
    }

    /// Returns a copy of every retained record, oldest first.
    #[must_use]
    pub fn get_all(&self) -> Vec<LogEntry> {
        self.records.read().iter().cloned().collect()
    }

    /// Drops every record.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    /// Sets the observer, replacing any previous one.
    pub fn set_observer<F>(&self, observer: F)
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        *self.observer.write() = Some(Arc::new(observer));
    }

    /// Removes the observer.
    pub fn clear_observer(&self) {
        *self.observer.write() = None;
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl LogSink for PipelineLogger {
    fn record(&self, entry: &LogEntry) -> anyhow::Result<()> {
        self.push(entry.clone());
        Ok(())
    }
}

impl std::fmt::Debug for PipelineLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineLogger")
            .field("records", &self.len())
            .field("capacity", &self.capacity)
            .field("has_observer", &self.observer.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::LogKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_pipeline_logger_collects() {
        let logger = PipelineLogger::new();
        assert!(logger.is_empty());

        logger.push(LogEntry::info(json!("one")));
        logger.record(&LogEntry::new(LogKind::Frame)).unwrap();

        let all = logger.get_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].kind, LogKind::Frame);

        logger.clear();
        assert!(logger.is_empty());
    }

    #[test]
    fn test_observer_sees_every_record() {
        let logger = PipelineLogger::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        logger.set_observer(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        logger.push(LogEntry::info(json!(1)));
        logger.push(LogEntry::info(json!(2)));
        logger.clear_observer();
        logger.push(LogEntry::info(json!(3)));

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(logger.len(), 3);
    }

    #[test]
    fn test_bounded_logger_keeps_newest() {
        let logger = PipelineLogger::with_capacity(2);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        logger.set_observer(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for frame in 0..5 {
            logger.push(LogEntry::info(json!(frame)));
        }

        assert_eq!(logger.capacity(), Some(2));
        assert_eq!(logger.len(), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 5);
        let kept: Vec<_> = logger.get_all().into_iter().map(|e| e.payload).collect();
        assert_eq!(kept, vec![Some(json!(3)), Some(json!(4))]);

        let none_kept = PipelineLogger::with_capacity(0);
        none_kept.push(LogEntry::info(json!("dropped")));
        assert!(none_kept.is_empty());
    }

    #[test]
    fn test_stateless_sinks() {
        let entry = LogEntry::hook("initEngine", "p").with_error("boom");
        assert!(NoOpLogSink.record(&entry).is_ok());
        assert!(TracingLogSink.record(&entry).is_ok());
        assert!(TracingLogSink.record(&LogEntry::hook("initEngine", "p")).is_ok());
    }
}

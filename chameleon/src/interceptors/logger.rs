//! Interceptor that times taps and reports them to log sinks.

use crate::hooks::{AsyncTapFn, Interceptor, SyncTapFn, TapInfo};
use crate::observability::{LogEntry, LogSink};
use chrono::Utc;
use futures::FutureExt;
use parking_lot::RwLock;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

type SinkList = Arc<RwLock<Vec<Arc<dyn LogSink>>>>;

/// Wraps each tap so every invocation produces a [`LogEntry`].
///
/// The wrapped tap behaves exactly like the original: its result or error is
/// passed through untouched. Taps that are already instrumented are left
/// alone, so installing a logger twice does not double-report. To report to
/// another destination, add a sink to the installed logger with
/// [`HookLogger::add_sink`]; taps it already wrapped pick the sink up.
pub struct HookLogger {
    sinks: SinkList,
}

impl HookLogger {
    /// Creates a logger reporting to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sinks: Arc::new(RwLock::new(vec![sink])),
        }
    }

    /// Adds a sink; every entry from now on is reported to it too.
    pub fn add_sink(&self, sink: Arc<dyn LogSink>) {
        self.sinks.write().push(sink);
    }

    /// Returns the sinks in the order they were added.
    #[must_use]
    pub fn sinks(&self) -> Vec<Arc<dyn LogSink>> {
        self.sinks.read().clone()
    }
}

fn report(sinks: &SinkList, entry: &LogEntry) {
    let sinks = sinks.read().clone();
    for sink in sinks {
        let _ = std::panic::catch_unwind(AssertUnwindSafe(|| sink.record(entry)));
    }
}

fn entry_for<R>(
    hook: &str,
    plugin: &str,
    start: chrono::DateTime<Utc>,
    timer: Instant,
    result: &anyhow::Result<R>,
) -> LogEntry {
    let entry = LogEntry::hook(hook, plugin).timed(start, Utc::now(), timer.elapsed());
    match result {
        Ok(_) => entry,
        Err(err) => entry.with_error(format!("{err:#}")),
    }
}

impl<T, R> Interceptor<AsyncTapFn<T, R>> for HookLogger
where
    T: Send + 'static,
    R: Send + 'static,
{
    fn register(&self, tap: TapInfo<AsyncTapFn<T, R>>) -> TapInfo<AsyncTapFn<T, R>> {
        if tap.is_instrumented() {
            return tap;
        }

        let inner = Arc::clone(&tap.func);
        let sinks = Arc::clone(&self.sinks);
        let hook = tap.hook;
        let plugin: Arc<str> = Arc::from(tap.name.as_str());

        let wrapped: AsyncTapFn<T, R> = Arc::new(move |arg| {
            let inner = Arc::clone(&inner);
            let sinks = Arc::clone(&sinks);
            let plugin = Arc::clone(&plugin);
            async move {
                let start = Utc::now();
                let timer = Instant::now();
                let result = inner(arg).await;
                report(&sinks, &entry_for(hook, &plugin, start, timer, &result));
                result
            }
            .boxed()
        });

        tap.instrument(wrapped)
    }
}

impl<T: 'static> Interceptor<SyncTapFn<T>> for HookLogger {
    fn register(&self, tap: TapInfo<SyncTapFn<T>>) -> TapInfo<SyncTapFn<T>> {
        if tap.is_instrumented() {
            return tap;
        }

        let inner = Arc::clone(&tap.func);
        let sinks = Arc::clone(&self.sinks);
        let hook = tap.hook;
        let plugin = tap.name.clone();

        let wrapped: SyncTapFn<T> = Arc::new(move |arg| {
            let start = Utc::now();
            let timer = Instant::now();
            let result = inner(arg);
            report(&sinks, &entry_for(hook, &plugin, start, timer, &result));
            result
        });

        tap.instrument(wrapped)
    }
}

impl std::fmt::Debug for HookLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookLogger")
            .field("sinks", &self.sinks.read().len())
            .finish()
    }
}

//! Per-run publish/subscribe channel for plugin-to-plugin signaling.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Identifies one subscription, returned by [`EventBus::on`] and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type SyncHandler = Arc<dyn Fn(&serde_json::Value) -> anyhow::Result<()> + Send + Sync>;
type AsyncHandler =
    Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Clone)]
enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

#[derive(Clone)]
struct Listener {
    id: SubscriptionId,
    once: bool,
    handler: Handler,
}

/// A minimal event bus keyed by event name.
///
/// Handlers run in subscription order. A failing handler is logged and
/// skipped; it never prevents the remaining handlers from running and never
/// reaches the emitter.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribe(&self, event: String, once: bool, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(event)
            .or_default()
            .push(Listener { id, once, handler });
        id
    }

    /// Subscribes a synchronous handler.
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&serde_json::Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(event.into(), false, Handler::Sync(Arc::new(handler)))
    }

    /// Subscribes an async handler.
    pub fn on_async<F, Fut>(&self, event: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: AsyncHandler = Arc::new(move |payload| handler(payload).boxed());
        self.subscribe(event.into(), false, Handler::Async(handler))
    }

    /// Subscribes a handler that runs for the next emission only.
    pub fn once<F>(&self, event: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&serde_json::Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(event.into(), true, Handler::Sync(Arc::new(handler)))
    }

    /// Removes a subscription. Returns false if it was not found.
    pub fn off(&self, event: &str, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|listener| listener.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Returns the number of handlers subscribed to `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }

    /// Delivers `payload` to every handler of `event`, returning how many ran.
    pub async fn emit(&self, event: &str, payload: serde_json::Value) -> usize {
        let listeners = {
            let mut all = self.listeners.write();
            let Some(list) = all.get_mut(event) else {
                return 0;
            };
            let snapshot = list.clone();
            list.retain(|listener| !listener.once);
            if list.is_empty() {
                all.remove(event);
            }
            snapshot
        };

        debug!(event = %event, listeners = listeners.len(), "Emitting event");

        for listener in &listeners {
            let result = match &listener.handler {
                Handler::Sync(handler) => handler(&payload),
                Handler::Async(handler) => handler(payload.clone()).await,
            };
            if let Err(err) = result {
                warn!(event = %event, error = %err, "Event handler failed");
            }
        }

        listeners.len()
    }

    /// Serializes `payload` and emits it.
    pub async fn emit_json<T: Serialize>(&self, event: &str, payload: &T) -> serde_json::Result<usize> {
        let value = serde_json::to_value(payload)?;
        Ok(self.emit(event, value).await)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<String, usize> = self
            .listeners
            .read()
            .iter()
            .map(|(event, list)| (event.clone(), list.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[tokio::test]
    async fn test_handlers_run_in_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = seen.clone();
        bus.on("ready", move |payload| {
            log.lock().push(format!("sync:{}", payload["n"]));
            Ok(())
        });
        let log = seen.clone();
        bus.on_async("ready", move |payload| {
            let log = log.clone();
            async move {
                log.lock().push(format!("async:{}", payload["n"]));
                Ok(())
            }
        });

        assert_eq!(bus.emit("ready", json!({"n": 1})).await, 2);
        assert_eq!(*seen.lock(), vec!["sync:1", "async:1"]);
    }

    #[tokio::test]
    async fn test_handler_errors_are_swallowed() {
        let bus = EventBus::new();
        let reached = Arc::new(Mutex::new(false));

        bus.on("boom", |_| Err(anyhow::anyhow!("handler failed")));
        let flag = reached.clone();
        bus.on("boom", move |_| {
            *flag.lock() = true;
            Ok(())
        });

        assert_eq!(bus.emit("boom", json!(null)).await, 2);
        assert!(*reached.lock());
    }

    #[tokio::test]
    async fn test_once_runs_a_single_time() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));

        let counter = count.clone();
        bus.once("tick", move |_| {
            *counter.lock() += 1;
            Ok(())
        });
        assert_eq!(bus.listener_count("tick"), 1);

        assert_eq!(bus.emit("tick", json!({})).await, 1);
        assert_eq!(bus.emit("tick", json!({})).await, 0);
        assert_eq!(*count.lock(), 1);
        assert_eq!(bus.listener_count("tick"), 0);
    }

    #[tokio::test]
    async fn test_off_removes_subscription() {
        let bus = EventBus::new();
        let id = bus.on("evt", |_| Ok(()));
        let other = bus.on("evt", |_| Ok(()));

        assert!(bus.off("evt", id));
        assert!(!bus.off("evt", id));
        assert!(!bus.off("missing", other));
        assert_eq!(bus.listener_count("evt"), 1);
    }

    #[tokio::test]
    async fn test_emit_without_listeners_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.emit("nobody", json!(1)).await, 0);
    }

    #[tokio::test]
    async fn test_emit_json() {
        #[derive(Serialize)]
        struct Ping {
            seq: u32,
        }

        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        bus.on("ping", move |payload| {
            *slot.lock() = Some(payload.clone());
            Ok(())
        });

        assert_eq!(bus.emit_json("ping", &Ping { seq: 3 }).await.unwrap(), 1);
        assert_eq!(*seen.lock(), Some(json!({"seq": 3})));
    }
}

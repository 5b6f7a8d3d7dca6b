//! The per-run rendering context.

use super::StageMetadata;
use crate::adapter::EngineAdapter;
use crate::cancellation::{run_cleanups, CancellationToken, CleanupFailure};
use crate::core::{Asset, EngineHandles, MountTarget, RenderRequest, Stage};
use crate::events::{EventBus, SubscriptionId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// The context type threaded through every hook.
pub type SharedContext = Arc<RenderingContext>;

/// Render-loop bookkeeping, updated by the frame callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderState {
    /// Whether the render loop has been started and not torn down.
    pub running: bool,
    /// Frames dispatched so far.
    pub frame_count: u64,
    /// The most recent per-frame hook error.
    pub last_error: Option<String>,
    /// Delta reported with the most recent frame.
    pub last_delta_ms: Option<f64>,
}

/// Shared data record for one `run` of the pipeline.
///
/// Created by `Pipeline::run`, mutated in place by `Pipeline::run_from`.
/// Every field uses interior mutability; locks are released before any
/// await point.
pub struct RenderingContext {
    run_id: Uuid,
    request: RenderRequest,
    container: MountTarget,
    adapter: Arc<dyn EngineAdapter>,
    engine_handles: RwLock<EngineHandles>,
    raw_assets: RwLock<Option<Asset>>,
    parsed_gltf: RwLock<Option<Asset>>,
    metadata: StageMetadata,
    cancel_token: RwLock<Arc<CancellationToken>>,
    render_state: RwLock<RenderState>,
    event_bus: Option<Arc<EventBus>>,
    cleanup_timeout: Option<Duration>,
}

impl RenderingContext {
    /// Creates a context with a fresh token, empty metadata and no event bus.
    #[must_use]
    pub fn new(
        request: RenderRequest,
        container: MountTarget,
        adapter: Arc<dyn EngineAdapter>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            request,
            container,
            adapter,
            engine_handles: RwLock::new(EngineHandles::default()),
            raw_assets: RwLock::new(None),
            parsed_gltf: RwLock::new(None),
            metadata: StageMetadata::new(),
            cancel_token: RwLock::new(Arc::new(CancellationToken::new())),
            render_state: RwLock::new(RenderState::default()),
            event_bus: None,
            cleanup_timeout: None,
        }
    }

    /// Attaches an event bus.
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Sets the per-cleanup timeout.
    #[must_use]
    pub fn with_cleanup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.cleanup_timeout = timeout;
        self
    }

    /// Wraps the context for sharing.
    #[must_use]
    pub fn into_shared(self) -> SharedContext {
        Arc::new(self)
    }

    /// Returns the correlation id of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the request this run renders.
    #[must_use]
    pub fn request(&self) -> &RenderRequest {
        &self.request
    }

    /// Returns the mount target.
    #[must_use]
    pub fn container(&self) -> &MountTarget {
        &self.container
    }

    /// Returns the adapter that drives the engine.
    #[must_use]
    pub fn adapter(&self) -> &Arc<dyn EngineAdapter> {
        &self.adapter
    }

    /// Returns a copy of the engine handles.
    #[must_use]
    pub fn engine_handles(&self) -> EngineHandles {
        self.engine_handles.read().clone()
    }

    /// Replaces the engine handles.
    pub fn set_engine_handles(&self, handles: EngineHandles) {
        *self.engine_handles.write() = handles;
    }

    /// Returns true once an engine handle has been stored on the context.
    #[must_use]
    pub fn has_engine(&self) -> bool {
        self.engine_handles.read().is_initialized()
    }

    /// Returns the loaded, unparsed resources.
    #[must_use]
    pub fn raw_assets(&self) -> Option<Asset> {
        self.raw_assets.read().clone()
    }

    /// Stores the loaded resources.
    pub fn set_raw_assets(&self, asset: Option<Asset>) {
        *self.raw_assets.write() = asset;
    }

    /// Returns the parsed resources.
    #[must_use]
    pub fn parsed_gltf(&self) -> Option<Asset> {
        self.parsed_gltf.read().clone()
    }

    /// Stores the parsed resources.
    pub fn set_parsed_gltf(&self, asset: Option<Asset>) {
        *self.parsed_gltf.write() = asset;
    }

    /// Returns the stage metadata.
    #[must_use]
    pub fn metadata(&self) -> &StageMetadata {
        &self.metadata
    }

    /// Returns the current cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.cancel_token.read())
    }

    /// Returns whether the current token is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.read().is_cancelled()
    }

    /// Cancels the current token.
    pub fn cancel(&self, reason: impl Into<String>) {
        let token = self.cancel_token();
        token.cancel(reason);
    }

    /// Cancels the current token, then installs a fresh one.
    ///
    /// The old token's callbacks run before the swap and without the lock
    /// held, so they may read the context's token (still the old one).
    pub fn replace_cancel_token(&self, reason: impl Into<String>) -> Arc<CancellationToken> {
        self.cancel_token().cancel(reason);
        let fresh = Arc::new(CancellationToken::new());
        *self.cancel_token.write() = Arc::clone(&fresh);
        fresh
    }

    /// Returns a copy of the render state.
    #[must_use]
    pub fn render_state(&self) -> RenderState {
        self.render_state.read().clone()
    }

    /// Sets the running flag.
    pub fn set_running(&self, running: bool) {
        self.render_state.write().running = running;
    }

    /// Counts a frame and returns the new frame count.
    pub fn record_frame(&self, delta_ms: f64) -> u64 {
        let mut state = self.render_state.write();
        state.frame_count += 1;
        state.last_delta_ms = Some(delta_ms);
        state.frame_count
    }

    /// Stores the error of a per-frame hook dispatch.
    pub fn record_render_error(&self, error: impl Into<String>) {
        self.render_state.write().last_error = Some(error.into());
    }

    /// Returns the event bus, if this context has one.
    #[must_use]
    pub fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.event_bus.as_ref()
    }

    /// Subscribes to an event on the context's bus.
    ///
    /// Returns `None` when the context has no bus.
    pub fn on_event<F>(&self, event: impl Into<String>, handler: F) -> Option<SubscriptionId>
    where
        F: Fn(&serde_json::Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.event_bus.as_ref().map(|bus| bus.on(event, handler))
    }

    /// Removes a subscription made through [`RenderingContext::on_event`].
    pub fn off_event(&self, event: &str, id: SubscriptionId) -> bool {
        self.event_bus
            .as_ref()
            .is_some_and(|bus| bus.off(event, id))
    }

    /// Emits an event on the context's bus, returning how many handlers ran.
    pub async fn emit_event(&self, event: &str, payload: serde_json::Value) -> usize {
        match &self.event_bus {
            Some(bus) => bus.emit(event, payload).await,
            None => 0,
        }
    }

    /// Returns the timeout applied to each cleanup.
    #[must_use]
    pub fn cleanup_timeout(&self) -> Option<Duration> {
        self.cleanup_timeout
    }

    /// Runs and drains the cleanups registered for `stage`.
    pub async fn run_stage_cleanups(self: &Arc<Self>, stage: Stage) -> Vec<CleanupFailure> {
        let cleanups = self.metadata.take_stage_cleanups(stage);
        if cleanups.is_empty() {
            return Vec::new();
        }
        run_cleanups(self, stage, cleanups, self.cleanup_timeout).await
    }
}

impl std::fmt::Debug for RenderingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderingContext")
            .field("run_id", &self.run_id)
            .field("request", &self.request.id)
            .field("adapter", &self.adapter.name())
            .field("cancelled", &self.is_cancelled())
            .field("render_state", &self.render_state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::StageCleanup;
    use crate::core::handle;
    use crate::testing::{mount, test_context, test_request, MockAdapter};
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_new_context_is_empty() {
        let ctx = test_context();
        assert!(!ctx.has_engine());
        assert!(ctx.raw_assets().is_none());
        assert!(ctx.parsed_gltf().is_none());
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.render_state(), RenderState::default());
        assert_eq!(ctx.metadata().failed_stage(), None);
    }

    #[test]
    fn test_run_ids_are_unique() {
        let adapter: Arc<dyn EngineAdapter> = Arc::new(MockAdapter::new());
        let a = RenderingContext::new(test_request(), mount(), adapter.clone());
        let b = RenderingContext::new(test_request(), mount(), adapter);
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn test_engine_handles_round_trip() {
        let ctx = test_context();
        ctx.set_engine_handles(EngineHandles::new(
            handle("engine"),
            handle("scene"),
            handle(42_u32),
        ));
        assert!(ctx.has_engine());
        assert_eq!(*ctx.engine_handles().camera_as::<u32>().unwrap(), 42);
    }

    #[test]
    fn test_replace_cancel_token() {
        let ctx = test_context();
        let old = ctx.cancel_token();

        let fresh = ctx.replace_cancel_token("superseded");

        assert!(old.is_cancelled());
        assert_eq!(old.reason().as_deref(), Some("superseded"));
        assert!(!fresh.is_cancelled());
        assert!(!ctx.is_cancelled());
        assert!(Arc::ptr_eq(&fresh, &ctx.cancel_token()));
    }

    #[test]
    fn test_record_frame() {
        let ctx = test_context();
        assert_eq!(ctx.record_frame(16.0), 1);
        assert_eq!(ctx.record_frame(17.5), 2);
        ctx.record_render_error("frame failed");

        let state = ctx.render_state();
        assert_eq!(state.frame_count, 2);
        assert_eq!(state.last_delta_ms, Some(17.5));
        assert_eq!(state.last_error.as_deref(), Some("frame failed"));
    }

    #[tokio::test]
    async fn test_run_stage_cleanups_drains() {
        let ctx = test_context();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second"] {
            let seen = seen.clone();
            ctx.metadata().add_stage_cleanup(
                Stage::ResourceLoad,
                StageCleanup::from_fn(move |_| {
                    seen.lock().push(name);
                    Ok(())
                }),
            );
        }

        assert!(ctx.run_stage_cleanups(Stage::ResourceLoad).await.is_empty());
        assert!(ctx.run_stage_cleanups(Stage::ResourceLoad).await.is_empty());
        assert_eq!(*seen.lock(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_event_helpers_without_bus() {
        let adapter: Arc<dyn EngineAdapter> = Arc::new(MockAdapter::new());
        let ctx = RenderingContext::new(test_request(), mount(), adapter);
        assert!(ctx.event_bus().is_none());
        assert!(ctx.on_event("model:clicked", |_| Ok(())).is_none());
        assert_eq!(ctx.emit_event("model:clicked", json!({})).await, 0);
    }

    #[tokio::test]
    async fn test_event_helpers_with_bus() {
        let adapter: Arc<dyn EngineAdapter> = Arc::new(MockAdapter::new());
        let ctx = RenderingContext::new(test_request(), mount(), adapter)
            .with_event_bus(Arc::new(EventBus::new()));
        let received = Arc::new(Mutex::new(None));

        let slot = received.clone();
        let id = ctx
            .on_event("model:clicked", move |payload| {
                *slot.lock() = Some(payload.clone());
                Ok(())
            })
            .unwrap();

        assert_eq!(ctx.emit_event("model:clicked", json!({"id": 1})).await, 1);
        assert_eq!(*received.lock(), Some(json!({"id": 1})));

        assert!(ctx.off_event("model:clicked", id));
        assert_eq!(ctx.emit_event("model:clicked", json!({"id": 2})).await, 0);
    }
}

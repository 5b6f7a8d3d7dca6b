//! Mock adapter and recording plugin for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::adapter::{EngineAdapter, FrameCallback, FrameTicker, FrameTickerConfig};
use crate::context::{RenderingContext, SharedContext};
use crate::core::{handle, Asset, EngineHandles, MountTarget, Source, Stage};
use crate::pipeline::Pipeline;
use crate::plugins::Plugin;

/// An [`EngineAdapter`] that records calls and returns canned resources.
///
/// URL sources load as `{"asset": {"version": "2.0"}}`, inline sources load
/// as themselves and parsing adds `"parsed": true` to JSON objects.
#[derive(Debug, Default)]
pub struct MockAdapter {
    calls: Mutex<Vec<String>>,
    failing: HashSet<String>,
    driver: Option<FrameTickerConfig>,
    engine_live: AtomicBool,
    dispose_count: AtomicUsize,
}

impl MockAdapter {
    /// Creates a mock that succeeds everywhere and has no render-loop driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `method` fail with `mock adapter: <method> failed`.
    #[must_use]
    pub fn fail_on(mut self, method: impl Into<String>) -> Self {
        self.failing.insert(method.into());
        self
    }

    /// Drives the render loop with a [`FrameTicker`].
    #[must_use]
    pub fn with_driver(mut self, config: FrameTickerConfig) -> Self {
        self.driver = Some(config);
        self
    }

    /// Starts the mock with a live engine.
    #[must_use]
    pub fn with_engine(self) -> Self {
        self.engine_live.store(true, Ordering::SeqCst);
        self
    }

    /// Returns the recorded method calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Returns how many times `method` was called.
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == method).count()
    }

    /// Returns how many times `dispose` was called.
    #[must_use]
    pub fn dispose_count(&self) -> usize {
        self.dispose_count.load(Ordering::SeqCst)
    }

    fn record(&self, method: &str) -> anyhow::Result<()> {
        self.calls.lock().push(method.to_string());
        if self.failing.contains(method) {
            anyhow::bail!("mock adapter: {method} failed");
        }
        Ok(())
    }
}

#[async_trait]
impl EngineAdapter for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    fn has_engine(&self) -> bool {
        self.engine_live.load(Ordering::SeqCst)
    }

    async fn init_engine(
        &self,
        _container: &MountTarget,
        _ctx: &RenderingContext,
        _options: Option<&serde_json::Value>,
    ) -> anyhow::Result<EngineHandles> {
        self.record("init_engine")?;
        self.engine_live.store(true, Ordering::SeqCst);
        Ok(EngineHandles::new(
            handle("mock-engine"),
            handle("mock-scene"),
            handle("mock-camera"),
        ))
    }

    async fn load_resource(&self, source: &Source, _ctx: &RenderingContext) -> anyhow::Result<Asset> {
        self.record("load_resource")?;
        Ok(match source {
            Source::Url(_) => Asset::Json(serde_json::json!({ "asset": { "version": "2.0" } })),
            Source::Inline(value) => Asset::Json(value.clone()),
            Source::Binary(bytes) => Asset::Binary(bytes.clone()),
        })
    }

    async fn parse_resource(&self, raw: &Asset, _ctx: &RenderingContext) -> anyhow::Result<Asset> {
        self.record("parse_resource")?;
        let mut parsed = raw.clone();
        if let Asset::Json(serde_json::Value::Object(map)) = &mut parsed {
            map.insert("parsed".to_string(), serde_json::Value::Bool(true));
        }
        Ok(parsed)
    }

    async fn build_scene(&self, _parsed: &Asset, _ctx: &RenderingContext) -> anyhow::Result<()> {
        self.record("build_scene")
    }

    fn start_render_loop(&self, ctx: SharedContext, on_frame: FrameCallback) -> bool {
        self.calls.lock().push("start_render_loop".to_string());
        let Some(config) = self.driver.clone() else {
            return false;
        };
        if tokio::runtime::Handle::try_current().is_err() {
            return false;
        }
        FrameTicker::new(config).spawn(ctx.cancel_token(), on_frame);
        true
    }

    fn dispose(&self) {
        self.calls.lock().push("dispose".to_string());
        self.engine_live.store(false, Ordering::SeqCst);
        self.dispose_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// A plugin tapping every stage hook and logging `<name>:<hook>` per call.
///
/// Several recorders can share one log to observe ordering across plugins.
#[derive(Debug, Clone)]
pub struct RecordingPlugin {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    fail_at: Option<Stage>,
}

impl RecordingPlugin {
    /// Creates a recorder with its own log.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log: Arc::new(Mutex::new(Vec::new())),
            fail_at: None,
        }
    }

    /// Records into `log` instead.
    #[must_use]
    pub fn with_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.log = log;
        self
    }

    /// Makes the tap on `stage` fail after recording.
    #[must_use]
    pub fn failing_at(mut self, stage: Stage) -> Self {
        self.fail_at = Some(stage);
        self
    }

    /// Returns the recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn recorder(&self, stage: Stage) -> impl Fn() -> anyhow::Result<()> + Send + Sync + 'static {
        let log = Arc::clone(&self.log);
        let entry = format!("{}:{}", self.name, stage);
        let fail = self.fail_at == Some(stage);
        move || {
            log.lock().push(entry.clone());
            if fail {
                anyhow::bail!("{entry} failed");
            }
            Ok(())
        }
    }
}

impl Plugin for RecordingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, pipeline: &Pipeline) {
        let hooks = pipeline.hooks();
        let name = self.name.as_str();

        let rec = self.recorder(Stage::InitEngine);
        hooks.init_engine.tap(name, move |_| rec().map(|()| None));
        let rec = self.recorder(Stage::ResourceLoad);
        hooks.resource_load.tap(name, move |_| rec().map(|()| None));
        let rec = self.recorder(Stage::ResourceParse);
        hooks.resource_parse.tap(name, move |_| rec().map(|()| None));
        let rec = self.recorder(Stage::BuildScene);
        hooks.build_scene.tap(name, move |_| rec().map(|()| None));
        let rec = self.recorder(Stage::RenderLoop);
        hooks.render_loop.tap(name, move |_| rec());
        let rec = self.recorder(Stage::PostProcess);
        hooks.post_process.tap(name, move |_| rec());
        let rec = self.recorder(Stage::Dispose);
        hooks.dispose.tap(name, move |_| rec());
    }
}

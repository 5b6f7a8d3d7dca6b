//! The seven stage hooks a pipeline exposes to plugins.

use crate::context::SharedContext;
use crate::core::Stage;
use crate::hooks::{
    AsyncTapFn, BailHook, Interceptor, ParallelHook, SeriesHook, SyncHook, SyncTapFn,
    WaterfallHook,
};
use std::sync::Arc;

/// Outcome of a `resourceParse` tap that wants to stop the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseVerdict {
    /// The resources are fine; skip the remaining validators.
    Accept,
    /// The resources are invalid; the run fails with a validation error.
    Reject(String),
}

impl ParseVerdict {
    /// Creates a rejection.
    #[must_use]
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject(reason.into())
    }
}

/// Interceptor usable on every stage hook.
pub trait StageInterceptor:
    Interceptor<AsyncTapFn<SharedContext, Option<SharedContext>>>
    + Interceptor<AsyncTapFn<SharedContext, Option<ParseVerdict>>>
    + Interceptor<AsyncTapFn<SharedContext, ()>>
    + Interceptor<SyncTapFn<SharedContext>>
{
}

impl<I> StageInterceptor for I where
    I: Interceptor<AsyncTapFn<SharedContext, Option<SharedContext>>>
        + Interceptor<AsyncTapFn<SharedContext, Option<ParseVerdict>>>
        + Interceptor<AsyncTapFn<SharedContext, ()>>
        + Interceptor<SyncTapFn<SharedContext>>
{
}

/// One hook per stage, each with its composition rule.
///
/// Taps are named after the plugin that registered them.
pub struct StageHooks {
    /// Creates engine, scene and camera. Waterfall: a tap may return a new context.
    pub init_engine: WaterfallHook<SharedContext>,
    /// Loads the model source. Waterfall.
    pub resource_load: WaterfallHook<SharedContext>,
    /// Validates parsed resources. Bail: the first verdict wins.
    pub resource_parse: BailHook<SharedContext, ParseVerdict>,
    /// Builds the scene. Waterfall.
    pub build_scene: WaterfallHook<SharedContext>,
    /// Per-frame work. Parallel.
    pub render_loop: ParallelHook<SharedContext>,
    /// Work after the render loop has started. Series.
    pub post_process: SeriesHook<SharedContext>,
    /// Teardown. Sync.
    pub dispose: SyncHook<SharedContext>,
}

impl Default for StageHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl StageHooks {
    /// Creates empty hooks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            init_engine: WaterfallHook::new(Stage::InitEngine.as_str()),
            resource_load: WaterfallHook::new(Stage::ResourceLoad.as_str()),
            resource_parse: BailHook::new(Stage::ResourceParse.as_str()),
            build_scene: WaterfallHook::new(Stage::BuildScene.as_str()),
            render_loop: ParallelHook::new(Stage::RenderLoop.as_str()),
            post_process: SeriesHook::new(Stage::PostProcess.as_str()),
            dispose: SyncHook::new(Stage::Dispose.as_str()),
        }
    }

    /// Returns the hook names in stage order.
    #[must_use]
    pub fn hook_names(&self) -> [&'static str; 7] {
        [
            self.init_engine.name(),
            self.resource_load.name(),
            self.resource_parse.name(),
            self.build_scene.name(),
            self.render_loop.name(),
            self.post_process.name(),
            self.dispose.name(),
        ]
    }

    /// Returns the tap names registered on `stage`'s hook.
    #[must_use]
    pub fn tap_names(&self, stage: Stage) -> Vec<String> {
        match stage {
            Stage::InitEngine => self.init_engine.tap_names(),
            Stage::ResourceLoad => self.resource_load.tap_names(),
            Stage::ResourceParse => self.resource_parse.tap_names(),
            Stage::BuildScene => self.build_scene.tap_names(),
            Stage::RenderLoop => self.render_loop.tap_names(),
            Stage::PostProcess => self.post_process.tap_names(),
            Stage::Dispose => self.dispose.tap_names(),
        }
    }

    /// Returns the number of taps on `stage`'s hook.
    #[must_use]
    pub fn tap_count(&self, stage: Stage) -> usize {
        match stage {
            Stage::InitEngine => self.init_engine.len(),
            Stage::ResourceLoad => self.resource_load.len(),
            Stage::ResourceParse => self.resource_parse.len(),
            Stage::BuildScene => self.build_scene.len(),
            Stage::RenderLoop => self.render_loop.len(),
            Stage::PostProcess => self.post_process.len(),
            Stage::Dispose => self.dispose.len(),
        }
    }

    /// Removes every tap named `name` from every hook.
    pub fn remove_taps(&self, name: &str) -> usize {
        self.init_engine.remove_taps(name)
            + self.resource_load.remove_taps(name)
            + self.resource_parse.remove_taps(name)
            + self.build_scene.remove_taps(name)
            + self.render_loop.remove_taps(name)
            + self.post_process.remove_taps(name)
            + self.dispose.remove_taps(name)
    }

    /// Installs `interceptor` on all seven hooks.
    pub fn intercept_all<I: StageInterceptor + 'static>(&self, interceptor: Arc<I>) {
        self.init_engine.intercept(interceptor.clone());
        self.resource_load.intercept(interceptor.clone());
        self.resource_parse.intercept(interceptor.clone());
        self.build_scene.intercept(interceptor.clone());
        self.render_loop.intercept(interceptor.clone());
        self.post_process.intercept(interceptor.clone());
        self.dispose.intercept(interceptor);
    }
}

impl std::fmt::Debug for StageHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for stage in Stage::ALL {
            map.entry(&stage.as_str(), &self.tap_names(stage));
        }
        map.finish()
    }
}

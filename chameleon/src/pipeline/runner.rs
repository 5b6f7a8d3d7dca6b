//! The pipeline: hook registry, adapter and the public run API.

use super::StageHooks;
use crate::adapter::EngineAdapter;
use crate::cancellation::CleanupFailure;
use crate::config::PipelineConfig;
use crate::context::{RenderingContext, SharedContext};
use crate::core::{MountTarget, RenderRequest, Stage};
use crate::errors::PipelineError;
use crate::events::EventBus;
use crate::hooks::TapFailure;
use crate::interceptors::HookLogger;
use crate::observability::{LogSink, PipelineLogger, TracingLogSink};
use crate::plugins::Plugin;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// A failed [`Pipeline::run`].
///
/// Carries the context (when one was created) so callers can inspect
/// `metadata().failed_stage()` and whatever the stages left behind.
#[derive(Debug)]
pub struct RunError {
    /// The error that stopped the run.
    pub error: PipelineError,
    /// The context of the failed run; `None` if the request was rejected
    /// before a context was created.
    pub context: Option<SharedContext>,
}

impl RunError {
    /// Returns the stage whose hook failed, if any.
    #[must_use]
    pub fn failed_stage(&self) -> Option<Stage> {
        self.context
            .as_ref()
            .and_then(|ctx| ctx.metadata().failed_stage())
    }

    /// Discards the context and returns the error.
    #[must_use]
    pub fn into_error(self) -> PipelineError {
        self.error
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

impl From<RunError> for PipelineError {
    fn from(err: RunError) -> Self {
        err.error
    }
}

/// What went wrong while tearing a context down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisposeReport {
    /// `dispose` hook taps that errored or panicked.
    pub tap_failures: Vec<TapFailure>,
    /// Stage cleanups that errored, panicked or timed out.
    pub cleanup_failures: Vec<CleanupFailure>,
}

impl DisposeReport {
    /// Returns true if every tap and cleanup succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.tap_failures.is_empty() && self.cleanup_failures.is_empty()
    }
}

/// Runs the fixed stage sequence against one engine adapter.
///
/// Plugins persist across runs; each [`Pipeline::run`] gets its own context.
pub struct Pipeline {
    pub(super) adapter: Arc<dyn EngineAdapter>,
    pub(super) hooks: Arc<StageHooks>,
    pub(super) config: PipelineConfig,
    logger: Mutex<Option<Arc<HookLogger>>>,
}

impl Pipeline {
    /// Creates a pipeline with the default configuration.
    #[must_use]
    pub fn new(adapter: Arc<dyn EngineAdapter>) -> Self {
        Self::with_config(adapter, PipelineConfig::default())
    }

    /// Creates a pipeline with `config`.
    #[must_use]
    pub fn with_config(adapter: Arc<dyn EngineAdapter>, config: PipelineConfig) -> Self {
        let pipeline = Self {
            adapter,
            hooks: Arc::new(StageHooks::new()),
            config,
            logger: Mutex::new(None),
        };
        if pipeline.config.log_hooks {
            pipeline.attach_logger(Arc::new(TracingLogSink));
        }
        pipeline
    }

    /// Returns the stage hooks.
    #[must_use]
    pub fn hooks(&self) -> &StageHooks {
        &self.hooks
    }

    /// Returns the adapter.
    #[must_use]
    pub fn adapter(&self) -> &Arc<dyn EngineAdapter> {
        &self.adapter
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Installs a plugin.
    pub fn use_plugin(&self, plugin: &dyn Plugin) -> &Self {
        debug!(plugin = %plugin.name(), "Installing plugin");
        plugin.apply(self);
        self
    }

    /// Installs plugins in order.
    pub fn use_preset(&self, plugins: &[Arc<dyn Plugin>]) -> &Self {
        for plugin in plugins {
            self.use_plugin(plugin.as_ref());
        }
        self
    }

    /// Removes every tap named `name` from every hook.
    ///
    /// Returns whether anything was removed.
    pub fn uninstall(&self, name: &str) -> bool {
        let removed = self.hooks.remove_taps(name);
        debug!(plugin = %name, removed, "Uninstalled plugin taps");
        removed > 0
    }

    /// Calls the plugin's `unapply`, then removes its taps.
    pub fn uninstall_plugin(&self, plugin: &dyn Plugin) -> bool {
        plugin.unapply(self);
        self.uninstall(plugin.name())
    }

    /// Times every tap on every hook and reports to `sink`.
    ///
    /// The pipeline keeps a single [`HookLogger`]. The first call installs it
    /// on all seven hooks; later calls, including after `log_hooks`, add
    /// `sink` to that logger. Returns the installed logger.
    pub fn attach_logger(&self, sink: Arc<dyn LogSink>) -> Arc<HookLogger> {
        let mut installed = self.logger.lock();
        if let Some(logger) = installed.as_ref() {
            logger.add_sink(sink);
            debug!(sinks = logger.sinks().len(), "Added sink to hook logger");
            return Arc::clone(logger);
        }

        let logger = Arc::new(HookLogger::new(sink));
        self.hooks.intercept_all(Arc::clone(&logger));
        *installed = Some(Arc::clone(&logger));
        logger
    }

    /// Attaches a new in-memory [`PipelineLogger`] bounded by
    /// `log_capacity` and returns it.
    pub fn attach_collector(&self) -> Arc<PipelineLogger> {
        let collector = Arc::new(match self.config.log_capacity {
            Some(capacity) => PipelineLogger::with_capacity(capacity),
            None => PipelineLogger::new(),
        });
        self.attach_logger(collector.clone());
        collector
    }

    /// Builds a fresh context for `request` according to the configuration.
    #[must_use]
    pub fn create_context(&self, container: MountTarget, request: RenderRequest) -> SharedContext {
        let mut ctx = RenderingContext::new(request, container, Arc::clone(&self.adapter))
            .with_cleanup_timeout(self.config.cleanup_timeout());
        if self.config.event_bus {
            ctx = ctx.with_event_bus(Arc::new(EventBus::new()));
        }
        ctx.into_shared()
    }

    /// Runs every stage for `request`.
    ///
    /// On failure the context is torn down (token cancelled, `dispose` hook
    /// and all stage cleanups attempted) and the original error is returned.
    pub async fn run(
        &self,
        container: MountTarget,
        request: RenderRequest,
    ) -> Result<SharedContext, RunError> {
        if let Err(error) = request.validate() {
            return Err(RunError {
                error,
                context: None,
            });
        }

        let mut ctx = self.create_context(container, request);
        info!(
            run_id = %ctx.run_id(),
            request = %ctx.request().id,
            adapter = %self.adapter.name(),
            "Starting pipeline run"
        );

        let token = ctx.cancel_token();
        match self.execute_stages(&Stage::SEQUENCE, &mut ctx, &token).await {
            Ok(()) => {
                info!(run_id = %ctx.run_id(), "Pipeline run completed");
                Ok(ctx)
            }
            Err(error) => {
                self.handle_failure(&ctx, &token, &error).await;
                Err(RunError {
                    error,
                    context: Some(ctx),
                })
            }
        }
    }

    /// Re-runs the sequence from `start` on an existing context.
    ///
    /// The current token is cancelled and replaced, cleanups of every
    /// re-entered stage run before any stage does, and their completion flags
    /// are reset. If the engine is missing, `initEngine` runs first.
    pub async fn run_from(
        &self,
        start: Stage,
        ctx: &SharedContext,
    ) -> Result<SharedContext, PipelineError> {
        let stages = start.sequence_from()?;

        let token = ctx.replace_cancel_token(format!("superseded by run_from({start})"));
        ctx.set_running(false);
        info!(run_id = %ctx.run_id(), start = %start, "Re-running pipeline");

        for &stage in stages {
            ctx.run_stage_cleanups(stage).await;
            ctx.metadata().mark_stage_completed(stage, false);
        }
        ctx.metadata().set_failed_stage(None);

        let mut current = Arc::clone(ctx);
        let mut result = Ok(());
        if start != Stage::InitEngine && !current.has_engine() && !self.adapter.has_engine() {
            debug!(run_id = %current.run_id(), "No engine present, bootstrapping initEngine");
            result = self
                .execute_stages(&[Stage::InitEngine], &mut current, &token)
                .await;
        }
        if result.is_ok() {
            result = self.execute_stages(stages, &mut current, &token).await;
        }

        match result {
            Ok(()) => Ok(current),
            Err(error) => {
                self.handle_failure(&current, &token, &error).await;
                Err(error)
            }
        }
    }

    /// Executes `stages` in order on `ctx` without any failure teardown.
    ///
    /// The abort check uses the token `ctx` carries when the call starts.
    /// Returns the context the stages ended with, which differs from `ctx`
    /// when a waterfall tap replaced it.
    pub async fn run_stages(
        &self,
        stages: &[Stage],
        ctx: &SharedContext,
    ) -> Result<SharedContext, PipelineError> {
        let token = ctx.cancel_token();
        let mut current = Arc::clone(ctx);
        self.execute_stages(stages, &mut current, &token).await?;
        Ok(current)
    }

    /// Tears `ctx` down and disposes the adapter.
    ///
    /// Every `dispose` tap and every stage cleanup is attempted; failures are
    /// logged and reported, never raised.
    pub async fn dispose(&self, ctx: &SharedContext) -> DisposeReport {
        let report = self.teardown(ctx, "pipeline disposed").await;
        self.adapter.dispose();
        info!(
            run_id = %ctx.run_id(),
            tap_failures = report.tap_failures.len(),
            cleanup_failures = report.cleanup_failures.len(),
            "Pipeline disposed"
        );
        report
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("adapter", &self.adapter.name())
            .field("hooks", &self.hooks)
            .field("config", &self.config)
            .field("logger", &self.logger.lock().is_some())
            .finish()
    }
}

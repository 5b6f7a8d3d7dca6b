//! Stage execution, render-loop dispatch and failure teardown.

use super::{DisposeReport, ParseVerdict, Pipeline};
use crate::adapter::FrameCallback;
use crate::cancellation::CancellationToken;
use crate::context::SharedContext;
use crate::core::Stage;
use crate::errors::{PipelineError, ValidationError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

impl Pipeline {
    /// Runs `stages` in order, adopting any context a waterfall tap returns.
    ///
    /// `token` is the token the segment started under. It is checked before
    /// every stage, so a segment superseded by `run_from` stops at its next
    /// boundary even though the context now carries a live token. The
    /// current context's own token is checked as well, for taps that return a
    /// context with a different token.
    ///
    /// `ctx` always holds the latest context, including after a failure.
    pub(super) async fn execute_stages(
        &self,
        stages: &[Stage],
        ctx: &mut SharedContext,
        token: &CancellationToken,
    ) -> Result<(), PipelineError> {
        for &stage in stages {
            let current = ctx.cancel_token();
            let cancelled = [token, current.as_ref()]
                .into_iter()
                .find(|t| t.is_cancelled());
            if let Some(cancelled) = cancelled {
                let reason = cancelled.reason();
                warn!(run_id = %ctx.run_id(), stage = %stage, reason = ?reason, "Pipeline aborted");
                return Err(PipelineError::aborted(stage, reason));
            }

            debug!(run_id = %ctx.run_id(), stage = %stage, hook = %stage.hook_kind(), "Stage starting");
            let started = Instant::now();

            match self.execute_stage(stage, ctx).await {
                Ok(next) => {
                    if let Some(next) = next {
                        *ctx = next;
                    }
                    ctx.metadata().mark_stage_completed(stage, true);
                    debug!(
                        run_id = %ctx.run_id(),
                        stage = %stage,
                        duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                        "Stage completed"
                    );
                }
                Err(err) => {
                    ctx.metadata().set_failed_stage(Some(stage));
                    error!(run_id = %ctx.run_id(), stage = %stage, error = %err, "Stage failed");
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Runs one stage's hook. Waterfall stages return the resulting context.
    async fn execute_stage(
        &self,
        stage: Stage,
        ctx: &SharedContext,
    ) -> Result<Option<SharedContext>, PipelineError> {
        let arg = Arc::clone(ctx);
        match stage {
            Stage::InitEngine => Ok(Some(self.hooks.init_engine.call(arg).await?)),
            Stage::ResourceLoad => Ok(Some(self.hooks.resource_load.call(arg).await?)),
            Stage::ResourceParse => match self.hooks.resource_parse.call(arg).await? {
                Some(ParseVerdict::Reject(reason)) => Err(ValidationError::new(stage, reason).into()),
                Some(ParseVerdict::Accept) | None => Ok(None),
            },
            Stage::BuildScene => Ok(Some(self.hooks.build_scene.call(arg).await?)),
            Stage::RenderLoop => {
                self.start_render_loop(arg).await?;
                Ok(None)
            }
            Stage::PostProcess => {
                self.hooks.post_process.call(arg).await?;
                Ok(None)
            }
            Stage::Dispose => Err(PipelineError::StageNotInSequence(stage)),
        }
    }

    /// Hands the adapter a frame callback, or runs `renderLoop` once if the
    /// adapter has no driver.
    async fn start_render_loop(&self, ctx: SharedContext) -> Result<(), PipelineError> {
        ctx.set_running(true);
        let on_frame = self.frame_callback(&ctx)?;
        if self.adapter.start_render_loop(Arc::clone(&ctx), on_frame) {
            debug!(run_id = %ctx.run_id(), adapter = %self.adapter.name(), "Render loop driven by adapter");
            return Ok(());
        }

        debug!(run_id = %ctx.run_id(), "Adapter has no render loop, running renderLoop once");
        self.hooks.render_loop.call(ctx).await?;
        Ok(())
    }

    /// Builds the per-frame callback.
    ///
    /// Each frame is counted on the context and the `renderLoop` hook is
    /// spawned without being awaited. The callback holds the context weakly
    /// and goes quiet once the token it was created under is cancelled.
    fn frame_callback(&self, ctx: &SharedContext) -> Result<FrameCallback, PipelineError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            PipelineError::Tap(anyhow::anyhow!("render loop requires a tokio runtime: {e}"))
        })?;
        let hooks = Arc::clone(&self.hooks);
        let token = ctx.cancel_token();
        let weak = Arc::downgrade(ctx);

        Ok(Arc::new(move |delta_ms| {
            if token.is_cancelled() {
                return;
            }
            let Some(ctx) = weak.upgrade() else {
                return;
            };
            ctx.record_frame(delta_ms);

            let hooks = Arc::clone(&hooks);
            runtime.spawn(async move {
                if let Err(err) = hooks.render_loop.call(Arc::clone(&ctx)).await {
                    warn!(run_id = %ctx.run_id(), error = %err, "renderLoop tap failed");
                    ctx.record_render_error(format!("{err:#}"));
                }
            });
        }))
    }

    /// Cancels the token, runs the `dispose` hook and every stage cleanup.
    pub(super) async fn teardown(&self, ctx: &SharedContext, reason: &str) -> DisposeReport {
        ctx.cancel(reason);
        ctx.set_running(false);

        let tap_failures = self.hooks.dispose.call_all(Arc::clone(ctx));
        for failure in &tap_failures {
            warn!(run_id = %ctx.run_id(), plugin = %failure.tap, error = %failure.error, "dispose tap failed");
        }

        let mut cleanup_failures = Vec::new();
        for &stage in Stage::SEQUENCE.iter().rev() {
            cleanup_failures.extend(ctx.run_stage_cleanups(stage).await);
        }

        DisposeReport {
            tap_failures,
            cleanup_failures,
        }
    }

    /// Teardown after a failed `run`/`run_from`.
    ///
    /// A segment aborted because `run_from` replaced its token leaves the
    /// context alone: the context now belongs to the newer segment.
    pub(super) async fn handle_failure(
        &self,
        ctx: &SharedContext,
        token: &Arc<CancellationToken>,
        err: &PipelineError,
    ) {
        let superseded = token.is_cancelled() && !Arc::ptr_eq(token, &ctx.cancel_token());
        if err.is_aborted() && superseded {
            debug!(run_id = %ctx.run_id(), error = %err, "Superseded segment stopped, skipping teardown");
            return;
        }

        let failed_stage = ctx.metadata().failed_stage();
        error!(
            run_id = %ctx.run_id(),
            failed_stage = ?failed_stage,
            error = %err,
            "Pipeline run failed, tearing down"
        );

        self.teardown(ctx, &format!("pipeline failed: {err}")).await;

        if failed_stage == Some(Stage::InitEngine) && self.config.dispose_adapter_on_init_failure {
            debug!(run_id = %ctx.run_id(), adapter = %self.adapter.name(), "Disposing adapter after initEngine failure");
            self.adapter.dispose();
        }
    }
}

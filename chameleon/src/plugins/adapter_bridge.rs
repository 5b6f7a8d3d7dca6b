//! Plugin that delegates the loading stages to the context's adapter.

use super::Plugin;
use crate::cancellation::StageCleanup;
use crate::core::Stage;
use crate::pipeline::Pipeline;
use tracing::error;

/// Routes `initEngine`, `resourceLoad`, `resourceParse` and `buildScene`
/// to the [`EngineAdapter`](crate::adapter::EngineAdapter).
///
/// Loaded and parsed assets are stored on the context and released by a
/// stage cleanup when the stage is re-entered.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdapterBridgePlugin;

impl AdapterBridgePlugin {
    /// The name the plugin's taps are registered under.
    pub const NAME: &'static str = "AdapterBridgePlugin";

    /// Creates the plugin.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for AdapterBridgePlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, pipeline: &Pipeline) {
        let hooks = pipeline.hooks();

        hooks.init_engine.tap_async(Self::NAME, |ctx| async move {
            let adapter = ctx.adapter().clone();
            let handles = adapter
                .init_engine(ctx.container(), &ctx, ctx.request().options.as_ref())
                .await
                .map_err(|err| {
                    error!(run_id = %ctx.run_id(), error = %err, "Adapter init_engine failed");
                    err
                })?;
            ctx.set_engine_handles(handles);
            Ok(None)
        });

        hooks.resource_load.tap_async(Self::NAME, |ctx| async move {
            let adapter = ctx.adapter().clone();
            let raw = adapter
                .load_resource(&ctx.request().source, &ctx)
                .await
                .map_err(|err| {
                    error!(run_id = %ctx.run_id(), error = %err, "Adapter load_resource failed");
                    err
                })?;
            ctx.set_raw_assets(Some(raw));
            ctx.metadata().add_stage_cleanup(
                Stage::ResourceLoad,
                StageCleanup::from_fn(|ctx| {
                    ctx.set_raw_assets(None);
                    Ok(())
                })
                .named(Self::NAME),
            );
            Ok(None)
        });

        hooks.resource_parse.tap_async(Self::NAME, |ctx| async move {
            let Some(raw) = ctx.raw_assets() else {
                return Ok(None);
            };
            let adapter = ctx.adapter().clone();
            let parsed = adapter
                .parse_resource(&raw, &ctx)
                .await
                .map_err(|err| {
                    error!(run_id = %ctx.run_id(), error = %err, "Adapter parse_resource failed");
                    err
                })?;
            ctx.set_parsed_gltf(Some(parsed));
            ctx.metadata().add_stage_cleanup(
                Stage::ResourceParse,
                StageCleanup::from_fn(|ctx| {
                    ctx.set_parsed_gltf(None);
                    Ok(())
                })
                .named(Self::NAME),
            );
            Ok(None)
        });

        hooks.build_scene.tap_async(Self::NAME, |ctx| async move {
            let Some(parsed) = ctx.parsed_gltf() else {
                return Ok(None);
            };
            let adapter = ctx.adapter().clone();
            adapter
                .build_scene(&parsed, &ctx)
                .await
                .map_err(|err| {
                    error!(run_id = %ctx.run_id(), error = %err, "Adapter build_scene failed");
                    err
                })?;
            Ok(None)
        });
    }
}

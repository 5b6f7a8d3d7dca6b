//! The engine adapter contract.
//!
//! The pipeline never talks to a rendering engine directly. Everything
//! engine-specific sits behind [`EngineAdapter`], which a backend implements
//! once and every plugin reaches through the context.

mod ticker;

pub use ticker::{FrameTicker, FrameTickerConfig};

use crate::context::{RenderingContext, SharedContext};
use crate::core::{Asset, EngineHandles, MountTarget, Source};
use async_trait::async_trait;
use std::sync::Arc;

/// Per-frame callback handed to [`EngineAdapter::start_render_loop`].
///
/// Takes the time since the previous frame in milliseconds.
pub type FrameCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// A rendering-engine backend.
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    /// Returns the adapter name.
    fn name(&self) -> &str;

    /// Returns true if the adapter already holds a live engine.
    fn has_engine(&self) -> bool {
        false
    }

    /// Creates the engine, scene and camera inside `container`.
    async fn init_engine(
        &self,
        container: &MountTarget,
        ctx: &RenderingContext,
        options: Option<&serde_json::Value>,
    ) -> anyhow::Result<EngineHandles>;

    /// Fetches or decodes the model source.
    async fn load_resource(&self, source: &Source, ctx: &RenderingContext) -> anyhow::Result<Asset>;

    /// Turns loaded resources into something the engine can build from.
    async fn parse_resource(&self, raw: &Asset, ctx: &RenderingContext) -> anyhow::Result<Asset>;

    /// Adds the parsed model to the scene.
    async fn build_scene(&self, parsed: &Asset, ctx: &RenderingContext) -> anyhow::Result<()>;

    /// Starts a render-loop driver calling `on_frame` until the context's
    /// token is cancelled.
    ///
    /// Returns false if the adapter has no driver, in which case the pipeline
    /// runs the `renderLoop` hook once instead.
    fn start_render_loop(&self, ctx: SharedContext, on_frame: FrameCallback) -> bool {
        let _ = (ctx, on_frame);
        false
    }

    /// Releases the engine. Must be idempotent.
    fn dispose(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mount, test_request};

    struct BareAdapter;

    #[async_trait]
    impl EngineAdapter for BareAdapter {
        fn name(&self) -> &str {
            "bare"
        }

        async fn init_engine(
            &self,
            _container: &MountTarget,
            _ctx: &RenderingContext,
            _options: Option<&serde_json::Value>,
        ) -> anyhow::Result<EngineHandles> {
            Ok(EngineHandles::default())
        }

        async fn load_resource(
            &self,
            source: &Source,
            _ctx: &RenderingContext,
        ) -> anyhow::Result<Asset> {
            Ok(Asset::Json(serde_json::json!({ "uri": source.as_url() })))
        }

        async fn parse_resource(
            &self,
            raw: &Asset,
            _ctx: &RenderingContext,
        ) -> anyhow::Result<Asset> {
            Ok(raw.clone())
        }

        async fn build_scene(&self, _parsed: &Asset, _ctx: &RenderingContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_methods() {
        let adapter: Arc<dyn EngineAdapter> = Arc::new(BareAdapter);
        let ctx = RenderingContext::new(test_request(), mount(), adapter.clone()).into_shared();

        assert!(!adapter.has_engine());
        assert!(!adapter.start_render_loop(ctx.clone(), Arc::new(|_| {})));
        adapter.dispose();
        adapter.dispose();

        let raw = adapter
            .load_resource(&ctx.request().source, &ctx)
            .await
            .unwrap();
        assert_eq!(
            raw.as_json().unwrap()["uri"],
            serde_json::json!("https://models.example/duck.gltf")
        );
    }
}

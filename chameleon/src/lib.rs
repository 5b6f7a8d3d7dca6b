//! # Chameleon
//!
//! An engine-agnostic, hook-based stage pipeline for loading and rendering
//! 3D models.
//!
//! Chameleon drives a fixed rendering lifecycle and lets plugins attach
//! behavior to each stage:
//!
//! - **Stage hooks**: `initEngine`, `resourceLoad`, `resourceParse`,
//!   `buildScene`, `renderLoop`, `postProcess` and `dispose`, each with its
//!   own composition rule (waterfall, bail, parallel, series, sync)
//! - **Engine adapters**: everything engine-specific sits behind one trait
//! - **Rendering context**: per-run state, stage cleanups and cancellation
//! - **Plugins and interceptors**: install, uninstall and instrument taps
//! - **Event bus**: per-run publish/subscribe between plugins
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chameleon::prelude::*;
//!
//! let pipeline = Pipeline::new(Arc::new(MyAdapter::new()));
//! pipeline
//!     .use_plugin(&AdapterBridgePlugin::new())
//!     .use_plugin(&GltfValidatorPlugin::new());
//!
//! let ctx = pipeline
//!     .run(handle(canvas), RenderRequest::new("duck", "models/duck.gltf"))
//!     .await?;
//!
//! // Later: reload the model without re-creating the engine.
//! let ctx = pipeline.run_from(Stage::ResourceLoad, &ctx).await?;
//! pipeline.dispose(&ctx).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod adapter;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod hooks;
pub mod interceptors;
pub mod observability;
pub mod pipeline;
pub mod plugins;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapter::{EngineAdapter, FrameCallback, FrameTicker, FrameTickerConfig};
    pub use crate::cancellation::{CancellationToken, CleanupFailure, StageCleanup};
    pub use crate::config::PipelineConfig;
    pub use crate::context::{RenderState, RenderingContext, SharedContext, StageMetadata};
    pub use crate::core::{
        handle, Asset, EngineHandles, Handle, HookKind, MountTarget, RenderRequest, Source, Stage,
    };
    pub use crate::errors::{PipelineError, ValidationError};
    pub use crate::events::{EventBus, ModelClickedPayload, SubscriptionId, MODEL_CLICKED};
    pub use crate::hooks::{
        BailHook, Interceptor, ParallelHook, SeriesHook, SyncHook, TapInfo, WaterfallHook,
    };
    pub use crate::interceptors::HookLogger;
    pub use crate::observability::{init_tracing, LogEntry, LogSink, PipelineLogger};
    pub use crate::pipeline::{DisposeReport, ParseVerdict, Pipeline, RunError, StageHooks};
    pub use crate::plugins::{AdapterBridgePlugin, GltfValidatorPlugin, Plugin};
    pub use std::sync::Arc;
}

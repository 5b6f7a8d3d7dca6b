//! The plugin contract and the stock plugins.

mod adapter_bridge;
mod validator;

pub use adapter_bridge::AdapterBridgePlugin;
pub use validator::GltfValidatorPlugin;

use crate::pipeline::Pipeline;

/// A unit of pipeline behavior installed by tapping stage hooks.
///
/// Taps should be registered under [`Plugin::name`] so that
/// `Pipeline::uninstall` can remove them.
pub trait Plugin: Send + Sync {
    /// Returns the plugin name.
    fn name(&self) -> &str;

    /// Registers the plugin's taps.
    fn apply(&self, pipeline: &Pipeline);

    /// Releases anything `apply` set up outside the hooks.
    fn unapply(&self, pipeline: &Pipeline) {
        let _ = pipeline;
    }
}

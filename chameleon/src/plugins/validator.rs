//! Plugin that rejects glTF documents without an asset version.

use super::Plugin;
use crate::core::Asset;
use crate::pipeline::{ParseVerdict, Pipeline};
use tracing::warn;

/// `resourceParse` tap rejecting a JSON glTF whose `asset` object exists but
/// whose `asset.version` is missing or falsy.
///
/// Anything else passes through to the remaining taps.
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfValidatorPlugin;

impl GltfValidatorPlugin {
    /// The name the plugin's tap is registered under.
    pub const NAME: &'static str = "GltfValidatorPlugin";

    /// Creates the plugin.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the rejection reason for `asset`, if it is invalid.
    #[must_use]
    pub fn check(asset: &Asset) -> Option<String> {
        let document = asset.as_json()?;
        let info = document.get("asset")?;
        if !is_truthy(Some(info)) || is_truthy(info.get("version")) {
            return None;
        }
        Some("glTF missing asset.version".to_string())
    }
}

fn is_truthy(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

impl Plugin for GltfValidatorPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, pipeline: &Pipeline) {
        pipeline.hooks().resource_parse.tap(Self::NAME, |ctx| {
            let verdict = ctx.raw_assets().as_ref().and_then(Self::check).map(|reason| {
                warn!(run_id = %ctx.run_id(), reason = %reason, "Rejecting resources");
                ParseVerdict::Reject(reason)
            });
            Ok(verdict)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_versions() {
        let missing = Asset::Json(json!({"asset": {}}));
        let empty = Asset::Json(json!({"asset": {"version": ""}}));
        let zero = Asset::Json(json!({"asset": {"version": 0}}));
        let falsy = Asset::Json(json!({"asset": {"version": false}}));
        let ok = Asset::Json(json!({"asset": {"version": "2.0"}}));
        let no_asset = Asset::Json(json!({"scenes": []}));
        let binary = Asset::Binary(vec![0x67, 0x6c, 0x54, 0x46]);

        for invalid in [&missing, &empty, &zero, &falsy] {
            assert_eq!(
                GltfValidatorPlugin::check(invalid).as_deref(),
                Some("glTF missing asset.version")
            );
        }
        for valid in [&ok, &no_asset, &binary] {
            assert_eq!(GltfValidatorPlugin::check(valid), None);
        }
    }
}

//! Render requests.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};

/// Where the model to render comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Source {
    /// A URL or path the adapter knows how to fetch.
    Url(String),
    /// An already-parsed document (e.g. glTF JSON).
    Inline(serde_json::Value),
    /// Raw bytes (e.g. a GLB blob).
    Binary(Vec<u8>),
}

impl Source {
    /// Returns true if the source carries nothing to load.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Url(url) => url.trim().is_empty(),
            Self::Inline(value) => value.is_null(),
            Self::Binary(bytes) => bytes.is_empty(),
        }
    }

    /// Returns the URL if this is a URL source.
    #[must_use]
    pub fn as_url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            _ => None,
        }
    }
}

impl From<&str> for Source {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for Source {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<serde_json::Value> for Source {
    fn from(value: serde_json::Value) -> Self {
        Self::Inline(value)
    }
}

/// Immutable description of what to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Caller-chosen request id.
    pub id: String,
    /// The model source.
    pub source: Source,
    /// Adapter-specific options, forwarded to `init_engine`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
    /// Opaque caller data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,
}

impl RenderRequest {
    /// Creates a request with no options or user data.
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<Source>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            options: None,
            user_data: None,
        }
    }

    /// Sets the adapter options.
    #[must_use]
    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = Some(options);
        self
    }

    /// Sets the user data.
    #[must_use]
    pub fn with_user_data(mut self, user_data: serde_json::Value) -> Self {
        self.user_data = Some(user_data);
        self
    }

    /// Checks the preconditions `run` relies on.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] when the source is empty.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.source.is_empty() {
            return Err(PipelineError::InvalidRequest(format!(
                "request '{}' has an empty source",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = RenderRequest::new("demo", "model.gltf")
            .with_options(json!({"antialias": true}))
            .with_user_data(json!({"owner": "viewer"}));

        assert_eq!(request.id, "demo");
        assert_eq!(request.source.as_url(), Some("model.gltf"));
        assert_eq!(request.options, Some(json!({"antialias": true})));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_empty_sources_are_rejected() {
        assert!(RenderRequest::new("a", "  ").validate().is_err());
        assert!(RenderRequest::new("b", Source::Binary(Vec::new())).validate().is_err());
        assert!(RenderRequest::new("c", serde_json::Value::Null).validate().is_err());
        assert!(RenderRequest::new("d", json!({"asset": {}})).validate().is_ok());
    }

    #[test]
    fn test_source_serialize_is_tagged() {
        let json = serde_json::to_value(Source::from("model.glb")).unwrap();
        assert_eq!(json, json!({"kind": "url", "value": "model.glb"}));

        let request: RenderRequest = serde_json::from_value(json!({
            "id": "x",
            "source": {"kind": "inline", "value": {"asset": {"version": "2.0"}}}
        }))
        .unwrap();
        assert_eq!(request.source, Source::Inline(json!({"asset": {"version": "2.0"}})));
        assert!(request.options.is_none());
    }
}

//! Error types for the pipeline.
//!
//! Tap and adapter callbacks return [`anyhow::Result`], so whatever error a
//! plugin raises reaches the caller of `run`/`run_from` unchanged inside
//! [`PipelineError::Tap`]. Everything else the core itself can signal is a
//! dedicated variant.

use crate::core::Stage;
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A plugin tap (or the adapter it called) failed. Displayed as the
    /// original error.
    #[error(transparent)]
    Tap(#[from] anyhow::Error),

    /// A `resourceParse` tap rejected the loaded resources.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The context's cancellation token was observed at a stage boundary.
    #[error("Pipeline aborted before stage '{stage}': {}", .reason.as_deref().unwrap_or("no reason given"))]
    Aborted {
        /// The stage that was about to start.
        stage: Stage,
        /// The cancellation reason, if one was given.
        reason: Option<String>,
    },

    /// A stage name did not match any known stage.
    #[error("Unknown stage \"{0}\"")]
    UnknownStage(String),

    /// The stage exists but is not part of the executed sequence.
    #[error("Stage '{0}' is not part of the pipeline sequence")]
    StageNotInSequence(Stage),

    /// The render request failed its preconditions.
    #[error("Invalid render request: {0}")]
    InvalidRequest(String),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Creates an abort error.
    #[must_use]
    pub fn aborted(stage: Stage, reason: Option<String>) -> Self {
        Self::Aborted { stage, reason }
    }

    /// Returns true if this is an abort.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Returns true if this is a validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns the tap's own error, if a tap failed.
    #[must_use]
    pub fn tap_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Tap(err) => Some(err),
            _ => None,
        }
    }

    /// Downcasts the tap's own error to a concrete type.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        self.tap_error().and_then(|err| err.downcast_ref::<E>())
    }

    /// Converts to a structured representation for logs and tooling.
    #[must_use]
    pub fn to_json(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        let kind = match self {
            Self::Tap(_) => "tap",
            Self::Validation(_) => "validation",
            Self::Aborted { .. } => "aborted",
            Self::UnknownStage(_) => "unknown_stage",
            Self::StageNotInSequence(_) => "stage_not_in_sequence",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Config(_) => "config",
        };
        map.insert("type".to_string(), serde_json::json!(kind));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::Validation(err) => {
                map.insert("stage".to_string(), serde_json::json!(err.stage));
            }
            Self::Aborted { stage, reason } => {
                map.insert("stage".to_string(), serde_json::json!(stage));
                if let Some(reason) = reason {
                    map.insert("reason".to_string(), serde_json::json!(reason));
                }
            }
            Self::StageNotInSequence(stage) => {
                map.insert("stage".to_string(), serde_json::json!(stage));
            }
            _ => {}
        }

        map
    }
}

/// Raised when a bail tap rejects the resources it inspected.
#[derive(Debug, Clone, Error)]
#[error("Pipeline: {stage} validation failed: {message}")]
pub struct ValidationError {
    /// The stage whose bail hook rejected.
    pub stage: Stage,
    /// Why the resources were rejected.
    pub message: String,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("texture missing: {0}")]
    struct TextureMissing(String);

    #[test]
    fn test_tap_error_is_not_wrapped() {
        let err = PipelineError::from(anyhow::Error::new(TextureMissing("albedo".into())));

        assert_eq!(err.to_string(), "texture missing: albedo");
        let inner = err.downcast_ref::<TextureMissing>().unwrap();
        assert_eq!(inner.0, "albedo");
        assert!(!err.is_aborted());
    }

    #[test]
    fn test_aborted_display() {
        let err = PipelineError::aborted(Stage::BuildScene, Some("superseded".into()));
        assert_eq!(
            err.to_string(),
            "Pipeline aborted before stage 'buildScene': superseded"
        );
        assert!(err.is_aborted());

        let err = PipelineError::aborted(Stage::InitEngine, None);
        assert!(err.to_string().ends_with("no reason given"));
    }

    #[test]
    fn test_validation_error_to_json() {
        let err: PipelineError =
            ValidationError::new(Stage::ResourceParse, "glTF missing asset.version").into();
        assert!(err.is_validation());

        let json = err.to_json();
        assert_eq!(json.get("type").unwrap(), "validation");
        assert_eq!(json.get("stage").unwrap(), "resourceParse");
        assert!(json
            .get("message")
            .unwrap()
            .as_str()
            .unwrap()
            .contains("asset.version"));
    }
}

//! Well-known event names and their payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Emitted when the user clicks a rendered model.
pub const MODEL_CLICKED: &str = "model:clicked";

/// Payload of [`MODEL_CLICKED`].
///
/// Keep it small and serializable so engine objects are not retained across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelClickedPayload {
    /// The request that rendered the clicked model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// When the click happened.
    pub timestamp: DateTime<Utc>,
    /// Engine-specific reference to the clicked entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_entity: Option<serde_json::Value>,
}

impl ModelClickedPayload {
    /// Creates a payload stamped with the current time.
    #[must_use]
    pub fn now(request_id: Option<String>) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
            target_entity: None,
        }
    }

    /// Sets the clicked entity.
    #[must_use]
    pub fn with_target(mut self, target: serde_json::Value) -> Self {
        self.target_entity = Some(target);
        self
    }
}

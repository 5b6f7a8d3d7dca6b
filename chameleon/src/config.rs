//! Pipeline configuration.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Per-cleanup timeout in milliseconds. `0` disables the timeout.
    #[serde(default = "default_cleanup_timeout_ms")]
    pub cleanup_timeout_ms: u64,
    /// Whether each context gets its own event bus.
    #[serde(default = "default_event_bus")]
    pub event_bus: bool,
    /// Whether to log every tap through `tracing` from construction on.
    #[serde(default)]
    pub log_hooks: bool,
    /// Record limit for collectors made by `Pipeline::attach_collector`.
    /// `None` keeps every record.
    #[serde(default)]
    pub log_capacity: Option<usize>,
    /// Whether a failing `initEngine` stage disposes the adapter.
    #[serde(default = "default_dispose_adapter_on_init_failure")]
    pub dispose_adapter_on_init_failure: bool,
}

fn default_cleanup_timeout_ms() -> u64 {
    5_000
}

fn default_event_bus() -> bool {
    true
}

fn default_dispose_adapter_on_init_failure() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cleanup_timeout_ms: default_cleanup_timeout_ms(),
            event_bus: default_event_bus(),
            log_hooks: false,
            log_capacity: None,
            dispose_adapter_on_init_failure: default_dispose_adapter_on_init_failure(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(json).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Sets the cleanup timeout.
    #[must_use]
    pub fn with_cleanup_timeout_ms(mut self, ms: u64) -> Self {
        self.cleanup_timeout_ms = ms;
        self
    }

    /// Enables or disables per-context event buses.
    #[must_use]
    pub fn with_event_bus(mut self, enabled: bool) -> Self {
        self.event_bus = enabled;
        self
    }

    /// Enables or disables tap logging through `tracing`.
    #[must_use]
    pub fn with_log_hooks(mut self, enabled: bool) -> Self {
        self.log_hooks = enabled;
        self
    }

    /// Bounds collectors to the newest `capacity` records.
    #[must_use]
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = Some(capacity);
        self
    }

    /// Controls whether an `initEngine` failure disposes the adapter.
    #[must_use]
    pub fn with_dispose_adapter_on_init_failure(mut self, enabled: bool) -> Self {
        self.dispose_adapter_on_init_failure = enabled;
        self
    }

    /// Gets the cleanup timeout as a Duration, `None` when disabled.
    #[must_use]
    pub fn cleanup_timeout(&self) -> Option<Duration> {
        (self.cleanup_timeout_ms > 0).then(|| Duration::from_millis(self.cleanup_timeout_ms))
    }
}

//! Test fixtures.

use super::MockAdapter;
use crate::context::{RenderingContext, SharedContext};
use crate::core::{handle, MountTarget, RenderRequest};
use crate::events::EventBus;
use std::sync::Arc;

/// Source URL of [`test_request`].
pub const TEST_SOURCE_URL: &str = "https://models.example/duck.gltf";

/// Returns a placeholder mount target.
#[must_use]
pub fn mount() -> MountTarget {
    handle("test-canvas")
}

/// Returns a request for [`TEST_SOURCE_URL`] with id `req-1`.
#[must_use]
pub fn test_request() -> RenderRequest {
    RenderRequest::new("req-1", TEST_SOURCE_URL)
}

/// Returns a context backed by a fresh [`MockAdapter`], with an event bus.
#[must_use]
pub fn test_context() -> SharedContext {
    RenderingContext::new(test_request(), mount(), Arc::new(MockAdapter::new()))
        .with_event_bus(Arc::new(EventBus::new()))
        .into_shared()
}

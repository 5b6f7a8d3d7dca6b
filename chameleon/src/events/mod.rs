//! Event bus for signaling between plugins during a run.
//!
//! Each rendering context may carry its own [`EventBus`]; plugins reach it
//! through `RenderingContext::on_event` and `RenderingContext::emit_event`.

mod bus;
mod names;

pub use bus::{EventBus, SubscriptionId};
pub use names::{ModelClickedPayload, MODEL_CLICKED};

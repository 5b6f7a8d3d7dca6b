//! Hook primitives: ordered tap lists with a fixed composition rule.
//!
//! Every hook keeps its taps in registration order and names each tap after
//! the plugin that registered it. Five composition rules are provided:
//!
//! - [`SeriesHook`]: await taps one by one, stop at the first error
//! - [`WaterfallHook`]: thread a value through the taps
//! - [`BailHook`]: stop at the first tap that returns `Some`
//! - [`ParallelHook`]: run all taps concurrently
//! - [`SyncHook`]: synchronous taps, used for teardown
//!
//! [`Interceptor`]s rewrite taps as they are registered, including taps that
//! were registered before the interceptor was added.

mod bail;
mod parallel;
mod series;
mod sync;
pub(crate) mod tap;
mod waterfall;

pub use bail::BailHook;
pub use parallel::ParallelHook;
pub use series::SeriesHook;
pub use sync::SyncHook;
pub use tap::{AsyncTapFn, Interceptor, SyncTapFn, TapFailure, TapInfo};
pub use waterfall::WaterfallHook;

//! Interceptors applied to stage hook taps.

mod logger;

pub use logger::HookLogger;

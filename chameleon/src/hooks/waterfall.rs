//! Sequential hook that threads a value through its taps.

use super::tap::{async_hook_methods, TapRegistry};
use super::AsyncTapFn;

/// Runs taps in order, passing each the latest value.
///
/// A tap returning `Some(value)` replaces the value seen by later taps;
/// `None` leaves it unchanged. `call` resolves to the final value.
pub struct WaterfallHook<T> {
    registry: TapRegistry<AsyncTapFn<T, Option<T>>>,
}

impl<T: Clone + Send + 'static> WaterfallHook<T> {
    async_hook_methods!(Option<T>);

    /// Threads `arg` through every tap.
    pub async fn call(&self, arg: T) -> anyhow::Result<T> {
        let mut current = arg;
        for tap in self.registry.snapshot() {
            if let Some(next) = (tap.func)(current.clone()).await? {
                current = next;
            }
        }
        Ok(current)
    }
}

impl<T> std::fmt::Debug for WaterfallHook<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaterfallHook")
            .field("name", &self.registry.hook())
            .finish_non_exhaustive()
    }
}

//! Sequential hook whose taps run one after another.

use super::tap::{async_hook_methods, TapRegistry};
use super::AsyncTapFn;

/// Runs taps in registration order, awaiting each before the next.
///
/// The first tap error stops the chain and is returned unchanged.
pub struct SeriesHook<T> {
    registry: TapRegistry<AsyncTapFn<T, ()>>,
}

impl<T: Clone + Send + 'static> SeriesHook<T> {
    async_hook_methods!(());

    /// Calls every tap with a clone of `arg`.
    pub async fn call(&self, arg: T) -> anyhow::Result<()> {
        for tap in self.registry.snapshot() {
            (tap.func)(arg.clone()).await?;
        }
        Ok(())
    }
}

impl<T> std::fmt::Debug for SeriesHook<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesHook")
            .field("name", &self.registry.hook())
            .finish_non_exhaustive()
    }
}

//! Concurrent hook whose taps all start before any is awaited.

use super::tap::{async_hook_methods, TapRegistry};
use super::AsyncTapFn;
use futures::future::join_all;

/// Starts every tap concurrently and waits for all of them.
///
/// Taps that fail do not cancel their siblings; once all have settled the
/// first error in registration order is returned.
pub struct ParallelHook<T> {
    registry: TapRegistry<AsyncTapFn<T, ()>>,
}

impl<T: Clone + Send + 'static> ParallelHook<T> {
    async_hook_methods!(());

    /// Calls every tap concurrently with a clone of `arg`.
    pub async fn call(&self, arg: T) -> anyhow::Result<()> {
        let pending = self
            .registry
            .snapshot()
            .into_iter()
            .map(|tap| (tap.func)(arg.clone()));

        join_all(pending).await.into_iter().collect()
    }
}

impl<T> std::fmt::Debug for ParallelHook<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelHook")
            .field("name", &self.registry.hook())
            .finish_non_exhaustive()
    }
}

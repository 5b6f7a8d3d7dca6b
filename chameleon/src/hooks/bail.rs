//! Sequential hook that stops at the first tap with an answer.

use super::tap::{async_hook_methods, TapRegistry};
use super::AsyncTapFn;

/// Runs taps in order until one returns `Some`.
///
/// Later taps are skipped once a tap bails. `call` resolves to the bail
/// value, or `None` if every tap passed.
pub struct BailHook<T, B> {
    registry: TapRegistry<AsyncTapFn<T, Option<B>>>,
}

impl<T: Clone + Send + 'static, B: Send + 'static> BailHook<T, B> {
    async_hook_methods!(Option<B>);

    /// Calls taps until one bails.
    pub async fn call(&self, arg: T) -> anyhow::Result<Option<B>> {
        for tap in self.registry.snapshot() {
            if let Some(value) = (tap.func)(arg.clone()).await? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

impl<T, B> std::fmt::Debug for BailHook<T, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BailHook")
            .field("name", &self.registry.hook())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_bail_wins() {
        let hook = BailHook::<u8, &'static str>::new("resourceParse");
        let later = Arc::new(AtomicUsize::new(0));

        hook.tap("pass", |_| Ok(None));
        hook.tap("reject", |n| Ok((n > 3).then_some("too big")));
        let counter = later.clone();
        hook.tap("later", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some("later"))
        });

        assert_eq!(hook.call(9).await.unwrap(), Some("too big"));
        assert_eq!(later.load(Ordering::SeqCst), 0);

        assert_eq!(hook.call(1).await.unwrap(), Some("later"));
        assert_eq!(later.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_pass_returns_none() {
        let hook = BailHook::<(), u8>::new("resourceParse");
        hook.tap("a", |()| Ok(None));
        hook.tap_async("b", |()| async { Ok(None) });

        assert_eq!(hook.call(()).await.unwrap(), None);
    }
}

//! Tap records, interceptors and the registry every hook is built on.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use futures::future::BoxFuture;

/// An async tap: takes the hook argument, resolves to the tap's result.
pub type AsyncTapFn<T, R> =
    Arc<dyn Fn(T) -> BoxFuture<'static, anyhow::Result<R>> + Send + Sync>;

/// A synchronous tap.
pub type SyncTapFn<T> = Arc<dyn Fn(T) -> anyhow::Result<()> + Send + Sync>;

/// A registered tap.
///
/// `name` is the owning plugin's name; taps with the same name are removed
/// together when the plugin is uninstalled.
#[derive(Clone)]
pub struct TapInfo<F> {
    /// The name of the hook this tap is registered on.
    pub hook: &'static str,
    /// The owning plugin's name.
    pub name: String,
    /// The tap function.
    pub func: F,
    instrumented: bool,
}

impl<F> TapInfo<F> {
    /// Creates a tap record.
    pub fn new(hook: &'static str, name: impl Into<String>, func: F) -> Self {
        Self {
            hook,
            name: name.into(),
            func,
            instrumented: false,
        }
    }

    /// Returns true if an instrumenting interceptor has already wrapped this tap.
    #[must_use]
    pub fn is_instrumented(&self) -> bool {
        self.instrumented
    }

    /// Replaces the function and flags the tap as instrumented.
    #[must_use]
    pub fn instrument(mut self, func: F) -> Self {
        self.func = func;
        self.instrumented = true;
        self
    }
}

impl<F> std::fmt::Debug for TapInfo<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapInfo")
            .field("hook", &self.hook)
            .field("name", &self.name)
            .field("instrumented", &self.instrumented)
            .finish_non_exhaustive()
    }
}

/// Rewrites taps as they are registered on a hook.
///
/// Implementations must not register taps on the same hook from inside
/// `register`.
pub trait Interceptor<F>: Send + Sync {
    /// Returns the tap to store in place of `tap`.
    fn register(&self, tap: TapInfo<F>) -> TapInfo<F>;
}

/// A tap that failed while the hook kept going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapFailure {
    /// The hook name.
    pub hook: String,
    /// The tap (plugin) name.
    pub tap: String,
    /// The error or panic message.
    pub error: String,
}

/// Ordered tap storage shared by all hook kinds.
pub(crate) struct TapRegistry<F> {
    hook: &'static str,
    taps: RwLock<Vec<TapInfo<F>>>,
    interceptors: RwLock<Vec<Arc<dyn Interceptor<F>>>>,
}

impl<F> TapRegistry<F> {
    pub(crate) fn new(hook: &'static str) -> Self {
        Self {
            hook,
            taps: RwLock::new(Vec::new()),
            interceptors: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn hook(&self) -> &'static str {
        self.hook
    }
}

impl<F: Clone + Send + Sync + 'static> TapRegistry<F> {
    pub(crate) fn register(&self, name: impl Into<String>, func: F) {
        let interceptors = self.interceptors.read();
        let tap = interceptors
            .iter()
            .fold(TapInfo::new(self.hook, name, func), |tap, i| i.register(tap));
        self.taps.write().push(tap);
    }

    /// Adds an interceptor and applies it to every tap already registered.
    pub(crate) fn intercept(&self, interceptor: Arc<dyn Interceptor<F>>) {
        let mut interceptors = self.interceptors.write();
        let mut taps = self.taps.write();
        let existing = std::mem::take(&mut *taps);
        *taps = existing
            .into_iter()
            .map(|tap| interceptor.register(tap))
            .collect();
        interceptors.push(interceptor);
    }

    pub(crate) fn remove(&self, name: &str) -> usize {
        let mut taps = self.taps.write();
        let before = taps.len();
        taps.retain(|tap| tap.name != name);
        before - taps.len()
    }

    /// Taps in registration order, copied so no lock is held while they run.
    pub(crate) fn snapshot(&self) -> Vec<TapInfo<F>> {
        self.taps.read().clone()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.taps.read().iter().map(|tap| tap.name.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.taps.read().len()
    }
}

/// Generates the registration surface shared by the async hook kinds.
macro_rules! async_hook_methods {
    ($ret:ty) => {
        /// Creates an empty hook.
        #[must_use]
        pub fn new(name: &'static str) -> Self {
            Self {
                registry: $crate::hooks::tap::TapRegistry::new(name),
            }
        }

        /// Returns the hook name.
        #[must_use]
        pub fn name(&self) -> &'static str {
            self.registry.hook()
        }

        /// Registers a synchronous tap under `name`.
        pub fn tap<F>(&self, name: impl Into<String>, f: F)
        where
            F: Fn(T) -> anyhow::Result<$ret> + Send + Sync + 'static,
        {
            let func: $crate::hooks::AsyncTapFn<T, $ret> = std::sync::Arc::new(move |arg| {
                let result = f(arg);
                futures::FutureExt::boxed(async move { result })
            });
            self.registry.register(name, func);
        }

        /// Registers an async tap under `name`.
        pub fn tap_async<F, Fut>(&self, name: impl Into<String>, f: F)
        where
            F: Fn(T) -> Fut + Send + Sync + 'static,
            Fut: std::future::Future<Output = anyhow::Result<$ret>> + Send + 'static,
        {
            let func: $crate::hooks::AsyncTapFn<T, $ret> =
                std::sync::Arc::new(move |arg| futures::FutureExt::boxed(f(arg)));
            self.registry.register(name, func);
        }

        /// Adds an interceptor for current and future taps.
        pub fn intercept(
            &self,
            interceptor: std::sync::Arc<
                dyn $crate::hooks::Interceptor<$crate::hooks::AsyncTapFn<T, $ret>>,
            >,
        ) {
            self.registry.intercept(interceptor);
        }

        /// Removes every tap registered under `name`, returning how many were removed.
        pub fn remove_taps(&self, name: &str) -> usize {
            self.registry.remove(name)
        }

        /// Returns tap names in registration order.
        #[must_use]
        pub fn tap_names(&self) -> Vec<String> {
            self.registry.names()
        }

        /// Returns the number of registered taps.
        #[must_use]
        pub fn len(&self) -> usize {
            self.registry.len()
        }

        /// Returns true if no taps are registered.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.registry.len() == 0
        }
    };
}

pub(crate) use async_hook_methods;

#[cfg(test)]
mod tests {
    use super::*;

    struct Rename(&'static str);

    impl Interceptor<u32> for Rename {
        fn register(&self, mut tap: TapInfo<u32>) -> TapInfo<u32> {
            tap.name = format!("{}:{}", self.0, tap.name);
            tap
        }
    }

    #[test]
    fn test_register_preserves_order() {
        let registry = TapRegistry::new("demo");
        registry.register("a", 1u32);
        registry.register("b", 2u32);
        registry.register("a", 3u32);

        assert_eq!(registry.names(), vec!["a", "b", "a"]);
        let funcs: Vec<u32> = registry.snapshot().into_iter().map(|t| t.func).collect();
        assert_eq!(funcs, vec![1, 2, 3]);
    }

    #[test]
    fn test_intercept_applies_to_existing_and_future_taps() {
        let registry = TapRegistry::new("demo");
        registry.register("early", 1u32);
        registry.intercept(Arc::new(Rename("x")));
        registry.register("late", 2u32);

        assert_eq!(registry.names(), vec!["x:early", "x:late"]);
    }

    #[test]
    fn test_interceptors_apply_in_registration_order() {
        let registry = TapRegistry::new("demo");
        registry.intercept(Arc::new(Rename("inner")));
        registry.intercept(Arc::new(Rename("outer")));
        registry.register("tap", 0u32);

        assert_eq!(registry.names(), vec!["outer:inner:tap"]);
    }

    #[test]
    fn test_remove_by_name() {
        let registry = TapRegistry::new("demo");
        registry.register("keep", 1u32);
        registry.register("drop", 2u32);
        registry.register("drop", 3u32);

        assert_eq!(registry.remove("drop"), 2);
        assert_eq!(registry.remove("missing"), 0);
        assert_eq!(registry.names(), vec!["keep"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_instrument_sets_flag() {
        let tap = TapInfo::new("demo", "p", 1u32);
        assert!(!tap.is_instrumented());
        let tap = tap.instrument(2);
        assert!(tap.is_instrumented());
        assert_eq!(tap.func, 2);
        assert_eq!(tap.hook, "demo");
    }
}

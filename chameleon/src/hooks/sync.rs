//! Synchronous hook used for teardown.

use super::tap::{TapFailure, TapRegistry};
use super::{Interceptor, SyncTapFn};
use crate::cancellation::panic_message;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Runs synchronous taps in registration order.
pub struct SyncHook<T> {
    registry: TapRegistry<SyncTapFn<T>>,
}

impl<T: Clone + Send + 'static> SyncHook<T> {
    /// Creates an empty hook.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            registry: TapRegistry::new(name),
        }
    }

    /// Returns the hook name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.registry.hook()
    }

    /// Registers a tap under `name`.
    pub fn tap<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.registry.register(name, Arc::new(f));
    }

    /// Adds an interceptor for current and future taps.
    pub fn intercept(&self, interceptor: Arc<dyn Interceptor<SyncTapFn<T>>>) {
        self.registry.intercept(interceptor);
    }

    /// Removes every tap registered under `name`.
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

    /// Calls taps in order, stopping at the first error.
    pub fn call(&self, arg: T) -> anyhow::Result<()> {
        for tap in self.registry.snapshot() {
            (tap.func)(arg.clone())?;
        }
        Ok(())
    }

    /// Calls every tap, collecting errors and panics instead of stopping.
    pub fn call_all(&self, arg: T) -> Vec<TapFailure> {
        let mut failures = Vec::new();
        for tap in self.registry.snapshot() {
            let func = tap.func.clone();
            let input = arg.clone();
            let error = match std::panic::catch_unwind(AssertUnwindSafe(move || func(input))) {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => format!("{err:#}"),
                Err(panic) => format!("tap panicked: {}", panic_message(panic.as_ref())),
            };
            failures.push(TapFailure {
                hook: tap.hook.to_string(),
                tap: tap.name,
                error,
            });
        }
        failures
    }
}

impl<T> std::fmt::Debug for SyncHook<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHook")
            .field("name", &self.registry.hook())
            .finish_non_exhaustive()
    }
}

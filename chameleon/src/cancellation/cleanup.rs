//! Stage-scoped cleanup callbacks and the runner that executes them.

use crate::context::SharedContext;
use crate::core::Stage;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::warn;

/// The future a cleanup callback returns.
pub type CleanupFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A boxed one-shot cleanup callback.
pub type CleanupFn = Box<dyn FnOnce(SharedContext) -> CleanupFuture + Send>;

/// A teardown callback registered against a stage.
///
/// Each cleanup runs at most once: running a stage's cleanups consumes them.
pub struct StageCleanup {
    name: Option<String>,
    callback: CleanupFn,
}

impl StageCleanup {
    /// Wraps an async cleanup callback.
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: FnOnce(SharedContext) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: None,
            callback: Box::new(move |ctx| callback(ctx).boxed()),
        }
    }

    /// Wraps a synchronous cleanup callback.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: FnOnce(SharedContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            name: None,
            callback: Box::new(move |ctx| {
                let result = callback(ctx);
                async move { result }.boxed()
            }),
        }
    }

    /// Names the cleanup for diagnostics.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the cleanup name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl std::fmt::Debug for StageCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageCleanup")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A cleanup that errored, panicked or timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupFailure {
    /// The stage the cleanup was registered on.
    pub stage: Stage,
    /// The cleanup name, or `<unnamed>`.
    pub name: String,
    /// What went wrong.
    pub error: String,
}

/// Runs cleanups in registration order, awaiting each one.
///
/// Failures are logged and collected but never stop the remaining cleanups.
pub(crate) async fn run_cleanups(
    ctx: &SharedContext,
    stage: Stage,
    cleanups: Vec<StageCleanup>,
    timeout: Option<Duration>,
) -> Vec<CleanupFailure> {
    let mut failures = Vec::new();

    for entry in cleanups {
        let name = entry.name.unwrap_or_else(|| "<unnamed>".to_string());
        let callback = entry.callback;
        let ctx = SharedContext::clone(ctx);

        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(move || callback(ctx))) {
            Ok(fut) => {
                let guarded = AssertUnwindSafe(fut).catch_unwind();
                match timeout {
                    Some(limit) => match tokio::time::timeout(limit, guarded).await {
                        Ok(result) => result,
                        Err(_) => Ok(Err(anyhow::anyhow!(
                            "cleanup timed out after {}ms",
                            limit.as_millis()
                        ))),
                    },
                    None => guarded.await,
                }
            }
            Err(panic) => Err(panic),
        };

        let error = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => format!("{err:#}"),
            Err(panic) => format!("cleanup panicked: {}", panic_message(panic.as_ref())),
        };

        warn!(stage = %stage, cleanup = %name, error = %error, "Error during cleanup for stage {}", stage);
        failures.push(CleanupFailure { stage, name, error });
    }

    failures
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_context;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_cleanups_run_in_registration_order() {
        let ctx = test_context();
        let order = Arc::new(Mutex::new(Vec::new()));

        let cleanups = (0..3)
            .map(|i| {
                let order = order.clone();
                StageCleanup::from_fn(move |_| {
                    order.lock().push(i);
                    Ok(())
                })
            })
            .collect();

        let failures = run_cleanups(&ctx, Stage::ResourceLoad, cleanups, None).await;
        assert!(failures.is_empty());
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_cleanup_failures_do_not_stop_the_rest() {
        let ctx = test_context();
        let ran = Arc::new(Mutex::new(Vec::new()));

        let first = ran.clone();
        let last = ran.clone();
        let cleanups = vec![
            StageCleanup::from_fn(move |_| {
                first.lock().push("first");
                Ok(())
            }),
            StageCleanup::from_fn(|_| Err(anyhow::anyhow!("boom"))).named("failing"),
            StageCleanup::from_fn(|_| panic!("Intentional")).named("panicking"),
            StageCleanup::new(move |_| async move {
                last.lock().push("last");
                Ok(())
            }),
        ];

        let failures = run_cleanups(&ctx, Stage::BuildScene, cleanups, None).await;

        assert_eq!(*ran.lock(), vec!["first", "last"]);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].name, "failing");
        assert_eq!(failures[0].error, "boom");
        assert_eq!(failures[1].name, "panicking");
        assert!(failures[1].error.contains("Intentional"));
    }

    #[tokio::test]
    async fn test_cleanup_timeout_is_reported() {
        let ctx = test_context();
        let cleanups = vec![StageCleanup::new(|_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })];

        let failures = run_cleanups(
            &ctx,
            Stage::InitEngine,
            cleanups,
            Some(Duration::from_millis(20)),
        )
        .await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "<unnamed>");
        assert!(failures[0].error.contains("timed out"));
    }
}

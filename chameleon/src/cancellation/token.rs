//! Cancellation token shared by the stages of one pass.

use super::panic_message;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::warn;

/// A one-shot callback run when a token is cancelled.
pub type CancelCallback = Box<dyn FnOnce(&str) + Send>;

#[derive(Default)]
struct TokenState {
    reason: Option<String>,
    callbacks: Vec<CancelCallback>,
}

/// Cooperative cancellation for a rendering pass.
///
/// The pipeline checks the token between stages; long-running taps and
/// render-loop drivers check it (or await [`CancellationToken::cancelled`])
/// themselves. A token never resets: `run_from` swaps in a fresh one.
#[derive(Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    state: Mutex<TokenState>,
    notify: Notify,
}

impl CancellationToken {
    /// Creates a live token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token.
    ///
    /// Only the first call has any effect; it stores `reason`, runs the
    /// registered callbacks and wakes every waiter. Returns whether this call
    /// did the cancelling.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let callbacks = {
            let mut state = self.state.lock();
            if self.cancelled.swap(true, Ordering::SeqCst) {
                return false;
            }
            state.reason = Some(reason.clone());
            std::mem::take(&mut state.callbacks)
        };

        for callback in callbacks {
            run_callback(callback, &reason);
        }
        self.notify.notify_waiters();
        true
    }

    /// Runs `callback` on cancellation, or right away if already cancelled.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce(&str) + Send + 'static,
    {
        let reason = {
            let mut state = self.state.lock();
            match &state.reason {
                Some(reason) => reason.clone(),
                None => {
                    state.callbacks.push(Box::new(callback));
                    return;
                }
            }
        };
        run_callback(Box::new(callback), &reason);
    }

    /// Returns whether the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the reason given to the first `cancel`.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.state.lock().reason.clone()
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

fn run_callback(callback: CancelCallback, reason: &str) {
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| callback(reason))) {
        warn!(reason = %reason, panic = %panic_message(panic.as_ref()), "Cancel callback panicked");
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_first_cancel_wins() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert_eq!(token.reason(), None);

        assert!(token.cancel("superseded by run_from(resourceLoad)"));
        assert!(!token.cancel("pipeline disposed"));

        assert!(token.is_cancelled());
        assert_eq!(
            token.reason().as_deref(),
            Some("superseded by run_from(resourceLoad)")
        );
    }

    #[test]
    fn test_callbacks_receive_reason_once() {
        let token = CancellationToken::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = seen.clone();
        token.on_cancel(move |reason| log.lock().push(format!("before: {reason}")));
        token.cancel("dispose");
        token.cancel("dispose again");

        let log = seen.clone();
        token.on_cancel(move |reason| log.lock().push(format!("after: {reason}")));

        assert_eq!(*seen.lock(), vec!["before: dispose", "after: dispose"]);
    }

    #[test]
    fn test_panicking_callback_does_not_block_others() {
        let token = CancellationToken::new();
        let ran = Arc::new(Mutex::new(false));

        token.on_cancel(|_| panic!("Intentional"));
        let flag = ran.clone();
        token.on_cancel(move |_| *flag.lock() = true);

        assert!(token.cancel("stop"));
        assert!(*ran.lock());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let token = Arc::new(CancellationToken::new());
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel("stop");

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }

    #[test]
    fn test_cancelled_is_ready_after_cancel() {
        let token = CancellationToken::new();
        token.cancel("done");
        tokio_test::block_on(token.cancelled());
    }
}

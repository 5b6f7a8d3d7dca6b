//! Interval-driven render loop for adapters without a native frame source.

use super::FrameCallback;
use crate::cancellation::CancellationToken;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Configuration for [`FrameTicker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTickerConfig {
    /// Time between frames in milliseconds.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

fn default_frame_interval_ms() -> u64 {
    16
}

impl Default for FrameTickerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl FrameTickerConfig {
    /// Sets the frame interval.
    #[must_use]
    pub fn with_frame_interval_ms(mut self, ms: u64) -> Self {
        self.frame_interval_ms = ms;
        self
    }

    /// Returns the frame interval, never shorter than one millisecond.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// Calls a frame callback on a fixed interval until a token is cancelled.
#[derive(Debug, Clone, Default)]
pub struct FrameTicker {
    config: FrameTickerConfig,
}

impl FrameTicker {
    /// Creates a ticker.
    #[must_use]
    pub fn new(config: FrameTickerConfig) -> Self {
        Self { config }
    }

    /// Spawns the loop on the current runtime.
    ///
    /// The task resolves to the number of frames delivered.
    pub fn spawn(&self, token: Arc<CancellationToken>, on_frame: FrameCallback) -> JoinHandle<u64> {
        let period = self.config.frame_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            let mut last = Instant::now();
            let mut frames = 0_u64;
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    now = interval.tick() => {
                        if token.is_cancelled() {
                            break;
                        }
                        let delta = now.saturating_duration_since(last);
                        last = now;
                        on_frame(delta.as_secs_f64() * 1000.0);
                        frames += 1;
                    }
                }
            }

            debug!(frames, "Frame ticker stopped");
            frames
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_config_defaults() {
        let config: FrameTickerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FrameTickerConfig::default());
        assert_eq!(config.frame_interval(), Duration::from_millis(16));
        assert_eq!(
            FrameTickerConfig::default()
                .with_frame_interval_ms(0)
                .frame_interval(),
            Duration::from_millis(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_stops_on_cancel() {
        let token = Arc::new(CancellationToken::new());
        let deltas = Arc::new(Mutex::new(Vec::new()));

        let seen = deltas.clone();
        let ticker = FrameTicker::new(FrameTickerConfig::default().with_frame_interval_ms(5));
        let handle = ticker.spawn(
            token.clone(),
            Arc::new(move |delta| seen.lock().push(delta)),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        token.cancel("done");

        let frames = handle.await.unwrap();
        assert!((11..=12).contains(&frames), "frames = {frames}");
        assert_eq!(frames, deltas.lock().len() as u64);
        assert!(deltas.lock().iter().all(|&delta| (delta - 5.0).abs() < 1e-9));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(frames, deltas.lock().len() as u64);
    }
}

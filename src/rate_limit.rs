use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// RateWindow
///
/// Per-client counter state, owned exclusively by the limiter. Reset lazily the
/// first time a client is seen after its window has elapsed.
#[derive(Debug)]
struct RateWindow {
    started: Instant,
    count: u32,
}

/// Error returned when a client exceeds its admission budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitExceeded {
    /// Seconds until the client's current window elapses.
    pub retry_after_secs: u64,
}

impl std::fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rate limit exceeded, retry after {}s",
            self.retry_after_secs
        )
    }
}

impl std::error::Error for RateLimitExceeded {}

/// FixedWindowLimiter
///
/// Bounds request throughput per client within a fixed time window (default
/// 100 requests / 15 minutes). Each client key (derived from the network
/// address) owns an independent window.
///
/// The read-increment-write of a window counter must be atomic with respect to
/// concurrent requests from the same client; all keyed state therefore lives
/// behind a single `Mutex`, and `admit` performs the whole transition while
/// holding it.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    max_requests: u32,
    window: Duration,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// admit
    ///
    /// Admission check for one request from `client_key`:
    /// - no window, or the window has elapsed: start a fresh window counting
    ///   this request, and allow;
    /// - otherwise increment, allowing while the count stays within the
    ///   ceiling.
    ///
    /// Returns [`RateLimitExceeded`] with a retry hint once the ceiling is hit.
    /// Rejections are never retried server-side.
    pub fn admit(&self, client_key: &str) -> Result<(), RateLimitExceeded> {
        let now = Instant::now();
        let mut windows = self.windows.lock();

        let entry = windows
            .entry(client_key.to_string())
            .or_insert(RateWindow {
                started: now,
                count: 0,
            });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            let remaining = self.window.saturating_sub(now.duration_since(entry.started));
            return Err(RateLimitExceeded {
                retry_after_secs: remaining.as_secs().max(1),
            });
        }

        entry.count += 1;
        Ok(())
    }

    /// Drops windows that have fully elapsed, bounding memory for departed
    /// clients. Safe to call periodically from a background task.
    pub fn prune(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        windows.retain(|_, w| now.duration_since(w.started) < self.window);
    }

    /// Spawns the background task that prunes elapsed windows once per window
    /// length. Without it the keyed map only ever grows: `admit` resets
    /// elapsed windows in place but never removes entries for clients that
    /// stopped sending.
    pub fn spawn_pruner(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let period = self.window;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.prune();
            }
        })
    }

    /// Current request count for a client (for tests).
    #[cfg(test)]
    fn count(&self, client_key: &str) -> Option<u32> {
        self.windows.lock().get(client_key).map(|w| w.count)
    }
}

//! Sliding-Window Rate Limiter
//!
//! Admission control for outbound calls. [`RateLimiter::acquire`] never
//! rejects a request; it only delays it until the window has room.

use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Config;
use crate::error::{ClassifiedError, ErrorKind, Result};

// == Rate Limiter ==
/// Admits at most `max_requests` calls in any trailing `window`.
///
/// No FIFO guarantee under contention: waiters re-check in whatever order
/// they wake up.
#[derive(Debug)]
pub struct RateLimiter {
    /// Timestamps of admitted requests, oldest first
    timestamps: Mutex<VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    // == Constructor ==
    /// Creates a new limiter.
    ///
    /// # Arguments
    /// * `max_requests` - Requests admitted per window (at least 1)
    /// * `window` - Sliding window length (non-zero)
    pub fn new(max_requests: usize, window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(ClassifiedError::configuration(
                "rate limiter max_requests must be at least 1",
            ));
        }
        if window.is_zero() {
            return Err(ClassifiedError::configuration(
                "rate limiter window must be positive",
            ));
        }
        Ok(Self::from_parts(max_requests, window))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.max_requests, config.window())
    }

    fn from_parts(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests)),
            max_requests,
            window,
        }
    }

    // == Shared Instance ==
    /// Process-wide limiter built from [`Config::default`].
    pub fn shared() -> Arc<RateLimiter> {
        static SHARED: OnceLock<Arc<RateLimiter>> = OnceLock::new();
        SHARED
            .get_or_init(|| {
                let defaults = Config::default();
                Arc::new(Self::from_parts(defaults.max_requests, defaults.window()))
            })
            .clone()
    }

    // == Acquire ==
    /// Waits until a slot is free in the window, then records the request.
    pub async fn acquire(&self) {
        loop {
            match self.try_admit().await {
                Ok(()) => return,
                Err(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up when `cancel` fires.
    pub async fn acquire_with(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClassifiedError::detached(ErrorKind::Cancelled(
                "cancelled while waiting for a rate-limit slot".to_string(),
            ))),
            _ = self.acquire() => Ok(()),
        }
    }

    // == Try Acquire ==
    /// Records a request only if the window has room right now.
    pub async fn try_acquire(&self) -> bool {
        self.try_admit().await.is_ok()
    }

    /// Admits the caller, or returns how long until the oldest request leaves
    /// the window.
    async fn try_admit(&self) -> std::result::Result<(), Duration> {
        let mut timestamps = self.timestamps.lock().await;
        let now = Instant::now();
        self.prune(&mut timestamps, now);

        if timestamps.len() < self.max_requests {
            timestamps.push_back(now);
            return Ok(());
        }

        let oldest = timestamps.front().copied().unwrap_or(now);
        Err(self.window.saturating_sub(now.duration_since(oldest)))
    }

    fn prune(&self, timestamps: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    // == Remaining ==
    /// Slots free in the current window.
    pub async fn remaining(&self) -> usize {
        let mut timestamps = self.timestamps.lock().await;
        self.prune(&mut timestamps, Instant::now());
        self.max_requests.saturating_sub(timestamps.len())
    }

    // == Reset Time ==
    /// When the oldest recorded request leaves the window, or `now + window`
    /// if nothing is recorded.
    pub async fn reset_time(&self) -> Instant {
        let mut timestamps = self.timestamps.lock().await;
        let now = Instant::now();
        self.prune(&mut timestamps, now);
        match timestamps.front() {
            Some(&oldest) => oldest + self.window,
            None => now + self.window,
        }
    }

    /// Forgets every recorded request.
    pub async fn reset(&self) {
        self.timestamps.lock().await.clear();
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}


// == Property Tests ==
#[cfg(test)]
mod property_tests {
    use std::time::Duration;

    use proptest::prelude::*;
    use tokio::time::Instant;

    use super::RateLimiter;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        // Back-to-back acquires never put more than max_requests in any window.
        #[test]
        fn prop_window_never_exceeds_limit(
            max_requests in 1usize..5,
            window_ms in 10u64..500,
            calls in 1usize..20,
            gaps in prop::collection::vec(0u64..200, 20)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            let admitted = rt.block_on(async {
                let limiter = RateLimiter::new(max_requests, Duration::from_millis(window_ms)).unwrap();
                let mut admitted = Vec::new();
                for gap in gaps.iter().take(calls) {
                    tokio::time::advance(Duration::from_millis(*gap)).await;
                    limiter.acquire().await;
                    admitted.push(Instant::now());
                }
                admitted
            });

            let window = Duration::from_millis(window_ms);
            for (i, at) in admitted.iter().enumerate() {
                let in_window = admitted[i..]
                    .iter()
                    .take_while(|t| t.duration_since(*at) < window)
                    .count();
                prop_assert!(in_window <= max_requests);
            }
        }
    }
}

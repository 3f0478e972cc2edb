//! Retry Policy
//!
//! Re-attempts retryable failures with pure exponential backoff:
//! the wait before attempt `n + 1` is `base_delay * 2^(n - 1)`.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::Config;
use crate::error::{ClassifiedError, Result};

// == Retry Decision ==
/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then make another attempt
    Retry { delay: Duration },
    /// Give up and return the error to the caller
    Surface,
}

// == Retry Policy ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// # Arguments
    /// * `max_retries` - Retries after the first attempt; total attempts are `max_retries + 1`
    /// * `base_delay` - Wait before the first retry
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.retry_attempts, config.retry_delay())
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    // == Delay ==
    /// Backoff before the attempt following failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    // == Decide ==
    /// Decides whether failed attempt `attempt` (1-based) is followed by another.
    pub fn decide(&self, error: &ClassifiedError, attempt: u32) -> RetryDecision {
        if error.is_retryable() && attempt <= self.max_retries {
            RetryDecision::Retry {
                delay: self.delay_for(attempt),
            }
        } else {
            RetryDecision::Surface
        }
    }

    // == Run ==
    /// Drives `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of retries. The operation receives the 1-based attempt number.
    ///
    /// The surfaced error keeps its original classification and records the
    /// number of attempts made. Dropping the returned future abandons any
    /// pending backoff.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match self.decide(&error, attempt) {
                RetryDecision::Retry { delay } => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        correlation_id = error.correlation_id,
                        error = %error.kind,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::Surface => return Err(error.with_attempts(attempt)),
            }
        }
    }
}

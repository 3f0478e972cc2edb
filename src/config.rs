//! Configuration Module
//!
//! Handles loading and validating the request-layer configuration from
//! environment variables or any serde source.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ClassifiedError, Result};

/// Request-layer configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// The defaults match the API's published limit of 10 requests per minute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum requests admitted per sliding window
    pub max_requests: usize,
    /// Sliding window length in milliseconds
    pub window_ms: u64,
    /// Default cache TTL in milliseconds
    pub cache_ttl_ms: u64,
    /// Maximum number of cached responses
    pub cache_max_size: usize,
    /// Retries after the first attempt for retryable failures
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
    /// Background cache sweep interval in milliseconds
    pub cleanup_interval_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STATLINK_MAX_REQUESTS` - Requests per window (default: 10)
    /// - `STATLINK_WINDOW_MS` - Window length (default: 60000)
    /// - `STATLINK_CACHE_TTL_MS` - Default cache TTL (default: 300000)
    /// - `STATLINK_CACHE_MAX_SIZE` - Maximum cache entries (default: 1000)
    /// - `STATLINK_RETRY_ATTEMPTS` - Retries per request (default: 3)
    /// - `STATLINK_RETRY_DELAY_MS` - Base backoff delay (default: 1000)
    /// - `STATLINK_CLEANUP_INTERVAL_MS` - Cache sweep interval (default: 60000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_requests: env_or("STATLINK_MAX_REQUESTS", defaults.max_requests),
            window_ms: env_or("STATLINK_WINDOW_MS", defaults.window_ms),
            cache_ttl_ms: env_or("STATLINK_CACHE_TTL_MS", defaults.cache_ttl_ms),
            cache_max_size: env_or("STATLINK_CACHE_MAX_SIZE", defaults.cache_max_size),
            retry_attempts: env_or("STATLINK_RETRY_ATTEMPTS", defaults.retry_attempts),
            retry_delay_ms: env_or("STATLINK_RETRY_DELAY_MS", defaults.retry_delay_ms),
            cleanup_interval_ms: env_or(
                "STATLINK_CLEANUP_INTERVAL_MS",
                defaults.cleanup_interval_ms,
            ),
        }
    }

    // == Validate ==
    /// Rejects parameters the limiter or cache cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(ClassifiedError::configuration(
                "max_requests must be at least 1",
            ));
        }
        if self.window_ms == 0 {
            return Err(ClassifiedError::configuration("window_ms must be positive"));
        }
        if self.cache_ttl_ms == 0 {
            return Err(ClassifiedError::configuration(
                "cache_ttl_ms must be positive",
            ));
        }
        if self.cache_max_size == 0 {
            return Err(ClassifiedError::configuration(
                "cache_max_size must be at least 1",
            ));
        }
        if self.cleanup_interval_ms == 0 {
            return Err(ClassifiedError::configuration(
                "cleanup_interval_ms must be positive",
            ));
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_ms: 60_000,
            cache_ttl_ms: 300_000,
            cache_max_size: 1000,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            cleanup_interval_ms: 60_000,
        }
    }
}

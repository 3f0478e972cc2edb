//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryCache;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// Reads already drop expired entries on access; the sweep reclaims entries
/// nobody asks for again.
///
/// # Arguments
/// * `cache` - Handle to the cache to sweep
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// `interval` must be non-zero; [`Config::validate`](crate::config::Config::validate)
/// rejects a zero `cleanup_interval_ms`.
///
/// # Example
/// ```ignore
/// let cache = MemoryCache::<serde_json::Value>::new(1000, Duration::from_secs(300))?;
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<T>(cache: MemoryCache<T>, interval: Duration) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
{
    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "starting cache cleanup task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup().await;

            if removed > 0 {
                info!(removed, "cache cleanup: removed expired entries");
            } else {
                debug!("cache cleanup: no expired entries found");
            }
        }
    })
}

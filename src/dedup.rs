//! Request Deduplication
//!
//! Coalesces concurrent calls sharing a key into one in-flight operation.
//! The first caller for a key (the leader) runs the work; callers arriving
//! while it runs (followers) wait for and receive a clone of its outcome.
//!
//! This is not a cache: the registration is removed before the outcome is
//! published, so a call made after completion always starts fresh work.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

type PendingTable<T> = Arc<Mutex<HashMap<String, Pending<T>>>>;

struct Pending<T> {
    /// Distinguishes successive registrations of the same key
    generation: u64,
    outcome: watch::Receiver<Option<T>>,
}

// == Request Deduplicator ==
/// In-flight request coalescer keyed by string.
///
/// `T` is the whole outcome shared with followers, typically a `Result`, so
/// every caller observes the same value or the same error.
pub struct RequestDeduplicator<T> {
    pending: PendingTable<T>,
    next_generation: AtomicU64,
}

impl<T> Default for RequestDeduplicator<T> {
    fn default() -> Self {
        Self {
            pending: Arc::default(),
            next_generation: AtomicU64::new(0),
        }
    }
}

impl<T> std::fmt::Debug for RequestDeduplicator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDeduplicator")
            .field("in_flight", &self.pending.lock().len())
            .finish()
    }
}

enum Role<T> {
    Leader(Registration<T>),
    Follower(watch::Receiver<Option<T>>),
}

/// Held by the leader while it runs. Dropping it without completing (the
/// leader's future was cancelled) clears the registration so followers and
/// later callers are not blocked by abandoned work.
struct Registration<T> {
    key: String,
    generation: u64,
    pending: PendingTable<T>,
    outcome: watch::Sender<Option<T>>,
}

impl<T> Registration<T> {
    fn unregister(&self) {
        let mut pending = self.pending.lock();
        if pending
            .get(&self.key)
            .is_some_and(|p| p.generation == self.generation)
        {
            pending.remove(&self.key);
        }
    }

    /// Unregisters, then publishes the outcome to every follower.
    fn complete(self, value: T) -> T
    where
        T: Clone,
    {
        self.unregister();
        self.outcome.send_replace(Some(value.clone()));
        value
    }
}

impl<T> Drop for Registration<T> {
    fn drop(&mut self) {
        // No-op after complete(): the entry is already gone or belongs to a newer generation
        self.unregister();
    }
}

impl<T: Clone> RequestDeduplicator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    // == Dedupe ==
    /// Runs `factory` unless a call for `key` is already in flight, in which
    /// case the caller waits for that call's outcome instead.
    ///
    /// If the leader is abandoned before completing, one waiting follower
    /// is promoted and runs its own `factory`.
    pub async fn dedupe<F, Fut>(&self, key: &str, factory: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        loop {
            let mut outcome = match self.register(key) {
                Role::Leader(registration) => {
                    let value = factory().await;
                    return registration.complete(value);
                }
                Role::Follower(outcome) => outcome,
            };

            debug!(key, "joining in-flight request");
            let shared = match outcome.wait_for(Option::is_some).await {
                Ok(value) => (*value).clone(),
                Err(_) => None,
            };
            if let Some(value) = shared {
                return value;
            }
            debug!(key, "in-flight request abandoned, retrying as leader");
        }
    }

    /// Atomically joins the pending call for `key` or registers a new one.
    fn register(&self, key: &str) -> Role<T> {
        let mut pending = self.pending.lock();
        if let Some(existing) = pending.get(key) {
            return Role::Follower(existing.outcome.clone());
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = watch::channel(None);
        pending.insert(
            key.to_string(),
            Pending {
                generation,
                outcome: receiver,
            },
        );
        Role::Leader(Registration {
            key: key.to_string(),
            generation,
            pending: Arc::clone(&self.pending),
            outcome: sender,
        })
    }

    /// Number of keys with a call currently in flight.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.pending.lock().contains_key(key)
    }
}

//! HTTP Client
//!
//! Composes the resilience layers around a [`Transport`]. A read goes
//! cache → dedup → rate limit → transport, with classification and retry
//! around each attempt and cache population on success. Mutations are rate
//! limited and classified but never cached, coalesced or retried.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{CacheStats, MemoryCache};
use crate::classify::ErrorClassifier;
use crate::client::{CachePolicy, RequestDescriptor, Transport};
use crate::config::Config;
use crate::dedup::RequestDeduplicator;
use crate::error::{ClassifiedError, ErrorKind, RequestLabel, Result};
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryPolicy;

// == HTTP Client ==
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    cache: MemoryCache<Value>,
    dedup: RequestDeduplicator<Result<Value>>,
    retry: RetryPolicy,
    classifier: ErrorClassifier,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("limiter", &self.limiter)
            .field("dedup", &self.dedup)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

// == Builder ==
/// Assembles an [`HttpClient`]. Unset layers fall back to the process-wide
/// shared limiter and cache and the default retry policy.
pub struct HttpClientBuilder {
    transport: Arc<dyn Transport>,
    limiter: Option<Arc<RateLimiter>>,
    cache: Option<MemoryCache<Value>>,
    retry: RetryPolicy,
    classifier: ErrorClassifier,
}

impl HttpClientBuilder {
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn cache(mut self, cache: MemoryCache<Value>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn build(self) -> HttpClient {
        HttpClient {
            transport: self.transport,
            limiter: self.limiter.unwrap_or_else(RateLimiter::shared),
            cache: self.cache.unwrap_or_else(MemoryCache::shared),
            dedup: RequestDeduplicator::new(),
            retry: self.retry,
            classifier: self.classifier,
        }
    }
}

impl HttpClient {
    pub fn builder(transport: Arc<dyn Transport>) -> HttpClientBuilder {
        HttpClientBuilder {
            transport,
            limiter: None,
            cache: None,
            retry: RetryPolicy::default(),
            classifier: ErrorClassifier::default(),
        }
    }

    /// Builds a client with its own limiter and cache from `config`.
    ///
    /// Fails with [`ErrorKind::Configuration`] on invalid parameters.
    pub fn from_config(transport: Arc<dyn Transport>, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::builder(transport)
            .rate_limiter(Arc::new(RateLimiter::from_config(config)?))
            .cache(MemoryCache::from_config(config)?)
            .retry_policy(RetryPolicy::from_config(config))
            .build())
    }

    // == Fetch ==
    /// Executes `request` and returns the JSON body.
    pub async fn fetch(&self, request: RequestDescriptor) -> Result<Value> {
        self.fetch_with(request, &CancellationToken::new()).await
    }

    /// Like [`fetch`](Self::fetch), aborting when `cancel` fires.
    ///
    /// On cancellation the cache is left untouched and the in-flight
    /// registration is cleared; other callers sharing the request carry on.
    pub async fn fetch_with(
        &self,
        request: RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        if !request.method.is_read() {
            return self.send_with(request, cancel).await;
        }

        let key = request.cache_key();
        let work = async {
            if request.cache != CachePolicy::Bypass {
                if let Some(value) = self.cache.get(&key).await {
                    debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                debug!(key = %key, "cache miss");
            }
            self.dedup
                .dedupe(&request.coalescing_key(), || self.load(&request, &key))
                .await
        };

        guard(work, &request, cancel).await
    }

    /// Fetches and deserializes the body into `T`.
    pub async fn get<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<T> {
        self.get_with(request, &CancellationToken::new()).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let label = request.label();
        let value = self.fetch_with(request, cancel).await?;
        serde_json::from_value(value)
            .map_err(|e| ClassifiedError::new(ErrorKind::Decode(e.to_string()), label))
    }

    // == Send ==
    /// Executes a mutation: rate limited, one attempt, never cached or retried.
    pub async fn send(&self, request: RequestDescriptor) -> Result<Value> {
        self.send_with(request, &CancellationToken::new()).await
    }

    pub async fn send_with(
        &self,
        request: RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let work = async {
            self.attempt(&request, 1)
                .await
                .map_err(|e| e.with_attempts(1))
        };
        guard(work, &request, cancel).await
    }

    /// Runs as the dedup leader: retries the transport, then caches the value
    /// before the registration is released.
    async fn load(&self, request: &RequestDescriptor, key: &str) -> Result<Value> {
        if request.cache != CachePolicy::Bypass {
            // A previous leader may have finished between our miss and registration
            if let Some(value) = self.cache.peek(key).await {
                return Ok(value);
            }
        }

        let value = self
            .retry
            .run(|attempt| self.attempt(request, attempt))
            .await?;

        let ttl = match request.cache {
            CachePolicy::Bypass => return Ok(value),
            CachePolicy::Default => None,
            CachePolicy::Ttl(ttl) => Some(ttl),
        };
        if let Err(err) = self.cache.set(key, value.clone(), ttl).await {
            warn!(key = %key, error = %err, "failed to cache response, continuing without cache");
        }
        Ok(value)
    }

    /// One rate-limited transport attempt, classified.
    async fn attempt(&self, request: &RequestDescriptor, attempt: u32) -> Result<Value> {
        self.limiter.acquire().await;
        debug!(method = %request.method, url = %request.url, attempt, "sending request");

        let label = request.label();
        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|failure| self.classifier.classify_failure(&label, &failure))?;

        if let Some(err) = self.classifier.classify_response(&label, &response) {
            return Err(err);
        }
        decode_body(&label, &response.body)
    }

    // == Introspection ==
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn rate_limit_remaining(&self) -> usize {
        self.limiter.remaining().await
    }

    /// Drops the cached response for `key`, returning whether one existed.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.cache.delete(key).await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Number of distinct requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.dedup.in_flight()
    }

    pub fn cache(&self) -> &MemoryCache<Value> {
        &self.cache
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

fn decode_body(label: &RequestLabel, body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
        .map_err(|e| ClassifiedError::new(ErrorKind::Decode(e.to_string()), label.clone()))
}

/// Applies the caller's cancellation token and the request deadline to `work`.
async fn guard<F>(work: F, request: &RequestDescriptor, cancel: &CancellationToken) -> Result<Value>
where
    F: Future<Output = Result<Value>>,
{
    let bounded = async {
        match request.timeout {
            Some(timeout) => tokio::time::timeout(timeout, work).await.unwrap_or_else(|_| {
                Err(ClassifiedError::new(
                    ErrorKind::Cancelled(format!(
                        "deadline of {}ms elapsed",
                        timeout.as_millis()
                    )),
                    request.label(),
                ))
            }),
            None => work.await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClassifiedError::new(
            ErrorKind::Cancelled("cancelled by caller".to_string()),
            request.label(),
        )),
        result = bounded => result,
    }
}

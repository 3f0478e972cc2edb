//! Statlink - resilient request layer for a game-statistics REST API
//!
//! Every outbound call passes through a sliding-window rate limiter, a TTL
//! response cache, an in-flight request coalescer and a classifying retry
//! policy before reaching the pluggable transport.

pub mod cache;
pub mod classify;
pub mod client;
pub mod config;
pub mod dedup;
pub mod error;
pub mod rate_limiter;
pub mod retry;
pub mod tasks;

pub use cache::{cache_key, CacheStats, MemoryCache};
pub use classify::ErrorClassifier;
pub use client::{
    CachePolicy, HttpClient, Method, ReqwestTransport, RequestDescriptor, Transport,
    TransportFailure, TransportResponse,
};
pub use config::Config;
pub use dedup::RequestDeduplicator;
pub use error::{ClassifiedError, ErrorKind, NetworkKind, Result};
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
pub use tasks::spawn_cleanup_task;

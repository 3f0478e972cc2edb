//! Request Descriptor
//!
//! What the caller hands the client: method, URL, query parameters and how
//! the response may be cached. URL and header construction happen upstream.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

use crate::cache::cache_key;
use crate::error::RequestLabel;

// == Method ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Reads go through cache, dedup and retry; everything else does not.
    pub fn is_read(&self) -> bool {
        matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Cache Policy ==
/// How a read interacts with the response cache.
///
/// Concurrent reads of the same URL only share a call when their policies
/// match; see [`RequestDescriptor::coalescing_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Cache with the cache's default TTL
    #[default]
    Default,
    /// Cache with this TTL instead of the default
    Ttl(Duration),
    /// Neither read nor populate the cache
    Bypass,
}

// == Request Descriptor ==
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Fully built request URL without the query string
    pub url: String,
    /// Query parameters, kept sorted so equal requests share a cache key
    pub params: BTreeMap<String, String>,
    /// JSON body for mutations
    pub body: Option<Value>,
    pub cache: CachePolicy,
    /// Deadline for the whole request, waits and retries included
    pub timeout: Option<Duration>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: BTreeMap::new(),
            body: None,
            cache: CachePolicy::Default,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache = policy;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    // == Cache Key ==
    /// `METHOD:url` or `METHOD:url:a=1&b=2` with parameters in sorted order.
    ///
    /// Parameter names and values are form-encoded and `%` and `:` in the URL
    /// are escaped, so distinct requests never share a key.
    pub fn cache_key(&self) -> String {
        let url = escape_key_part(&self.url);
        if self.params.is_empty() {
            cache_key(self.method.as_str(), [url])
        } else {
            cache_key(self.method.as_str(), [url, self.query_string()])
        }
    }

    fn query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.params)
            .finish()
    }

    // == Coalescing Key ==
    /// Key under which concurrent reads share one in-flight call.
    ///
    /// Requests only coalesce when they would also cache the result the same
    /// way, so a `Bypass` or `Ttl` request never inherits another policy.
    pub fn coalescing_key(&self) -> String {
        match self.cache {
            CachePolicy::Default => self.cache_key(),
            CachePolicy::Ttl(ttl) => format!("ttl={}|{}", ttl.as_millis(), self.cache_key()),
            CachePolicy::Bypass => format!("bypass|{}", self.cache_key()),
        }
    }

    pub fn label(&self) -> RequestLabel {
        RequestLabel {
            method: self.method.to_string(),
            url: self.url.clone(),
        }
    }
}

/// Escapes the key separator in a URL. `%` goes first so the mapping stays
/// one-to-one.
fn escape_key_part(part: &str) -> String {
    part.replace('%', "%25").replace(':', "%3A")
}

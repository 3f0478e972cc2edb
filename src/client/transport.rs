//! Transport Layer
//!
//! The pluggable seam between the request layer and the network. A transport
//! executes one attempt and reports either an HTTP response (any status) or a
//! failure where no response arrived.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::client::{Method, RequestDescriptor};

// == Transport Response ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Header names are stored lowercase
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

// == Transport Failure ==
/// No HTTP response was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportFailure {
    /// Platform-style socket error code such as `ECONNREFUSED`
    pub code: Option<String>,
    pub message: String,
}

impl TransportFailure {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }
}

// == Transport Trait ==
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes a single attempt of `request`.
    async fn execute(
        &self,
        request: &RequestDescriptor,
    ) -> Result<TransportResponse, TransportFailure>;
}

// == Reqwest Transport ==
/// [`Transport`] backed by a `reqwest::Client`.
///
/// Authentication and default headers belong on the client passed in.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds a client with a per-attempt timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportFailure> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportFailure::new(None, format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: &RequestDescriptor,
    ) -> Result<TransportResponse, TransportFailure> {
        let mut builder = self
            .client
            .request(reqwest_method(request.method), &request.url);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| failure_from_reqwest(&e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| failure_from_reqwest(&e))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Converts a reqwest error into a failure with the closest socket code.
pub fn failure_from_reqwest(err: &reqwest::Error) -> TransportFailure {
    TransportFailure::new(socket_code(err), err.to_string())
}

fn socket_code(err: &reqwest::Error) -> Option<&'static str> {
    if err.is_timeout() {
        return Some("ETIMEDOUT");
    }

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if let Some(code) = io_code(io_err.kind()) {
                return Some(code);
            }
        }
        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return Some("ENOTFOUND");
        }
        if text.contains("certificate") {
            return Some("UNABLE_TO_VERIFY_LEAF_SIGNATURE");
        }
        source = cause.source();
    }

    if err.is_connect() {
        Some("ECONNREFUSED")
    } else {
        None
    }
}

fn io_code(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        io::ErrorKind::ConnectionReset => Some("ECONNRESET"),
        io::ErrorKind::ConnectionAborted => Some("ECONNABORTED"),
        io::ErrorKind::BrokenPipe => Some("EPIPE"),
        io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = TransportResponse::new(429, "").with_header("Retry-After", "3");
        assert_eq!(response.header("retry-after"), Some("3"));
        assert_eq!(response.header("RETRY-AFTER"), Some("3"));
        assert_eq!(response.header("x-missing"), None);
    }

    #[test]
    fn test_io_codes() {
        assert_eq!(io_code(io::ErrorKind::ConnectionRefused), Some("ECONNREFUSED"));
        assert_eq!(io_code(io::ErrorKind::ConnectionReset), Some("ECONNRESET"));
        assert_eq!(io_code(io::ErrorKind::TimedOut), Some("ETIMEDOUT"));
        assert_eq!(io_code(io::ErrorKind::PermissionDenied), None);
    }

    #[test]
    fn test_failure_display() {
        let failure = TransportFailure::new(Some("ECONNRESET"), "connection reset by peer");
        assert_eq!(failure.to_string(), "connection reset by peer");
        assert_eq!(failure.code.as_deref(), Some("ECONNRESET"));
    }

    #[tokio::test]
    async fn test_refused_connection_maps_to_connect_code() {
        // Bind then drop a listener so the port is very likely closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::default();
        let failure = transport
            .execute(&RequestDescriptor::get(format!("http://{addr}/players")))
            .await
            .unwrap_err();

        assert_eq!(failure.code.as_deref(), Some("ECONNREFUSED"));
    }
}

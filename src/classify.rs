//! Error Classification
//!
//! Maps raw transport outcomes into the closed [`ErrorKind`] taxonomy.
//! Classification is pure: it reads the outcome and allocates an error,
//! nothing else.

use crate::client::{TransportFailure, TransportResponse};
use crate::error::{ClassifiedError, ErrorKind, NetworkKind, RequestLabel};

/// Seconds to wait after a 429 that carries no usable retry header
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Header read for the retry delay on 429 responses
pub const DEFAULT_RETRY_AFTER_HEADER: &str = "retry-after";

// == Error Classifier ==
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    retry_after_header: String,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            retry_after_header: DEFAULT_RETRY_AFTER_HEADER.to_string(),
        }
    }
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a transport-specific header name for the 429 retry delay.
    pub fn with_retry_after_header(header: impl Into<String>) -> Self {
        Self {
            retry_after_header: header.into().to_ascii_lowercase(),
        }
    }

    // == Classify Response ==
    /// Classifies an HTTP response. Returns `None` for 2xx statuses.
    pub fn classify_response(
        &self,
        request: &RequestLabel,
        response: &TransportResponse,
    ) -> Option<ClassifiedError> {
        if (200..300).contains(&response.status) {
            return None;
        }

        let kind = match response.status {
            400 => ErrorKind::Validation(response.body.clone()),
            401 => ErrorKind::Authentication,
            404 => ErrorKind::NotFound,
            429 => ErrorKind::RateLimited {
                retry_after: self.retry_after(response),
            },
            500 | 502 | 503 | 504 => ErrorKind::ServerError {
                status: response.status,
            },
            status => ErrorKind::Unknown {
                status: Some(status),
                body: response.body.clone(),
            },
        };

        Some(ClassifiedError::new(kind, request.clone()))
    }

    /// Reads the retry delay in whole seconds, falling back to the default.
    fn retry_after(&self, response: &TransportResponse) -> u64 {
        response
            .header(&self.retry_after_header)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
    }

    // == Classify Failure ==
    /// Classifies a failure where no HTTP response was received.
    pub fn classify_failure(
        &self,
        request: &RequestLabel,
        failure: &TransportFailure,
    ) -> ClassifiedError {
        let kind = ErrorKind::Network {
            kind: network_kind(failure.code.as_deref()),
            message: failure.message.clone(),
        };
        ClassifiedError::new(kind, request.clone())
    }
}

// == Network Kind Mapping ==
/// Maps a platform socket error code to its network subkind.
pub fn network_kind(code: Option<&str>) -> NetworkKind {
    match code {
        Some("ECONNREFUSED" | "ECONNRESET" | "ECONNABORTED" | "EPIPE" | "EHOSTUNREACH"
        | "ENETUNREACH") => NetworkKind::Connect,
        Some("ENOTFOUND" | "EAI_AGAIN" | "EAI_NONAME") => NetworkKind::Dns,
        Some("ETIMEDOUT" | "ESOCKETTIMEDOUT" | "ECONNTIMEDOUT") => NetworkKind::Timeout,
        Some(
            "CERT_HAS_EXPIRED"
            | "CERT_NOT_YET_VALID"
            | "DEPTH_ZERO_SELF_SIGNED_CERT"
            | "SELF_SIGNED_CERT_IN_CHAIN"
            | "UNABLE_TO_VERIFY_LEAF_SIGNATURE"
            | "UNABLE_TO_GET_ISSUER_CERT_LOCALLY"
            | "ERR_TLS_CERT_ALTNAME_INVALID",
        ) => NetworkKind::Ssl,
        _ => NetworkKind::Unknown,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn label() -> RequestLabel {
        RequestLabel {
            method: "GET".to_string(),
            url: "https://api.example.test/shards/steam/players".to_string(),
        }
    }

    fn response(status: u16) -> TransportResponse {
        TransportResponse::new(status, format!("status {status}"))
    }

    fn classify(status: u16) -> ErrorKind {
        ErrorClassifier::new()
            .classify_response(&label(), &response(status))
            .expect("non-2xx status is an error")
            .kind
    }

    #[test]
    fn test_success_is_not_an_error() {
        let classifier = ErrorClassifier::new();
        assert!(classifier.classify_response(&label(), &response(200)).is_none());
        assert!(classifier.classify_response(&label(), &response(204)).is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(classify(400), ErrorKind::Validation("status 400".to_string()));
        assert_eq!(classify(401), ErrorKind::Authentication);
        assert_eq!(classify(404), ErrorKind::NotFound);
        assert_eq!(classify(429), ErrorKind::RateLimited { retry_after: 60 });
        for status in [500, 502, 503, 504] {
            assert_eq!(classify(status), ErrorKind::ServerError { status });
        }
        assert_eq!(
            classify(418),
            ErrorKind::Unknown {
                status: Some(418),
                body: "status 418".to_string()
            }
        );
    }

    #[test]
    fn test_retry_after_header() {
        let classifier = ErrorClassifier::new();

        let with_header = response(429).with_header("Retry-After", "17");
        let err = classifier.classify_response(&label(), &with_header).unwrap();
        assert_eq!(err.retry_after(), Some(17));

        let garbage = response(429).with_header("retry-after", "Wed, 21 Oct 2026 07:28:00 GMT");
        let err = classifier.classify_response(&label(), &garbage).unwrap();
        assert_eq!(err.retry_after(), Some(DEFAULT_RETRY_AFTER_SECS));
    }

    #[test]
    fn test_custom_retry_after_header() {
        let classifier = ErrorClassifier::with_retry_after_header("X-RateLimit-Reset");
        let resp = response(429).with_header("x-ratelimit-reset", "5");
        let err = classifier.classify_response(&label(), &resp).unwrap();
        assert_eq!(err.retry_after(), Some(5));
    }

    #[test]
    fn test_socket_code_mapping() {
        let cases = [
            ("ECONNREFUSED", NetworkKind::Connect),
            ("ECONNRESET", NetworkKind::Connect),
            ("ECONNABORTED", NetworkKind::Connect),
            ("ENOTFOUND", NetworkKind::Dns),
            ("ETIMEDOUT", NetworkKind::Timeout),
            ("CERT_HAS_EXPIRED", NetworkKind::Ssl),
            ("EWHATEVER", NetworkKind::Unknown),
        ];
        for (code, expected) in cases {
            assert_eq!(network_kind(Some(code)), expected, "code {code}");
        }
        assert_eq!(network_kind(None), NetworkKind::Unknown);
    }

    #[test]
    fn test_failure_carries_request_and_message() {
        let failure = TransportFailure::new(Some("ENOTFOUND"), "lookup api.example.test failed");
        let err = ErrorClassifier::new().classify_failure(&label(), &failure);

        assert_eq!(
            err.kind,
            ErrorKind::Network {
                kind: NetworkKind::Dns,
                message: "lookup api.example.test failed".to_string()
            }
        );
        assert_eq!(err.request, Some(label()));
        assert_eq!(err.attempts, 0);
    }
}

//! Client Module
//!
//! Request descriptors, the transport seam and the [`HttpClient`] orchestrator.

mod orchestrator;
mod request;
mod transport;

pub use orchestrator::{HttpClient, HttpClientBuilder};
pub use request::{CachePolicy, Method, RequestDescriptor};
pub use transport::{
    failure_from_reqwest, ReqwestTransport, Transport, TransportFailure, TransportResponse,
};

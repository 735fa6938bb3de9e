//! # HTTP Transport Seam
//!
//! The pipeline never talks to `reqwest` directly. It sends [`HttpRequest`]s through the
//! [`HttpTransport`] trait, which lets tests swap in [`MockTransport`](crate::mock::MockTransport)
//! and lets the host application decide how requests are authorized.
//!
//! - [`ReqwestTransport`] is the production implementation.
//! - [`AbortController`] / [`AbortSignal`] carry caller-initiated cancellation into a request.

pub mod http_client;
pub mod signal;

pub use http_client::ReqwestTransport;
pub use signal::{AbortController, AbortSignal};

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::{self, Display};

/// HTTP methods the pipeline issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// One outgoing request. `url` is a path plus query string, relative to the transport's base.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub signal: Option<AbortSignal>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            signal: None,
        }
    }

    pub fn with_signal(mut self, signal: Option<AbortSignal>) -> Self {
        self.signal = signal;
        self
    }
}

/// A response with its status and its body parsed as JSON.
///
/// Bodies that are not JSON arrive as a `Value::String`; empty bodies as `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures that prevent a response from being received at all.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    #[error("request cancelled")]
    Cancelled,
}

/// The request/response primitive the pipeline depends on.
///
/// Implementations must honour [`HttpRequest::signal`]: once it fires, the pending call
/// should resolve to [`TransportError::Cancelled`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

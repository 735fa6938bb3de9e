//! # Mock Transport & Testing Guide
//!
//! [`MockTransport`] implements [`HttpTransport`] entirely in memory. Register the
//! responses you expect, hand the mock to a fetcher, walker or facade, then call
//! [`MockTransport::verify`] to make sure every expected request was made.
//!
//! ## When to use the mock vs a real server
//!
//! | Feature | MockTransport | Real server |
//! |---------|---------------|-------------|
//! | **Speed** | Instant (in-memory) | Network bound |
//! | **Determinism** | Scripted responses | Depends on data |
//! | **Error Injection** | Easy (`return_err`, status codes) | Hard |
//! | **Ordering** | Controlled with `delay` | Whatever the network does |
//!
//! ## Expectations are keyed by URL
//!
//! The walker issues pages 2..N concurrently, so requests arrive in no fixed order.
//! Expectations are therefore matched by URL (path plus query string) and consumed
//! first-in first-out per URL, not globally.
//!
//! ```rust
//! use resource_aggregator::mock::MockTransport;
//! use resource_aggregator::transport::{HttpRequest, HttpTransport};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockTransport::new();
//!     mock.expect_get("/widgets?page=1")
//!         .return_json(200, json!({ "data": [] }));
//!
//!     let response = mock.send(HttpRequest::get("/widgets?page=1")).await.unwrap();
//!     assert_eq!(response.status, 200);
//!
//!     mock.verify();
//! }
//! ```
//!
//! ## Testing failure scenarios
//!
//! ```rust
//! use resource_aggregator::mock::MockTransport;
//! use resource_aggregator::transport::{HttpRequest, HttpTransport, TransportError};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockTransport::new();
//!     mock.expect_get("/widgets")
//!         .return_err(TransportError::Network("connection reset".into()));
//!
//!     let result = mock.send(HttpRequest::get("/widgets")).await;
//!     assert!(matches!(result, Err(TransportError::Network(_))));
//! }
//! ```

use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// A scripted reply for one request.
struct Expectation {
    method: Method,
    delay: Duration,
    response: Result<HttpResponse, TransportError>,
}

type ExpectationTable = Arc<Mutex<HashMap<String, VecDeque<Expectation>>>>;

/// An in-memory transport with expectation tracking for fluent testing.
///
/// # Example
/// ```ignore
/// let mock = Arc::new(MockTransport::new());
/// mock.expect_get("/widgets?page=1").return_json(200, page_one);
/// mock.expect_get("/widgets?page=2").return_err(TransportError::Network("reset".into()));
///
/// let walker = EndpointWalker::new(mock.clone(), &config);
/// // Use walker in tests...
/// mock.verify(); // Ensures all expectations were met
/// ```
#[derive(Default)]
pub struct MockTransport {
    expectations: ExpectationTable,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    /// Creates a new mock transport with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects a `GET` of `url`.
    pub fn expect_get(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(Method::Get, url)
    }

    /// Expects a request with an arbitrary method.
    pub fn expect(&self, method: Method, url: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            method,
            url: url.into(),
            delay: Duration::ZERO,
            expectations: self.expectations.clone(),
        }
    }

    /// URLs of every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        let remaining: usize = exps.values().map(VecDeque::len).sum();
        if remaining > 0 {
            let mut urls: Vec<&String> = exps
                .iter()
                .filter(|(_, queue)| !queue.is_empty())
                .map(|(url, _)| url)
                .collect();
            urls.sort();
            panic!("Not all expectations were met. {remaining} remaining: {urls:?}");
        }
    }
}

/// Builder returned by [`MockTransport::expect_get`] and [`MockTransport::expect`].
pub struct ExpectationBuilder {
    method: Method,
    url: String,
    delay: Duration,
    expectations: ExpectationTable,
}

impl ExpectationBuilder {
    /// Holds the reply back for `delay`, to control completion order.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replies with `status` and a JSON body.
    pub fn return_json(self, status: u16, body: Value) {
        self.push(Ok(HttpResponse { status, body }));
    }

    /// Fails the request at the transport level.
    pub fn return_err(self, error: TransportError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<HttpResponse, TransportError>) {
        let mut exps = self.expectations.lock().unwrap();
        exps.entry(self.url).or_default().push_back(Expectation {
            method: self.method,
            delay: self.delay,
            response,
        });
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.url.clone());

        let expectation = {
            let mut exps = self.expectations.lock().unwrap();
            exps.get_mut(&request.url).and_then(VecDeque::pop_front)
        }; // Release lock before awaiting

        let Some(expectation) = expectation else {
            return Err(TransportError::Network(format!(
                "unexpected request: {} {}",
                request.method, request.url
            )));
        };
        if expectation.method != request.method {
            return Err(TransportError::Network(format!(
                "expected {} {}, got {}",
                expectation.method, request.url, request.method
            )));
        }

        match &request.signal {
            Some(signal) => {
                if signal.is_aborted() {
                    return Err(TransportError::Cancelled);
                }
                tokio::select! {
                    _ = signal.cancelled() => return Err(TransportError::Cancelled),
                    _ = tokio::time::sleep(expectation.delay) => {}
                }
            }
            None => tokio::time::sleep(expectation.delay).await,
        }

        expectation.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::AbortController;
    use serde_json::json;

    #[tokio::test]
    async fn test_expectations_are_consumed_per_url() {
        let mock = MockTransport::new();
        mock.expect_get("/a").return_json(200, json!({ "n": 1 }));
        mock.expect_get("/a").return_json(200, json!({ "n": 2 }));
        mock.expect_get("/b").return_json(404, Value::Null);

        let b = mock.send(HttpRequest::get("/b")).await.unwrap();
        let a1 = mock.send(HttpRequest::get("/a")).await.unwrap();
        let a2 = mock.send(HttpRequest::get("/a")).await.unwrap();

        assert_eq!(b.status, 404);
        assert_eq!(a1.body["n"], 1);
        assert_eq!(a2.body["n"], 2);
        assert_eq!(mock.requests(), vec!["/b", "/a", "/a"]);
        mock.verify();
    }

    #[tokio::test]
    async fn test_unexpected_request_is_a_network_error() {
        let mock = MockTransport::new();
        let result = mock.send(HttpRequest::get("/nowhere")).await;
        assert!(matches!(result, Err(TransportError::Network(msg)) if msg.contains("/nowhere")));
    }

    #[tokio::test]
    async fn test_abort_during_delay() {
        let mock = MockTransport::new();
        mock.expect_get("/slow")
            .delay(Duration::from_secs(5))
            .return_json(200, Value::Null);

        let controller = AbortController::new();
        let request = HttpRequest::get("/slow").with_signal(Some(controller.signal()));
        let pending = mock.send(request);
        controller.abort();

        assert_eq!(pending.await, Err(TransportError::Cancelled));
    }

    #[test]
    #[should_panic(expected = "Not all expectations were met")]
    fn test_verify_panics_on_leftovers() {
        let mock = MockTransport::new();
        mock.expect_get("/never").return_json(200, Value::Null);
        mock.verify();
    }
}

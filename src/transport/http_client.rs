//! Production transport backed by `reqwest`.

use super::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};
use crate::runtime::AggregatorConfig;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Sends requests to `base_url`, attaching the bearer token to every call.
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl ReqwestTransport {
    pub fn new(config: &AggregatorConfig) -> Result<Self, TransportError> {
        Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        let joined = format!("{}/{}", self.base_url, url.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| TransportError::InvalidUrl(format!("{joined}: {e}")))
    }

    async fn exchange(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.resolve(&request.url)?;
        debug!(method = %request.method, %url, "Sending request");

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), url)
            .header(ACCEPT, JSON_API_MEDIA_TYPE);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok(HttpResponse { status, body })
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match &request.signal {
            Some(signal) => {
                if signal.is_aborted() {
                    return Err(TransportError::Cancelled);
                }
                tokio::select! {
                    _ = signal.cancelled() => Err(TransportError::Cancelled),
                    result = self.exchange(&request) => result,
                }
            }
            None => self.exchange(&request).await,
        }
    }
}

//! # Page & Primary Fetchers
//!
//! One request, one decoded [`Document`]. Everything that can go wrong below this line
//! (network failure, non-success status, a body that is not a resource document, an
//! aborted signal) comes back as an [`AggregateError`] value.
//!
//! A `422 Unprocessable Entity` is always reported as [`AggregateError::InvalidData`],
//! whatever its body looks like, so validation failures never reach type-map building.

use crate::error::AggregateError;
use crate::model::{Document, PageMeta, PrimaryData, ResourceObject};
use crate::transport::{AbortSignal, HttpRequest, HttpResponse, HttpTransport, Method};
use crate::type_map::TypeMap;
use serde_json::Value;
use tracing::{debug, instrument, warn};

const UNPROCESSABLE_ENTITY: u16 = 422;

/// What to request: a path, an optional query string and, for writes, a JSON body.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub path: String,
    pub query: String,
    pub method: Method,
    pub body: Option<Value>,
    pub signal: Option<AbortSignal>,
}

impl FetchRequest {
    pub fn get(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
            method: Method::Get,
            body: None,
            signal: None,
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            path: path.into(),
            query: String::new(),
            method: Method::Patch,
            body: Some(body),
            signal: None,
        }
    }

    pub fn with_signal(mut self, signal: Option<AbortSignal>) -> Self {
        self.signal = signal;
        self
    }

    pub fn url(&self) -> String {
        request_url(&self.path, &self.query)
    }

    fn into_http(self) -> HttpRequest {
        let url = self.url();
        HttpRequest {
            method: self.method,
            url,
            headers: Vec::new(),
            body: self.body,
            signal: self.signal,
        }
    }
}

/// `path?query`, or just `path` when the query is empty.
pub fn request_url(path: &str, query: &str) -> String {
    let query = query.trim_start_matches(['?', '&']);
    if query.is_empty() {
        path.to_string()
    } else if path.contains('?') {
        format!("{path}&{query}")
    } else {
        format!("{path}?{query}")
    }
}

/// A decoded primary response, with its `included` section optionally indexed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryFetch {
    pub data: PrimaryData,
    pub included: Vec<ResourceObject>,
    /// Empty unless type-map building was requested.
    pub type_map: TypeMap,
    pub meta: PageMeta,
}

/// Sends `request` and decodes the body as a resource document.
#[instrument(skip(transport, request), fields(method = %request.method, url = %request.url()))]
pub async fn fetch_document(
    transport: &dyn HttpTransport,
    request: FetchRequest,
) -> Result<Document, AggregateError> {
    if request.signal.as_ref().is_some_and(AbortSignal::is_aborted) {
        return Err(AggregateError::RequestCancelled);
    }

    let response = transport.send(request.into_http()).await?;
    check_status(&response)?;

    let document = match response.body {
        Value::Null => Document::default(),
        body => serde_json::from_value(body).map_err(|e| AggregateError::Decode(e.to_string()))?,
    };
    debug!(
        records = document.data.len(),
        included = document.included.len(),
        "Fetched"
    );
    Ok(document)
}

/// Fetches one path and, when `build_type_map` is set, indexes its `included` resources.
pub async fn fetch_primary(
    transport: &dyn HttpTransport,
    request: FetchRequest,
    build_type_map: bool,
) -> Result<PrimaryFetch, AggregateError> {
    let document = fetch_document(transport, request).await?;

    let mut type_map = TypeMap::new();
    if build_type_map {
        type_map.merge_included(&document.included);
    }

    Ok(PrimaryFetch {
        data: document.data,
        included: document.included,
        type_map,
        meta: document.meta,
    })
}

/// Fetches page `page` of a collection: `path?query&{page_param}={page}`.
pub async fn fetch_page(
    transport: &dyn HttpTransport,
    path: &str,
    query: &str,
    page: u32,
    page_param: &str,
    signal: Option<AbortSignal>,
) -> Result<Document, AggregateError> {
    let page_query = page_query(query, page, page_param);
    fetch_document(transport, FetchRequest::get(path, page_query).with_signal(signal)).await
}

fn page_query(query: &str, page: u32, page_param: &str) -> String {
    let query = query.trim_start_matches(['?', '&']);
    if query.is_empty() {
        format!("{page_param}={page}")
    } else {
        format!("{query}&{page_param}={page}")
    }
}

fn check_status(response: &HttpResponse) -> Result<(), AggregateError> {
    if response.status == UNPROCESSABLE_ENTITY {
        warn!(status = response.status, "Rejected as invalid data");
        return Err(AggregateError::InvalidData);
    }
    if response.is_success() {
        return Ok(());
    }

    let message = error_message(&response.body).unwrap_or_else(|| format!("HTTP {}", response.status));
    warn!(status = response.status, %message, "Request failed");
    Err(AggregateError::Status {
        status: response.status,
        message,
    })
}

/// `errors[0].detail`, `errors[0].title`, `message`, or a plain-text body.
fn error_message(body: &Value) -> Option<String> {
    let first_error = body.get("errors").and_then(|errors| errors.get(0));
    let text = first_error
        .and_then(|error| error.get("detail").or_else(|| error.get("title")))
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .or_else(|| body.as_str())?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

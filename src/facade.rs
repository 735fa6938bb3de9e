//! # Generic Endpoint Facade
//!
//! The one entry point feature code calls. It picks the walker (every page) or the
//! primary fetcher (one request), projects the dictionaries named by the include mapping,
//! and populates relationships onto the primary records.
//!
//! The facade is the error boundary of the pipeline: [`GenericEndpointFacade::fetch`]
//! always returns an [`AggregateResult`]. On failure only `errors` is set and no
//! dictionary or population work is attempted.
//!
//! ```no_run
//! use resource_aggregator::facade::{EndpointRequest, GenericEndpointFacade};
//! use resource_aggregator::include::IncludeListAndMapping;
//! use resource_aggregator::runtime::AggregatorConfig;
//! use resource_aggregator::transport::ReqwestTransport;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AggregatorConfig::from_env()?;
//! let transport = Arc::new(ReqwestTransport::new(&config)?);
//! let facade = GenericEndpointFacade::new(transport, &config);
//!
//! let result = facade
//!     .fetch(
//!         EndpointRequest::new("/widgets")
//!             .walk(true)
//!             .filter("filter[active]=1")
//!             .include(
//!                 IncludeListAndMapping::new()
//!                     .include("category")
//!                     .relationship("category", "category"),
//!             ),
//!     )
//!     .await;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```

use crate::error::AggregateError;
use crate::fetcher::{fetch_primary, FetchRequest};
use crate::include::IncludeListAndMapping;
use crate::model::{PageMeta, PrimaryData, ResourceObject};
use crate::populate::{populate_relationships, CombinedRecord};
use crate::projector::{project_all, to_list, Dictionaries};
use crate::runtime::AggregatorConfig;
use crate::transport::{AbortSignal, HttpTransport};
use crate::walker::EndpointWalker;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Dictionary entries re-expressed as arrays, keyed like the dictionaries.
pub type Lists = BTreeMap<String, Vec<Map<String, Value>>>;

/// What the caller wants fetched.
#[derive(Debug, Clone, Default)]
pub struct EndpointRequest {
    pub path: String,
    /// Extra query parameters, sent before filters and includes.
    pub query_string: String,
    pub include: Option<IncludeListAndMapping>,
    /// Ready-made query fragments such as `filter[status]=open`.
    pub filters: Vec<String>,
    pub use_walk_endpoint: bool,
    pub signal: Option<AbortSignal>,
}

impl EndpointRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn query(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = query_string.into();
        self
    }

    pub fn include(mut self, mapping: IncludeListAndMapping) -> Self {
        self.include = Some(mapping);
        self
    }

    pub fn filter(mut self, fragment: impl Into<String>) -> Self {
        self.filters.push(fragment.into());
        self
    }

    pub fn walk(mut self, use_walk_endpoint: bool) -> Self {
        self.use_walk_endpoint = use_walk_endpoint;
        self
    }

    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Query string, filters and the `include=` fragment, joined with `&`.
    pub fn build_query_string(&self) -> String {
        let include = self.include.as_ref().and_then(IncludeListAndMapping::query_fragment);
        std::iter::once(self.query_string.as_str())
            .chain(self.filters.iter().map(String::as_str))
            .chain(include.as_deref())
            .map(|part| part.trim_matches(['?', '&']))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// The unified result shape. Serializes with `aggData`/`combinedData` field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    /// Primary records before population: a list, or one object for singleton documents.
    pub agg_data: Option<PrimaryData>,
    pub lists: Option<Lists>,
    pub dicts: Option<Dictionaries>,
    pub meta: Option<PageMeta>,
    pub errors: Option<String>,
    pub combined_data: Option<Vec<CombinedRecord>>,
    /// The typed failure behind `errors`.
    #[serde(skip)]
    pub error: Option<AggregateError>,
}

impl AggregateResult {
    pub fn failed(error: AggregateError) -> Self {
        Self {
            errors: Some(error.to_string()),
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The primary records, empty on failure.
    pub fn records(&self) -> &[ResourceObject] {
        self.agg_data.as_ref().map(PrimaryData::records).unwrap_or_default()
    }
}

pub struct GenericEndpointFacade {
    transport: Arc<dyn HttpTransport>,
    walker: EndpointWalker,
}

impl GenericEndpointFacade {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &AggregatorConfig) -> Self {
        let walker = EndpointWalker::new(Arc::clone(&transport), config);
        Self { transport, walker }
    }

    /// Runs the whole pipeline. Never fails; errors land in [`AggregateResult::errors`].
    #[instrument(skip_all, fields(path = %request.path, walk = request.use_walk_endpoint))]
    pub async fn fetch(&self, request: EndpointRequest) -> AggregateResult {
        match self.try_fetch(request).await {
            Ok(result) => result,
            Err(error) if error.is_cancelled() => {
                debug!("Cancelled");
                AggregateResult::failed(error)
            }
            Err(error) => {
                warn!(code = error.code(), %error, "Aggregation failed");
                AggregateResult::failed(error)
            }
        }
    }

    async fn try_fetch(&self, request: EndpointRequest) -> Result<AggregateResult, AggregateError> {
        let query = request.build_query_string();
        let EndpointRequest {
            path,
            include,
            use_walk_endpoint,
            signal,
            ..
        } = request;
        let mapping = include.unwrap_or_default();

        let (agg_data, type_map, meta) = if use_walk_endpoint {
            let walked = self.walker.walk(&path, &query, signal).await?;
            (PrimaryData::Many(walked.agg_data), walked.type_map, walked.meta)
        } else {
            let request = FetchRequest::get(path, query).with_signal(signal);
            let fetched = fetch_primary(self.transport.as_ref(), request, true).await?;
            (fetched.data, fetched.type_map, fetched.meta)
        };

        let dicts = project_all(&type_map, mapping.dictionary_keys());
        let lists: Lists = dicts
            .iter()
            .map(|(key, dictionary)| (key.clone(), to_list(dictionary)))
            .collect();
        let combined = populate_relationships(agg_data.records(), &mapping, &dicts);
        info!(
            records = agg_data.len(),
            dictionaries = dicts.len(),
            "Aggregated"
        );

        Ok(AggregateResult {
            agg_data: Some(agg_data),
            lists: Some(lists),
            dicts: Some(dicts),
            meta: Some(meta),
            errors: None,
            combined_data: Some(combined),
            error: None,
        })
    }
}

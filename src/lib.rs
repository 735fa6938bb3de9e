//! # Resource Aggregator
//!
//! > **Walk a paginated JSON:API collection and hand back denormalized records.**
//!
//! JSON:API responses name related resources by `{id, type}` and ship their attributes
//! separately in `included`. This crate fetches one path or every page of a collection,
//! indexes the included resources, and rewrites each primary record so its relationships
//! carry the full related objects.
//!
//! ## 🏗️ Pipeline
//!
//! ```text
//! Facade ─┬─> Walker (all pages) ──┐
//!         └─> Primary Fetcher ─────┴─> Type Map ─> Dictionaries ─> Populator ─> caller
//! ```
//!
//! ## 🚀 Core Concepts
//!
//! ### Errors are values
//! Everything below the facade returns `Result<_, AggregateError>`. The facade turns any
//! failure into the `errors` field of an [`AggregateResult`](facade::AggregateResult); it
//! never panics on a bad response.
//!
//! ### Partial pages are tolerated
//! When a walk loses a middle page, the aggregate is simply missing those records. The
//! walk still succeeds and lists the page in `dropped_pages`.
//!
//! ### One owner for shared state
//! Concurrent page fetches hand their documents to a single accumulator task, which owns
//! the records and the type map. No locks, and no state shared between walks.
//!
//! ### Mocking
//! The HTTP client sits behind the [`HttpTransport`](transport::HttpTransport) trait.
//! Tests script responses with [`MockTransport`](mock::MockTransport).
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. Wire ([`model`], [`transport`])
//! - **Role**: JSON:API document types and the request/response seam.
//! - **Key items**: [`Document`](model::Document), [`ReqwestTransport`](transport::ReqwestTransport),
//!   [`AbortController`](transport::AbortController).
//!
//! ### 2. Fetching ([`fetcher`], [`walker`])
//! - **Role**: One request, or every page of a collection.
//! - **Key items**: [`fetch_primary`](fetcher::fetch_primary), [`EndpointWalker`](walker::EndpointWalker).
//!
//! ### 3. Resolution ([`type_map`], [`projector`], [`include`], [`populate`])
//! - **Role**: Index included resources and merge them into relationships.
//! - **Key items**: [`TypeMap`](type_map::TypeMap), [`IncludeListAndMapping`](include::IncludeListAndMapping),
//!   [`populate_relationships`](populate::populate_relationships).
//!
//! ### 4. Entry point ([`facade`])
//! - **Role**: The single call feature code makes.
//! - **Key items**: [`GenericEndpointFacade`](facade::GenericEndpointFacade),
//!   [`EndpointRequest`](facade::EndpointRequest).
//!
//! ### 5. Runtime ([`runtime`])
//! - **Role**: Environment configuration and tracing setup.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! AGGREGATOR_BASE_URL=https://api.example.com/v1 RUST_LOG=info \
//!     cargo run -p aggregator-cli -- /widgets --walk --include category --map category=category
//! ```

pub mod error;
pub mod facade;
pub mod fetcher;
pub mod include;
pub mod mock;
pub mod model;
pub mod populate;
pub mod projector;
pub mod runtime;
pub mod transport;
pub mod type_map;
pub mod walker;

pub use error::AggregateError;
pub use facade::{AggregateResult, EndpointRequest, GenericEndpointFacade};
pub use include::{IncludeListAndMapping, IncludeTargets, NestedRelationshipKey};

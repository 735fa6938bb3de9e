//! # aggregate
//!
//! Fetches a JSON:API path through the aggregation pipeline and prints the result as JSON.
//!
//! ```bash
//! AGGREGATOR_BASE_URL=https://api.example.com/v1 RUST_LOG=info \
//!     aggregate /widgets --walk --include category --map category=category
//!
//! # Polymorphic and nested relationships
//! aggregate /cases --include notes,notes.author --map notes=note --map notes.author=user \
//!     --map subject=contractor,client
//! ```
//!
//! Connection settings come from the `AGGREGATOR_*` environment variables. Ctrl-C aborts
//! in-flight requests and the result reports the cancellation.

use clap::Parser;
use resource_aggregator::runtime::{setup_tracing, AggregatorConfig};
use resource_aggregator::transport::{AbortController, ReqwestTransport};
use resource_aggregator::{EndpointRequest, GenericEndpointFacade, IncludeListAndMapping};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "aggregate")]
#[command(about = "Fetch a JSON:API resource and resolve its relationships")]
struct Args {
    /// Path relative to AGGREGATOR_BASE_URL, e.g. /widgets
    path: String,

    /// Fetch every page instead of a single request
    #[arg(short = 'w', long)]
    walk: bool,

    /// Relationship to include; repeat or separate with commas
    #[arg(short = 'i', long = "include", value_delimiter = ',')]
    includes: Vec<String>,

    /// Relationship mapping `name=type[,type]`; `outer.inner=type` for nested
    #[arg(short = 'm', long = "map", value_parser = parse_mapping)]
    mappings: Vec<(String, String)>,

    /// Raw filter fragment such as `filter[status]=open`
    #[arg(short = 'f', long = "filter")]
    filters: Vec<String>,

    /// Extra query string sent before filters
    #[arg(short = 'q', long, default_value = "")]
    query: String,
}

fn parse_mapping(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, targets)) if !name.trim().is_empty() && !targets.trim().is_empty() => {
            Ok((name.trim().to_string(), targets.to_string()))
        }
        _ => Err(format!("expected name=type[,type], got {raw:?}")),
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();
    let args = Args::parse();

    let config = AggregatorConfig::from_env().map_err(|e| e.to_string())?;
    let transport = ReqwestTransport::new(&config).map_err(|e| e.to_string())?;
    let facade = GenericEndpointFacade::new(Arc::new(transport), &config);

    let controller = AbortController::new();
    let mut request = EndpointRequest::new(args.path)
        .walk(args.walk)
        .query(args.query)
        .signal(controller.signal());
    for filter in args.filters {
        request = request.filter(filter);
    }
    if !args.includes.is_empty() || !args.mappings.is_empty() {
        request = request.include(IncludeListAndMapping::from_pairs(args.includes, args.mappings));
    }

    info!(base_url = %config.base_url, path = %request.path, walk = request.use_walk_endpoint, "Fetching");
    let fetch = facade.fetch(request);
    tokio::pin!(fetch);
    let result = tokio::select! {
        result = &mut fetch => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, aborting requests");
            controller.abort();
            fetch.await
        }
    };

    let output = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
    println!("{output}");

    match result.errors {
        Some(errors) => Err(errors),
        None => Ok(()),
    }
}

/// Initializes structured logging for binaries built on this crate.
///
/// Verbosity comes from the `RUST_LOG` environment variable:
/// - `RUST_LOG=info` - walk start/finish and dropped pages
/// - `RUST_LOG=debug` - every page fetch and merge
/// - `RUST_LOG=resource_aggregator::walker=debug` - only the walker
///
/// The compact format hides module paths; log lines carry `path` and `page` fields instead.
///
/// # Example
///
/// ```ignore
/// setup_tracing();
/// tracing::info!("aggregate started");
/// ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

//! # Endpoint Walker
//!
//! Fetches every page of a paginated collection and merges them into one aggregate.
//!
//! ## How a walk runs
//!
//! 1. Guard: an empty path fails with [`AggregateError::NoPathToWalk`]; the path walked
//!    last in the same [`WalkContext`] fails with [`AggregateError::DuplicatePathLoopGuard`].
//! 2. Page 1 is fetched. Any error here (cancellation included) ends the walk.
//! 3. `meta.last_page` (default 1) decides how many more pages exist. A count above
//!    `max_pages` fails with [`AggregateError::TooManyPages`] before anything is issued.
//! 4. Pages `2..=last_page` are issued with a fixed stagger between starts and at most
//!    `max_in_flight` requests outstanding, then joined settle-all. Pages still waiting
//!    for their turn give up as soon as the abort signal fires.
//! 5. Every page that arrives is merged by the [`PageAccumulator`] task. A page that
//!    fails is dropped: its records are missing and its number is listed in
//!    [`WalkResult::dropped_pages`], but the walk still succeeds.
//!
//! Page 1's records always come first. Later pages follow in completion order.
//!
//! ## No shared state between walks
//!
//! Each call to [`EndpointWalker::walk`] builds a fresh [`WalkContext`] and a fresh
//! accumulator, so two walks running at the same time never see each other's records.

pub mod accumulator;

pub use accumulator::{Accumulated, AccumulatorClient, PageAccumulator};

use crate::error::AggregateError;
use crate::fetcher::fetch_page;
use crate::model::{PageMeta, ResourceObject};
use crate::runtime::AggregatorConfig;
use crate::transport::{AbortSignal, HttpTransport};
use crate::type_map::TypeMap;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

/// Per-walk state: the loop guard and the caller's abort signal.
#[derive(Debug, Clone, Default)]
pub struct WalkContext {
    previous_path: Option<String>,
    signal: Option<AbortSignal>,
}

impl WalkContext {
    pub fn new(signal: Option<AbortSignal>) -> Self {
        Self {
            previous_path: None,
            signal,
        }
    }

    /// The path this context walked last, if any.
    pub fn previous_path(&self) -> Option<&str> {
        self.previous_path.as_deref()
    }
}

/// The merged collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkResult {
    pub agg_data: Vec<ResourceObject>,
    pub type_map: TypeMap,
    /// `meta` from page 1.
    pub meta: PageMeta,
    /// Pages that failed and are missing from `agg_data`, ascending.
    pub dropped_pages: Vec<u32>,
}

pub struct EndpointWalker {
    transport: Arc<dyn HttpTransport>,
    page_param: String,
    stagger: Duration,
    max_in_flight: usize,
    max_pages: u32,
}

impl EndpointWalker {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &AggregatorConfig) -> Self {
        Self {
            transport,
            page_param: config.page_param.clone(),
            stagger: config.stagger(),
            max_in_flight: config.max_in_flight(),
            max_pages: config.max_pages,
        }
    }

    /// Walks `path` with a fresh context.
    pub async fn walk(
        &self,
        path: &str,
        query: &str,
        signal: Option<AbortSignal>,
    ) -> Result<WalkResult, AggregateError> {
        let mut context = WalkContext::new(signal);
        self.walk_in(&mut context, path, query).await
    }

    /// Walks `path` inside an existing context, refusing to walk the same path twice in a row.
    #[instrument(skip(self, context, query))]
    pub async fn walk_in(
        &self,
        context: &mut WalkContext,
        path: &str,
        query: &str,
    ) -> Result<WalkResult, AggregateError> {
        if path.trim().is_empty() {
            return Err(AggregateError::NoPathToWalk);
        }
        if context.previous_path() == Some(path) {
            warn!("Refusing to walk the same path twice");
            return Err(AggregateError::DuplicatePathLoopGuard(path.to_string()));
        }
        context.previous_path = Some(path.to_string());
        let signal = context.signal.clone();

        let first = fetch_page(
            self.transport.as_ref(),
            path,
            query,
            1,
            &self.page_param,
            signal.clone(),
        )
        .await?;
        let meta = first.meta.clone();
        let last_page = meta.last_page();
        if last_page > self.max_pages {
            warn!(last_page, max_pages = self.max_pages, "Refusing to walk");
            return Err(AggregateError::TooManyPages {
                last_page,
                max_pages: self.max_pages,
            });
        }
        info!(last_page, "Walking");

        let (accumulator, client) = PageAccumulator::new(self.max_in_flight);
        let handle = tokio::spawn(accumulator.run());

        let merged = client.push_page(1, first).await?;
        debug!(merged, "First page merged");
        let dropped_pages = self
            .fetch_remaining(&client, path, query, last_page, signal.as_ref())
            .await;

        // Closing the last client lets the accumulator return its state.
        drop(client);
        let accumulated = handle
            .await
            .map_err(|e| AggregateError::Internal(format!("page accumulator failed: {e}")))?;

        if signal.as_ref().is_some_and(AbortSignal::is_aborted) {
            warn!(merged = accumulated.pages.len(), "Walk cancelled");
            return Err(AggregateError::RequestCancelled);
        }
        if !dropped_pages.is_empty() {
            warn!(?dropped_pages, "Pages missing from aggregate");
        }
        info!(
            records = accumulated.records.len(),
            pages = accumulated.pages.len(),
            "Walk finished"
        );

        Ok(WalkResult {
            agg_data: accumulated.records,
            type_map: accumulated.type_map,
            meta,
            dropped_pages,
        })
    }

    /// Fetches pages `2..=last_page` and returns the numbers of the ones that failed.
    async fn fetch_remaining(
        &self,
        client: &AccumulatorClient,
        path: &str,
        query: &str,
        last_page: u32,
        signal: Option<&AbortSignal>,
    ) -> Vec<u32> {
        if last_page < 2 {
            return Vec::new();
        }
        let permits = Semaphore::new(self.max_in_flight);

        let pages = (2..=last_page).map(|page| {
            let permits = &permits;
            let start_after = self.stagger * (page - 2);
            async move {
                let _permit = tokio::select! {
                    _ = until_cancelled(signal) => return Err(AggregateError::RequestCancelled),
                    permit = async {
                        tokio::time::sleep(start_after).await;
                        permits.acquire().await
                    } => permit.map_err(|e| AggregateError::Internal(e.to_string()))?,
                };
                let document = fetch_page(
                    self.transport.as_ref(),
                    path,
                    query,
                    page,
                    &self.page_param,
                    signal.cloned(),
                )
                .await?;
                let merged = client.push_page(page, document).await?;
                debug!(page, merged, "Page merged");
                Ok::<(), AggregateError>(())
            }
        });

        let settled = join_all(pages).await;
        (2..=last_page)
            .zip(settled)
            .filter_map(|(page, outcome)| match outcome {
                Ok(_) => None,
                Err(error) => {
                    debug!(page, code = error.code(), %error, "Page dropped");
                    Some(page)
                }
            })
            .collect()
    }
}

/// Resolves when `signal` fires; never resolves without a signal.
async fn until_cancelled(signal: Option<&AbortSignal>) {
    match signal {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending().await,
    }
}

//! # Page Accumulator
//!
//! A single task that owns the walk's aggregate records and its [`TypeMap`]. Page
//! fetches run concurrently but never touch that state directly: each settled page is
//! sent here over a channel and merged in arrival order, one message at a time.
//!
//! The task stops once every [`AccumulatorClient`] has been dropped and hands back the
//! [`Accumulated`] state from its join handle.

use crate::error::AggregateError;
use crate::model::{Document, ResourceObject};
use crate::type_map::TypeMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Messages understood by the accumulator.
#[derive(Debug)]
pub enum AccumulatorRequest {
    /// Merge one decoded page. Replies with the running record count.
    Page {
        page: u32,
        document: Document,
        respond_to: oneshot::Sender<usize>,
    },
}

/// Everything merged by the time the accumulator shut down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulated {
    pub records: Vec<ResourceObject>,
    pub type_map: TypeMap,
    /// Page numbers in the order they were merged.
    pub pages: Vec<u32>,
}

/// The server half: owns the state and the receiving end of the channel.
pub struct PageAccumulator {
    receiver: mpsc::Receiver<AccumulatorRequest>,
    state: Accumulated,
}

impl PageAccumulator {
    /// Creates the accumulator and the client used to feed it.
    ///
    /// `buffer` is the channel capacity; senders wait while it is full.
    pub fn new(buffer: usize) -> (Self, AccumulatorClient) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let accumulator = Self {
            receiver,
            state: Accumulated::default(),
        };
        (accumulator, AccumulatorClient { sender })
    }

    /// Merges pages until the channel closes, then returns the aggregate.
    pub async fn run(mut self) -> Accumulated {
        debug!("Accumulator started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                AccumulatorRequest::Page {
                    page,
                    document,
                    respond_to,
                } => {
                    let Document { data, included, .. } = document;
                    let page_records = data.len();
                    self.state.type_map.merge_included(&included);
                    self.state.records.extend(data.into_records());
                    self.state.pages.push(page);
                    debug!(
                        page,
                        page_records,
                        included = included.len(),
                        total = self.state.records.len(),
                        "Page merged"
                    );
                    let _ = respond_to.send(self.state.records.len());
                }
            }
        }

        info!(
            pages = self.state.pages.len(),
            records = self.state.records.len(),
            "Accumulator finished"
        );
        self.state
    }
}

/// Cheap-to-clone handle used by page fetches to hand their documents over.
#[derive(Clone)]
pub struct AccumulatorClient {
    sender: mpsc::Sender<AccumulatorRequest>,
}

impl AccumulatorClient {
    pub async fn push_page(&self, page: u32, document: Document) -> Result<usize, AggregateError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(AccumulatorRequest::Page {
                page,
                document,
                respond_to,
            })
            .await
            .map_err(|_| AggregateError::Internal("page accumulator closed".into()))?;
        response
            .await
            .map_err(|_| AggregateError::Internal("page accumulator dropped the reply".into()))
    }
}

//! # Aggregation Errors
//!
//! Every failure the pipeline can produce is an [`AggregateError`] value. Nothing in this
//! crate panics on a bad response or a misused path; the facade turns these values into
//! the `errors` field of its result.

use crate::transport::TransportError;

/// Errors produced while fetching, walking or decoding a resource collection.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum AggregateError {
    /// The walker was asked to walk an empty path.
    #[error("no path to walk")]
    NoPathToWalk,

    /// The walker was asked to walk the path it walked last in the same context.
    #[error("path already walked in this context: {0}")]
    DuplicatePathLoopGuard(String),

    /// The server rejected the request with `422 Unprocessable Entity`.
    #[error("Invalid data")]
    InvalidData,

    /// The server answered with a non-success status.
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The caller aborted the request.
    #[error("request cancelled")]
    RequestCancelled,

    /// The response body was not a resource document.
    #[error("malformed response body: {0}")]
    Decode(String),

    /// The server reported more pages than the walker is allowed to fetch.
    #[error("collection reports {last_page} pages, more than the limit of {max_pages}")]
    TooManyPages { last_page: u32, max_pages: u32 },

    /// An internal task failed (for example the page accumulator panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AggregateError {
    /// Stable code for the failure class, suitable for logs and UI branching.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoPathToWalk => "NoPathToWalk",
            Self::DuplicatePathLoopGuard(_) => "DuplicatePathLoopGuard",
            Self::InvalidData
            | Self::Status { .. }
            | Self::Transport(_)
            | Self::Decode(_)
            | Self::TooManyPages { .. } => "TransportOrServerError",
            Self::RequestCancelled => "RequestCancelled",
            Self::Internal(_) => "Internal",
        }
    }

    /// True when the failure was caused by the caller's abort signal.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::RequestCancelled)
    }
}

impl From<TransportError> for AggregateError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Cancelled => AggregateError::RequestCancelled,
            other => AggregateError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_group_server_failures() {
        assert_eq!(AggregateError::NoPathToWalk.code(), "NoPathToWalk");
        assert_eq!(
            AggregateError::DuplicatePathLoopGuard("/a".into()).code(),
            "DuplicatePathLoopGuard"
        );
        assert_eq!(AggregateError::InvalidData.code(), "TransportOrServerError");
        assert_eq!(
            AggregateError::Status {
                status: 500,
                message: "boom".into()
            }
            .code(),
            "TransportOrServerError"
        );
        assert_eq!(AggregateError::RequestCancelled.code(), "RequestCancelled");
    }

    #[test]
    fn test_transport_cancellation_maps_to_request_cancelled() {
        let err: AggregateError = TransportError::Cancelled.into();
        assert!(err.is_cancelled());

        let err: AggregateError = TransportError::Network("connection reset".into()).into();
        assert_eq!(err, AggregateError::Transport("network error: connection reset".into()));
    }

    #[test]
    fn test_invalid_data_message() {
        assert_eq!(AggregateError::InvalidData.to_string(), "Invalid data");
    }
}

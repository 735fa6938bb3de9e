//! Wire types for JSON:API-style documents.
//!
//! These mirror what the upstream API returns: a top-level `data` (one resource or a
//! list), an optional `included` list of related resources and an optional `meta`
//! object carrying pagination totals.

pub mod document;
pub mod resource;

pub use document::*;
pub use resource::*;

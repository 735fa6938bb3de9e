//! Runtime environment for hosts of the pipeline.
//!
//! - [`AggregatorConfig`] - base URL, credentials and walker tuning, loaded from the environment
//! - [`setup_tracing`] - installs the `tracing` subscriber

pub mod config;
pub mod tracing;

pub use config::{AggregatorConfig, ConfigError};
pub use self::tracing::setup_tracing;

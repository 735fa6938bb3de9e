use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_PAGE_PARAM: &str = "page";
const DEFAULT_STAGGER_MS: u64 = 25;
const DEFAULT_MAX_IN_FLIGHT: usize = 4;
const DEFAULT_MAX_PAGES: u32 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

/// Settings shared by the transport and the endpoint walker.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Prefix every request path is appended to.
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub bearer_token: Option<String>,
    /// Query key carrying the page number (`page=3`).
    pub page_param: String,
    /// Delay between issuing consecutive page requests.
    pub stagger_ms: u64,
    /// Upper bound on page requests in flight at once.
    pub max_in_flight: usize,
    /// Largest `last_page` a walk accepts before giving up on the collection.
    pub max_pages: u32,
    pub timeout_secs: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            bearer_token: None,
            page_param: DEFAULT_PAGE_PARAM.to_string(),
            stagger_ms: DEFAULT_STAGGER_MS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_pages: DEFAULT_MAX_PAGES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AggregatorConfig {
    /// Build from `AGGREGATOR_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment, a test table, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(base_url) = lookup("AGGREGATOR_BASE_URL") {
            config.base_url = base_url;
        }
        config.bearer_token = lookup("AGGREGATOR_TOKEN").filter(|t| !t.is_empty());
        if let Some(page_param) = lookup("AGGREGATOR_PAGE_PARAM").filter(|p| !p.is_empty()) {
            config.page_param = page_param;
        }
        if let Some(value) = lookup("AGGREGATOR_STAGGER_MS") {
            config.stagger_ms = parse_number("AGGREGATOR_STAGGER_MS", value)?;
        }
        if let Some(value) = lookup("AGGREGATOR_MAX_IN_FLIGHT") {
            config.max_in_flight = parse_number("AGGREGATOR_MAX_IN_FLIGHT", value)?;
        }
        if let Some(value) = lookup("AGGREGATOR_MAX_PAGES") {
            config.max_pages = parse_number("AGGREGATOR_MAX_PAGES", value)?;
        }
        if let Some(value) = lookup("AGGREGATOR_TIMEOUT_SECS") {
            config.timeout_secs = parse_number("AGGREGATOR_TIMEOUT_SECS", value)?;
        }

        Ok(config)
    }

    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// At least 1.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.max(1)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let table: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| table.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = AggregatorConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AggregatorConfig::default());
        assert_eq!(config.stagger(), Duration::from_millis(25));
    }

    #[test]
    fn test_overrides() {
        let config = AggregatorConfig::from_lookup(lookup_from(&[
            ("AGGREGATOR_BASE_URL", "https://api.example.com/v2"),
            ("AGGREGATOR_TOKEN", "secret"),
            ("AGGREGATOR_PAGE_PARAM", "page[number]"),
            ("AGGREGATOR_STAGGER_MS", "0"),
            ("AGGREGATOR_MAX_IN_FLIGHT", "0"),
            ("AGGREGATOR_MAX_PAGES", "50"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://api.example.com/v2");
        assert_eq!(config.bearer_token.as_deref(), Some("secret"));
        assert_eq!(config.page_param, "page[number]");
        assert!(config.stagger().is_zero());
        assert_eq!(config.max_in_flight(), 1);
        assert_eq!(config.max_pages, 50);
    }

    #[test]
    fn test_malformed_number() {
        let err = AggregatorConfig::from_lookup(lookup_from(&[("AGGREGATOR_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: "AGGREGATOR_TIMEOUT_SECS",
                value: "soon".into()
            }
        );
    }

    #[test]
    fn test_deserialize_partial_table() {
        let config: AggregatorConfig =
            serde_json::from_str(r#"{ "base_url": "http://api", "stagger_ms": 10 }"#).unwrap();
        assert_eq!(config.base_url, "http://api");
        assert_eq!(config.stagger_ms, 10);
        assert_eq!(config.page_param, "page");
    }
}

use super::resource::{null_as_default, ResourceObject};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Pagination counters are usually numbers, but some backends send numeric strings.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Top-level `data`: a list of resources, a single resource, or `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<ResourceObject>),
    One(Box<ResourceObject>),
    #[default]
    Null,
}

impl PrimaryData {
    /// Borrow the primary records as a slice, whatever the document shape.
    pub fn records(&self) -> &[ResourceObject] {
        match self {
            PrimaryData::Many(records) => records,
            PrimaryData::One(record) => std::slice::from_ref(record.as_ref()),
            PrimaryData::Null => &[],
        }
    }

    pub fn into_records(self) -> Vec<ResourceObject> {
        match self {
            PrimaryData::Many(records) => records,
            PrimaryData::One(record) => vec![*record],
            PrimaryData::Null => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

/// The `meta` member of a paginated response.
///
/// Only the pagination counters are typed; anything else the server sends is kept in
/// `extra` so callers can still read it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PageMeta {
    /// Number of pages in the collection; 1 when the server does not say.
    pub fn last_page(&self) -> u32 {
        self.last_page
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(1)
            .max(1)
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub data: PrimaryData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub included: Vec<ResourceObject>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: PageMeta,
}

//! # Type Map
//!
//! Lookup table of included resources, keyed by resource `type` and then by `id`.
//! Each entry holds the resource's attributes plus its own `relationships`, which is
//! what the relationship populator needs for the nested pass.
//!
//! A type map lives for exactly one facade call. Keys are unique, so merging the same
//! resource twice simply overwrites it with the (identical) newer copy.

use crate::model::ResourceObject;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// `{...attributes, relationships}` for one included resource.
pub type TypeMapEntry = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeMap {
    types: HashMap<String, HashMap<String, TypeMapEntry>>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges every resource in `included` into the map. An empty slice is a no-op.
    pub fn merge_included(&mut self, included: &[ResourceObject]) {
        for resource in included {
            self.insert(resource);
        }
    }

    /// Inserts (or overwrites) one resource under `[type][id]`.
    pub fn insert(&mut self, resource: &ResourceObject) {
        let mut entry = resource.attributes.clone();
        if let Some(relationships) = &resource.relationships {
            // RelationshipRef only holds strings and identifiers, so this cannot fail.
            if let Ok(value) = serde_json::to_value(relationships) {
                entry.insert("relationships".to_string(), value);
            }
        }
        self.types
            .entry(resource.resource_type.clone())
            .or_default()
            .insert(resource.id.clone(), entry);
    }

    /// All entries of one resource type.
    pub fn get(&self, resource_type: &str) -> Option<&HashMap<String, TypeMapEntry>> {
        self.types.get(resource_type)
    }

    pub fn entry(&self, resource_type: &str, id: &str) -> Option<&TypeMapEntry> {
        self.types.get(resource_type)?.get(id)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Total number of entries across all types.
    pub fn len(&self) -> usize {
        self.types.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

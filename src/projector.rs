//! Flattens one type-slice of a [`TypeMap`] into a plain id → object dictionary.

use crate::type_map::TypeMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// id → `{id, ...attributes, relationships}` for one resource type.
pub type Dictionary = BTreeMap<String, Map<String, Value>>;

/// Dictionaries keyed by resource type.
pub type Dictionaries = BTreeMap<String, Dictionary>;

/// Projects the entries stored under `key`. Unknown keys give an empty dictionary.
pub fn project(type_map: &TypeMap, key: &str) -> Dictionary {
    let Some(entries) = type_map.get(key) else {
        return Dictionary::new();
    };
    entries
        .iter()
        .map(|(id, entry)| {
            let mut object = entry.clone();
            object.insert("id".to_string(), Value::String(id.clone()));
            (id.clone(), object)
        })
        .collect()
}

/// One dictionary per distinct key.
pub fn project_all<'a>(type_map: &TypeMap, keys: impl IntoIterator<Item = &'a str>) -> Dictionaries {
    keys.into_iter()
        .map(|key| (key.to_string(), project(type_map, key)))
        .collect()
}

/// The dictionary's objects as a list, ordered by id.
pub fn to_list(dictionary: &Dictionary) -> Vec<Map<String, Value>> {
    dictionary.values().cloned().collect()
}

//! # Relationship Populator
//!
//! Denormalizes primary records for consumers: every relationship reference is merged
//! with the full related object from the dictionaries, so `case.relationships.owner`
//! becomes `{id, type, name, email, ...}` instead of `{id, type}`.
//!
//! ## Two passes
//!
//! 1. **Top level.** For each relationship on a record, look up the mapped resource
//!    type(s) and merge the dictionary entry into each `{id, type}` reference. Dictionary
//!    attributes win on key collisions. A reference is only matched against the dictionary
//!    of its own `type`, and only when that type is mapped; otherwise it stays as is.
//! 2. **One nested level.** For each *array-valued* relationship resolved in pass 1, each
//!    element that carries its own `relationships` has those resolved through the
//!    [`NestedRelationshipKey`] `(outer, inner)` mapping, but only when the nested
//!    reference's `type` is one of the mapped targets.
//!
//! Singleton relationships are not traversed in pass 2, and nothing deeper than one
//! nested level is ever resolved.
//!
//! Records without a `relationships` member pass through unchanged.

use crate::include::{IncludeListAndMapping, IncludeTargets, NestedRelationshipKey};
use crate::model::{RelationshipData, ResourceIdentifier, ResourceObject};
use crate::projector::Dictionaries;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A primary record with its relationships replaced by the resolved objects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<BTreeMap<String, Value>>,
}

impl CombinedRecord {
    pub fn relationship(&self, name: &str) -> Option<&Value> {
        self.relationships.as_ref()?.get(name)
    }
}

/// Resolves relationships on every record. `dicts` is only read.
pub fn populate_relationships(
    records: &[ResourceObject],
    mapping: &IncludeListAndMapping,
    dicts: &Dictionaries,
) -> Vec<CombinedRecord> {
    records
        .iter()
        .map(|record| {
            let mut combined = resolve_top_level(record, mapping, dicts);
            if let Some(relationships) = combined.relationships.as_mut() {
                resolve_nested(relationships, mapping, dicts);
            }
            combined
        })
        .collect()
}

// =============================================================================
// PASS 1
// =============================================================================

fn resolve_top_level(
    record: &ResourceObject,
    mapping: &IncludeListAndMapping,
    dicts: &Dictionaries,
) -> CombinedRecord {
    let relationships = record.relationships.as_ref().map(|relationships| {
        relationships
            .iter()
            .map(|(name, reference)| {
                let resolved = resolve_data(&reference.data, mapping.targets(name), dicts);
                (name.clone(), resolved)
            })
            .collect()
    });

    CombinedRecord {
        id: record.id.clone(),
        resource_type: record.resource_type.clone(),
        attributes: record.attributes.clone(),
        relationships,
    }
}

fn resolve_data(data: &RelationshipData, targets: Option<&IncludeTargets>, dicts: &Dictionaries) -> Value {
    match data {
        RelationshipData::Empty => Value::Null,
        RelationshipData::One(identifier) => Value::Object(merge_reference(identifier, targets, dicts)),
        RelationshipData::Many(identifiers) => Value::Array(
            identifiers
                .iter()
                .map(|identifier| Value::Object(merge_reference(identifier, targets, dicts)))
                .collect(),
        ),
    }
}

fn merge_reference(
    identifier: &ResourceIdentifier,
    targets: Option<&IncludeTargets>,
    dicts: &Dictionaries,
) -> Map<String, Value> {
    let mut merged = identifier.to_object();
    if let Some(entry) = targets.and_then(|targets| lookup(identifier, targets, dicts)) {
        merged.extend(entry.clone());
    }
    merged
}

/// Entities are identified by `(type, id)`: only the dictionary for the reference's own
/// type is searched, and only when that type is one of the mapped targets.
fn lookup<'a>(
    identifier: &ResourceIdentifier,
    targets: &IncludeTargets,
    dicts: &'a Dictionaries,
) -> Option<&'a Map<String, Value>> {
    if !targets.contains(&identifier.resource_type) {
        return None;
    }
    dicts.get(&identifier.resource_type)?.get(&identifier.id)
}

// =============================================================================
// PASS 2
// =============================================================================

fn resolve_nested(
    relationships: &mut BTreeMap<String, Value>,
    mapping: &IncludeListAndMapping,
    dicts: &Dictionaries,
) {
    for (outer, value) in relationships.iter_mut() {
        let Value::Array(elements) = value else {
            continue;
        };
        for element in elements.iter_mut() {
            let Some(Value::Object(nested)) = element.get_mut("relationships") else {
                continue;
            };
            for (inner, slot) in nested.iter_mut() {
                let key = NestedRelationshipKey::new(outer.as_str(), inner.as_str());
                let Some(targets) = mapping.nested_targets(&key) else {
                    continue;
                };
                if let Some(resolved) = resolve_nested_slot(slot, targets, dicts) {
                    *slot = resolved;
                }
            }
        }
    }
}

/// `slot` is a raw `{data: ...}` relationship. Returns the replacement, or `None` to
/// leave the slot untouched.
fn resolve_nested_slot(slot: &Value, targets: &IncludeTargets, dicts: &Dictionaries) -> Option<Value> {
    match slot.get("data")? {
        data @ Value::Object(_) => {
            let identifier: ResourceIdentifier = serde_json::from_value(data.clone()).ok()?;
            merge_nested(&identifier, targets, dicts).map(Value::Object)
        }
        Value::Array(items) => {
            let mut any_resolved = false;
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                match serde_json::from_value::<ResourceIdentifier>(item.clone()) {
                    Ok(identifier) => match merge_nested(&identifier, targets, dicts) {
                        Some(merged) => {
                            any_resolved = true;
                            resolved.push(Value::Object(merged));
                        }
                        None => resolved.push(Value::Object(identifier.to_object())),
                    },
                    Err(_) => resolved.push(item.clone()),
                }
            }
            any_resolved.then_some(Value::Array(resolved))
        }
        _ => None,
    }
}

fn merge_nested(
    identifier: &ResourceIdentifier,
    targets: &IncludeTargets,
    dicts: &Dictionaries,
) -> Option<Map<String, Value>> {
    let entry = lookup(identifier, targets, dicts)?;
    let mut merged = identifier.to_object();
    merged.extend(entry.clone());
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationshipRef;
    use crate::projector::Dictionary;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn users() -> Dictionary {
        Dictionary::from([("5".to_string(), object(json!({ "id": "5", "name": "Alex" })))])
    }

    fn record_with(name: &str, reference: RelationshipRef) -> ResourceObject {
        let mut record = ResourceObject::new("case", "1");
        record.relationships = Some(BTreeMap::from([(name.to_string(), reference)]));
        record
    }

    #[test]
    fn test_array_and_singleton_merge() {
        let dicts = Dictionaries::from([("user".to_string(), users())]);
        let mapping = IncludeListAndMapping::new()
            .relationship("watchers", "user")
            .relationship("owner", "user");

        let many = record_with(
            "watchers",
            RelationshipRef::many(vec![ResourceIdentifier::new("user", "5")]),
        );
        let one = record_with("owner", RelationshipRef::one(ResourceIdentifier::new("user", "5")));

        let combined = populate_relationships(&[many, one], &mapping, &dicts);

        assert_eq!(
            combined[0].relationship("watchers"),
            Some(&json!([{ "id": "5", "type": "user", "name": "Alex" }]))
        );
        assert_eq!(
            combined[1].relationship("owner"),
            Some(&json!({ "id": "5", "type": "user", "name": "Alex" }))
        );
    }

    #[test]
    fn test_unresolved_reference_is_preserved() {
        let dicts = Dictionaries::from([("user".to_string(), users())]);
        let mapping = IncludeListAndMapping::new().relationship("owner", "user");
        let record = record_with("owner", RelationshipRef::one(ResourceIdentifier::new("user", "99")));

        let combined = populate_relationships(&[record], &mapping, &dicts);

        assert_eq!(
            combined[0].relationship("owner"),
            Some(&json!({ "id": "99", "type": "user" }))
        );
    }

    #[test]
    fn test_unmapped_and_empty_relationships() {
        let dicts = Dictionaries::from([("user".to_string(), users())]);
        let mut record = ResourceObject::new("case", "1");
        record.relationships = Some(BTreeMap::from([
            (
                "reviewer".to_string(),
                RelationshipRef::one(ResourceIdentifier::new("user", "5")),
            ),
            ("invoice".to_string(), RelationshipRef::default()),
        ]));

        let combined = populate_relationships(&[record], &IncludeListAndMapping::new(), &dicts);

        assert_eq!(
            combined[0].relationship("reviewer"),
            Some(&json!({ "id": "5", "type": "user" }))
        );
        assert_eq!(combined[0].relationship("invoice"), Some(&Value::Null));
    }

    #[test]
    fn test_records_without_relationships_pass_through() {
        let mut record = ResourceObject::new("case", "1");
        record.attributes.insert("title".into(), json!("Leak"));

        let combined = populate_relationships(&[record], &IncludeListAndMapping::new(), &Dictionaries::new());

        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].attributes["title"], "Leak");
        assert!(combined[0].relationships.is_none());
    }

    #[test]
    fn test_polymorphic_mapping_uses_own_type() {
        let dicts = Dictionaries::from([
            (
                "contractor".to_string(),
                Dictionary::from([("3".to_string(), object(json!({ "id": "3", "name": "Builder" })))]),
            ),
            (
                "client".to_string(),
                Dictionary::from([("3".to_string(), object(json!({ "id": "3", "name": "Owner" })))]),
            ),
        ]);
        let mapping = IncludeListAndMapping::new().relationship("subject", vec!["contractor", "client"]);
        let record = record_with("subject", RelationshipRef::one(ResourceIdentifier::new("client", "3")));

        let combined = populate_relationships(&[record], &mapping, &dicts);

        assert_eq!(combined[0].relationship("subject").unwrap()["name"], "Owner");
    }

    #[test]
    fn test_polymorphic_mapping_never_borrows_another_type() {
        let dicts = Dictionaries::from([
            (
                "contractor".to_string(),
                Dictionary::from([("3".to_string(), object(json!({ "id": "3", "name": "Builder" })))]),
            ),
            ("client".to_string(), Dictionary::new()),
        ]);
        let mapping = IncludeListAndMapping::new().relationship("subject", vec!["contractor", "client"]);
        let client = record_with("subject", RelationshipRef::one(ResourceIdentifier::new("client", "3")));
        // `supplier` is not a mapped target, so contractor/3 must not be merged either.
        let supplier = record_with("subject", RelationshipRef::one(ResourceIdentifier::new("supplier", "3")));

        let combined = populate_relationships(&[client, supplier], &mapping, &dicts);

        assert_eq!(
            combined[0].relationship("subject"),
            Some(&json!({ "id": "3", "type": "client" }))
        );
        assert_eq!(
            combined[1].relationship("subject"),
            Some(&json!({ "id": "3", "type": "supplier" }))
        );
    }

    #[test]
    fn test_dictionary_attributes_win_collisions() {
        let dicts = Dictionaries::from([(
            "user".to_string(),
            Dictionary::from([("5".to_string(), object(json!({ "id": "5", "type": "staff" })))]),
        )]);
        let mapping = IncludeListAndMapping::new().relationship("owner", "user");
        let record = record_with("owner", RelationshipRef::one(ResourceIdentifier::new("user", "5")));

        let combined = populate_relationships(&[record], &mapping, &dicts);

        assert_eq!(
            combined[0].relationship("owner"),
            Some(&json!({ "id": "5", "type": "staff" }))
        );
    }

    /// case.notes[] -> note.author -> user.team: only note.author is resolved.
    fn nested_fixture() -> (ResourceObject, IncludeListAndMapping, Dictionaries) {
        let dicts = Dictionaries::from([
            (
                "note".to_string(),
                Dictionary::from([(
                    "10".to_string(),
                    object(json!({
                        "id": "10",
                        "body": "Called client",
                        "relationships": { "author": { "data": { "id": "5", "type": "user" } } }
                    })),
                )]),
            ),
            (
                "user".to_string(),
                Dictionary::from([(
                    "5".to_string(),
                    object(json!({
                        "id": "5",
                        "name": "Alex",
                        "relationships": { "team": { "data": { "id": "2", "type": "team" } } }
                    })),
                )]),
            ),
            (
                "team".to_string(),
                Dictionary::from([("2".to_string(), object(json!({ "id": "2", "name": "Field" })))]),
            ),
        ]);
        let mapping = IncludeListAndMapping::new()
            .relationship("notes", "note")
            .nested("notes", "author", "user")
            .nested("author", "team", "team");
        let record = record_with(
            "notes",
            RelationshipRef::many(vec![ResourceIdentifier::new("note", "10")]),
        );
        (record, mapping, dicts)
    }

    #[test]
    fn test_nested_resolution_stops_after_one_level() {
        let (record, mapping, dicts) = nested_fixture();

        let combined = populate_relationships(&[record], &mapping, &dicts);
        let note = &combined[0].relationship("notes").unwrap()[0];

        assert_eq!(note["body"], "Called client");
        assert_eq!(note["relationships"]["author"]["name"], "Alex");
        // Third level stays a raw reference.
        assert_eq!(
            note["relationships"]["author"]["relationships"]["team"],
            json!({ "data": { "id": "2", "type": "team" } })
        );
    }

    #[test]
    fn test_nested_requires_matching_type() {
        let (record, mut mapping, dicts) = nested_fixture();
        mapping = mapping.nested("notes", "author", "contractor");

        let combined = populate_relationships(&[record], &mapping, &dicts);
        let note = &combined[0].relationship("notes").unwrap()[0];

        assert_eq!(
            note["relationships"]["author"],
            json!({ "data": { "id": "5", "type": "user" } })
        );
    }

    /// case.notes[] -> note.watchers[]: users 5 and 77, only 5 is included.
    fn watchers_fixture(watchers: Value) -> (ResourceObject, IncludeListAndMapping, Dictionaries) {
        let (record, _, mut dicts) = nested_fixture();
        dicts.insert(
            "note".to_string(),
            Dictionary::from([(
                "10".to_string(),
                object(json!({
                    "id": "10",
                    "relationships": { "watchers": { "data": watchers } }
                })),
            )]),
        );
        let mapping = IncludeListAndMapping::new()
            .relationship("notes", "note")
            .nested("notes", "watchers", "user");
        (record, mapping, dicts)
    }

    #[test]
    fn test_nested_array_resolves_element_wise() {
        let (record, mapping, dicts) = watchers_fixture(json!([
            { "id": "5", "type": "user" },
            { "id": "77", "type": "user" }
        ]));

        let combined = populate_relationships(&[record], &mapping, &dicts);
        let note = &combined[0].relationship("notes").unwrap()[0];

        assert_eq!(note["relationships"]["watchers"][0]["name"], "Alex");
        assert_eq!(
            note["relationships"]["watchers"][1],
            json!({ "id": "77", "type": "user" })
        );
    }

    #[test]
    fn test_nested_array_without_matches_is_untouched() {
        let watchers = json!([
            { "id": "77", "type": "user" },
            { "id": "5", "type": "team" }
        ]);
        let (record, mapping, dicts) = watchers_fixture(watchers.clone());

        let combined = populate_relationships(&[record], &mapping, &dicts);
        let note = &combined[0].relationship("notes").unwrap()[0];

        assert_eq!(note["relationships"]["watchers"], json!({ "data": watchers }));
    }

    #[test]
    fn test_singleton_relationships_are_not_traversed() {
        let (_, _, dicts) = nested_fixture();
        let mapping = IncludeListAndMapping::new()
            .relationship("latest_note", "note")
            .nested("latest_note", "author", "user");
        let record = record_with(
            "latest_note",
            RelationshipRef::one(ResourceIdentifier::new("note", "10")),
        );

        let combined = populate_relationships(&[record], &mapping, &dicts);
        let note = combined[0].relationship("latest_note").unwrap();

        assert_eq!(
            note["relationships"]["author"],
            json!({ "data": { "id": "5", "type": "user" } })
        );
    }
}

//! Caller-supplied description of which relationships to include and how to resolve them.
//!
//! A relationship name maps to one resource type, or to several for polymorphic
//! relations. Nested relationships (a relation found inside an already-resolved related
//! resource) are addressed with a [`NestedRelationshipKey`] rather than a dotted string.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The resource type(s) a relationship resolves against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncludeTargets {
    One(String),
    Many(Vec<String>),
}

impl IncludeTargets {
    pub fn as_slice(&self) -> &[String] {
        match self {
            IncludeTargets::One(target) => std::slice::from_ref(target),
            IncludeTargets::Many(targets) => targets,
        }
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.as_slice().iter().any(|t| t == resource_type)
    }
}

impl From<&str> for IncludeTargets {
    fn from(target: &str) -> Self {
        IncludeTargets::One(target.to_string())
    }
}

impl From<String> for IncludeTargets {
    fn from(target: String) -> Self {
        IncludeTargets::One(target)
    }
}

impl From<Vec<&str>> for IncludeTargets {
    fn from(targets: Vec<&str>) -> Self {
        IncludeTargets::Many(targets.into_iter().map(str::to_string).collect())
    }
}

/// Addresses relationship `inner` on resources reached through relationship `outer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NestedRelationshipKey {
    pub outer: String,
    pub inner: String,
}

impl NestedRelationshipKey {
    pub fn new(outer: impl Into<String>, inner: impl Into<String>) -> Self {
        Self {
            outer: outer.into(),
            inner: inner.into(),
        }
    }
}

/// The `include=` list sent to the server plus the relationship → type mapping.
///
/// ```
/// use resource_aggregator::include::IncludeListAndMapping;
///
/// let mapping = IncludeListAndMapping::new()
///     .include("contractor")
///     .include("contractor.trades")
///     .relationship("contractor", "contractors")
///     .relationship("subject", vec!["contractors", "clients"])
///     .nested("contractor", "trades", "trades");
///
/// assert_eq!(mapping.query_fragment().as_deref(), Some("include=contractor,contractor.trades"));
/// assert_eq!(
///     mapping.dictionary_keys().into_iter().collect::<Vec<_>>(),
///     vec!["clients", "contractors", "trades"]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncludeListAndMapping {
    pub includes: Vec<String>,
    pub relationships: BTreeMap<String, IncludeTargets>,
    pub nested: BTreeMap<NestedRelationshipKey, IncludeTargets>,
}

impl IncludeListAndMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, name: impl Into<String>) -> Self {
        self.includes.push(name.into());
        self
    }

    pub fn relationship(mut self, name: impl Into<String>, targets: impl Into<IncludeTargets>) -> Self {
        self.relationships.insert(name.into(), targets.into());
        self
    }

    pub fn nested(
        mut self,
        outer: impl Into<String>,
        inner: impl Into<String>,
        targets: impl Into<IncludeTargets>,
    ) -> Self {
        self.nested
            .insert(NestedRelationshipKey::new(outer, inner), targets.into());
        self
    }

    /// Builds a mapping from textual `name=type[,type]` pairs, as typed on a command line.
    /// A dotted name (`outer.inner`) declares a nested relationship.
    pub fn from_pairs<I, S>(includes: I, pairs: impl IntoIterator<Item = (String, String)>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut mapping = Self {
            includes: includes.into_iter().map(Into::into).collect(),
            ..Self::default()
        };
        for (name, value) in pairs {
            let targets: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            let targets = match targets.len() {
                0 => continue,
                1 => IncludeTargets::One(targets.into_iter().next().unwrap_or_default()),
                _ => IncludeTargets::Many(targets),
            };
            match name.split_once('.') {
                Some((outer, inner)) => {
                    mapping
                        .nested
                        .insert(NestedRelationshipKey::new(outer, inner), targets);
                }
                None => {
                    mapping.relationships.insert(name, targets);
                }
            }
        }
        mapping
    }

    pub fn targets(&self, relationship: &str) -> Option<&IncludeTargets> {
        self.relationships.get(relationship)
    }

    pub fn nested_targets(&self, key: &NestedRelationshipKey) -> Option<&IncludeTargets> {
        self.nested.get(key)
    }

    /// Every distinct resource type a dictionary must be built for.
    pub fn dictionary_keys(&self) -> BTreeSet<&str> {
        self.relationships
            .values()
            .chain(self.nested.values())
            .flat_map(|targets| targets.as_slice().iter().map(String::as_str))
            .collect()
    }

    /// `include=a,b` for the query string, or `None` when nothing is included.
    pub fn query_fragment(&self) -> Option<String> {
        if self.includes.is_empty() {
            None
        } else {
            Some(format!("include={}", self.includes.join(",")))
        }
    }
}

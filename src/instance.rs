//! Per-line object graphs.
//!
//! Binding one line fills an [`InstanceGraph`] holding exactly one
//! [`Instance`] per participating record type. Link fields are resolved to
//! [`TypeKey`]s inside that graph, so navigation stays within the line.

use crate::error::{BindError, Result};
use crate::value::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Identity of a participating record type within one compiled schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(pub(crate) usize);

impl TypeKey {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Bound values of one record type for one line.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    record: String,
    values: BTreeMap<String, Value>,
    links: BTreeMap<String, TypeKey>,
    collections: BTreeMap<String, Vec<TypeKey>>,
}

impl Instance {
    pub(crate) fn new(record: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            values: BTreeMap::new(),
            links: BTreeMap::new(),
            collections: BTreeMap::new(),
        }
    }

    /// Name of the record type.
    pub fn record(&self) -> &str {
        &self.record
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// The value of `field`, or [`BindError::MissingValue`].
    pub fn require(&self, field: &str) -> Result<&Value> {
        self.values.get(field).ok_or_else(|| BindError::MissingValue {
            record: self.record.clone(),
            field: field.to_string(),
        })
    }

    /// Text value of `field`; `None` if absent or not text.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn link(&self, field: &str) -> Option<TypeKey> {
        self.links.get(field).copied()
    }

    pub fn collection(&self, field: &str) -> &[TypeKey] {
        self.collections.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn set(&mut self, field: impl Into<String>, value: Value) {
        self.values.insert(field.into(), value);
    }

    pub(crate) fn set_link(&mut self, field: impl Into<String>, target: TypeKey) {
        self.links.insert(field.into(), target);
    }

    pub(crate) fn set_collection(&mut self, field: impl Into<String>, items: Vec<TypeKey>) {
        self.collections.insert(field.into(), items);
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

/// One fresh instance per participating record type, indexed by [`TypeKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceGraph {
    instances: Vec<Instance>,
}

impl InstanceGraph {
    /// Creates empty instances for `types`, keyed by their index.
    pub fn new<S: AsRef<str>>(types: &[S]) -> Self {
        Self {
            instances: types.iter().map(|t| Instance::new(t.as_ref())).collect(),
        }
    }

    pub fn get(&self, key: TypeKey) -> Option<&Instance> {
        self.instances.get(key.0)
    }

    pub(crate) fn get_mut(&mut self, key: TypeKey) -> Option<&mut Instance> {
        self.instances.get_mut(key.0)
    }

    pub fn key_of(&self, record: &str) -> Option<TypeKey> {
        self.instances
            .iter()
            .position(|i| i.record == record)
            .map(TypeKey)
    }

    /// The instance of the record type named `record`.
    pub fn find(&self, record: &str) -> Option<&Instance> {
        self.key_of(record).and_then(|k| self.get(k))
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeKey, &Instance)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, inst)| (TypeKey(i), inst))
    }

    /// Follows link `field` of the instance at `owner`.
    pub fn linked(&self, owner: TypeKey, field: &str) -> Option<&Instance> {
        self.get(owner)
            .and_then(|i| i.link(field))
            .and_then(|k| self.get(k))
    }
}

impl Serialize for InstanceGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.instances.len()))?;
        for instance in &self.instances {
            map.serialize_entry(&instance.record, instance)?;
        }
        map.end()
    }
}

/// A bound line: its instance graph plus the root record type.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    graph: InstanceGraph,
    root: TypeKey,
    line: usize,
}

impl Record {
    pub(crate) fn new(graph: InstanceGraph, root: TypeKey, line: usize) -> Self {
        Self { graph, root, line }
    }

    /// The instance of the record type the schema was compiled for.
    pub fn root(&self) -> &Instance {
        &self.graph.instances[self.root.0]
    }

    pub fn graph(&self) -> &InstanceGraph {
        &self.graph
    }

    pub fn into_graph(self) -> InstanceGraph {
        self.graph
    }

    /// 1-based source line this record was bound from.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Instance of the participating record type named `record`.
    pub fn get(&self, record: &str) -> Option<&Instance> {
        self.graph.find(record)
    }

    /// Follows link `field` of the root instance.
    pub fn linked(&self, field: &str) -> Option<&Instance> {
        self.graph.linked(self.root, field)
    }

    /// Elements of collection `field` declared on record type `owner`.
    pub fn collection(&self, owner: &str, field: &str) -> Vec<&Instance> {
        self.graph
            .find(owner)
            .map(|o| {
                o.collection(field)
                    .iter()
                    .filter_map(|k| self.graph.get(*k))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.graph.serialize(serializer)
    }
}

//! Schema node data model - the universal structural output type.
//!
//! Every resolved type becomes a [`SchemaNode`]: a plain typed node
//! (string/number/object/...), a named reference, or a composition node
//! (`allOf` for inheritance, `anyOf` for unions). Format exporters consume
//! this type read-only.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Extension key under which unrecognized predicate names are preserved.
pub const UNHANDLED_PREDICATES_KEY: &str = "x-unhandled-predicates";

/// Concrete JSON type tag for a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl SchemaType {
    /// Whether numeric bounds apply to this type.
    pub fn is_numeric(self) -> bool {
        matches!(self, SchemaType::Number | SchemaType::Integer)
    }

    /// Parse a type name as written in definition documents or `type?`
    /// predicate arguments. Accepts common aliases ("int", "str", "hash").
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Some(SchemaType::String),
            "number" | "float" | "decimal" => Some(SchemaType::Number),
            "integer" | "int" => Some(SchemaType::Integer),
            "boolean" | "bool" => Some(SchemaType::Boolean),
            "object" | "hash" => Some(SchemaType::Object),
            "array" => Some(SchemaType::Array),
            _ => None,
        }
    }
}

/// Odd/even marker extracted from parity predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Odd,
    Even,
}

/// One node in the resolved schema graph.
///
/// A node is either a plain type, a bare named reference (only
/// `canonical_name` set), or a composition node (`all_of`/`any_of`
/// non-empty) - never a mix of forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<SchemaType>,

    /// Identity used for de-duplication and named references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Arc<SchemaNode>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Arc<SchemaNode>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Arc<SchemaNode>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Arc<SchemaNode>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parity: Option<Parity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_values: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,

    /// Vendor metadata, serialized inline (e.g. `x-unhandled-predicates`).
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl SchemaNode {
    /// A plain node with the given type tag.
    pub fn typed(ty: SchemaType) -> Self {
        SchemaNode {
            ty: Some(ty),
            ..SchemaNode::default()
        }
    }

    /// An object node with no properties yet.
    pub fn object() -> Self {
        SchemaNode::typed(SchemaType::Object)
    }

    /// An array node with the given item schema.
    pub fn array(items: Option<Arc<SchemaNode>>) -> Self {
        SchemaNode {
            ty: Some(SchemaType::Array),
            items,
            ..SchemaNode::default()
        }
    }

    /// A bare named reference: only the canonical name, no structure.
    ///
    /// The full node is found in the build cache under the same name once
    /// the owning build completes.
    pub fn reference(name: impl Into<String>) -> Self {
        SchemaNode {
            canonical_name: Some(name.into()),
            ..SchemaNode::default()
        }
    }

    /// A composition node conforming to every listed sub-schema.
    pub fn all_of(parts: Vec<Arc<SchemaNode>>) -> Self {
        SchemaNode {
            all_of: parts,
            ..SchemaNode::default()
        }
    }

    /// A composition node conforming to at least one listed sub-schema.
    /// The type tag stays unset on `anyOf` nodes.
    pub fn any_of(parts: Vec<Arc<SchemaNode>>) -> Self {
        SchemaNode {
            any_of: parts,
            ..SchemaNode::default()
        }
    }

    /// Set the canonical name if not already set.
    pub fn named(mut self, name: &str) -> Self {
        if self.canonical_name.is_none() {
            self.canonical_name = Some(name.to_string());
        }
        self
    }

    /// Whether this node is a bare reference placeholder.
    pub fn is_reference(&self) -> bool {
        self.canonical_name.is_some()
            && self.ty.is_none()
            && self.properties.is_empty()
            && self.items.is_none()
            && self.all_of.is_empty()
            && self.any_of.is_empty()
    }

    /// Whether this node is an `allOf`/`anyOf` composition.
    pub fn is_composition(&self) -> bool {
        !self.all_of.is_empty() || !self.any_of.is_empty()
    }

    /// Record predicate names the engine did not understand under the
    /// vendor-extension key. Already-recorded names are not duplicated.
    pub fn push_unhandled(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        let entry = self
            .extensions
            .entry(UNHANDLED_PREDICATES_KEY.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = entry {
            for name in names {
                let v = Value::String(name.clone());
                if !list.contains(&v) {
                    list.push(v);
                }
            }
        }
    }
}

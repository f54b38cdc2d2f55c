//! Definition document model - the subjects the schema-graph builder resolves.
//!
//! Subject kinds form a closed tagged enum rather than open structural
//! probing: each registry handler declares which kinds it accepts by
//! matching on [`TypeDef`] variants.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::LoadError;
use crate::predicate::PredicateNode;
use crate::schema::SchemaType;

/// A named type description from a definition document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDef {
    /// Struct-like type with declared fields, optionally extending a parent.
    Entity(EntityDef),
    /// Validation contract: fields described by rule trees.
    Contract(ContractDef),
    /// Alternative-of-N-variants sum type.
    Union(UnionDef),
    /// Named scalar (e.g. a `Uuid` string alias).
    Alias(AliasDef),
}

impl TypeDef {
    /// The canonical identity used for caching and named references.
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Entity(e) => &e.name,
            TypeDef::Contract(c) => &c.name,
            TypeDef::Union(u) => &u.name,
            TypeDef::Alias(a) => &a.name,
        }
    }

    /// Kind label for listings and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeDef::Entity(_) => "entity",
            TypeDef::Contract(_) => "contract",
            TypeDef::Union(_) => "union",
            TypeDef::Alias(_) => "alias",
        }
    }
}

/// Struct-like type with declared fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Structural parent this entity extends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Field distinguishing this entity from its parent. Without one,
    /// inheritance means "same shape" and properties flatten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// One declared field on an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "FieldMeta::is_default")]
    pub meta: FieldMeta,
}

/// Reference to another type: a scalar, a named definition, or an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeRef {
    Scalar(SchemaType),
    Named(String),
    Array(ArrayRef),
}

/// Array reference with its item type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayRef {
    pub items: Box<TypeRef>,
}

impl TypeRef {
    /// Display name for diagnostics.
    pub fn display_name(&self) -> String {
        match self {
            TypeRef::Scalar(ty) => match serde_json::to_value(ty) {
                Ok(Value::String(s)) => s,
                _ => "scalar".to_string(),
            },
            TypeRef::Named(name) => name.clone(),
            TypeRef::Array(_) => "array".to_string(),
        }
    }
}

/// Validation contract: each field carries a rule tree plus static metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<ContractField>,
}

/// One contract field: declared required-ness, static metadata, and the
/// rule tree the walker interprets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractField {
    pub name: String,
    /// Whether the contract declares the key required (as opposed to
    /// optional). A top-level implication rule overrides this to optional;
    /// a `key?` predicate overrides it to required.
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "FieldMeta::is_default")]
    pub meta: FieldMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<PredicateNode>,
}

/// Sum type over a list of variant references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub variants: Vec<TypeRef>,
}

/// Named scalar alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Static per-field declarations, applied before rule-derived constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldMeta {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<SchemaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
    /// Vendor metadata copied through to the schema node.
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl FieldMeta {
    /// True when no declaration is present.
    pub fn is_default(&self) -> bool {
        *self == FieldMeta::default()
    }
}

/// Index of named type definitions for one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definitions {
    by_name: IndexMap<String, TypeDef>,
}

impl Definitions {
    /// Index a list of definitions, rejecting duplicate names.
    pub fn new(defs: Vec<TypeDef>) -> Result<Self, LoadError> {
        let mut by_name = IndexMap::with_capacity(defs.len());
        for def in defs {
            let name = def.name().to_string();
            if by_name.insert(name.clone(), def).is_some() {
                return Err(LoadError::DuplicateDefinition { name });
            }
        }
        Ok(Definitions { by_name })
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.by_name.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeDef)> {
        self.by_name.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

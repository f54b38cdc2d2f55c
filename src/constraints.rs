//! Constraint accumulation and type-aware application.
//!
//! A [`ConstraintSet`] collects the structural facts extracted from one
//! field's rule tree. Sets combine two ways: [`merge`](ConstraintSet::merge)
//! for conjunction (first non-empty value survives) and
//! [`intersect`](ConstraintSet::intersect) for disjunction (only what every
//! branch guarantees survives). [`apply`] folds a finished set onto a schema
//! node, routing size/numeric/pattern facts by the node's type.

use serde_json::{Number, Value};

use crate::schema::{Parity, SchemaNode, SchemaType};
use crate::types::FieldMeta;

/// Structural facts extracted from a single field's rule tree.
///
/// Created fresh per field per walk, then folded into a schema node by
/// [`apply`] and discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSet {
    /// Allowed literal values. `None` means unconstrained.
    pub enum_values: Option<Vec<Value>>,
    /// Tri-state: unset / explicitly nullable / explicitly non-null.
    pub nullable: Option<bool>,
    /// Length or cardinality lower bound.
    pub min_size: Option<u64>,
    /// Length or cardinality upper bound.
    pub max_size: Option<u64>,
    pub minimum: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_minimum: Option<bool>,
    pub exclusive_maximum: Option<bool>,
    /// Regex source for string values.
    pub pattern: Option<String>,
    pub excluded_values: Option<Vec<Value>>,
    /// Concrete type declared by a type predicate.
    pub type_predicate: Option<SchemaType>,
    pub parity: Option<Parity>,
    /// Semantic string format token (date, email, uuid, ...).
    pub format: Option<String>,
    /// Tri-state required-ness. Unlike the other fields, the most specific
    /// rule overwrites an earlier value.
    pub required: Option<bool>,
    /// Predicate names with no known mapping, in encounter order.
    /// Preserved losslessly for forward compatibility.
    pub unhandled: Vec<String>,
}

impl ConstraintSet {
    /// True when no fact has been recorded.
    pub fn is_empty(&self) -> bool {
        *self == ConstraintSet::default()
    }

    /// Conjunction: fold `other` into `self`.
    ///
    /// Every field is set-once-wins (the first non-empty value survives),
    /// except `required`, which the incoming set overwrites when present.
    pub fn merge(&mut self, other: ConstraintSet) {
        keep(&mut self.enum_values, other.enum_values);
        keep(&mut self.nullable, other.nullable);
        keep(&mut self.min_size, other.min_size);
        keep(&mut self.max_size, other.max_size);
        keep(&mut self.minimum, other.minimum);
        keep(&mut self.maximum, other.maximum);
        keep(&mut self.exclusive_minimum, other.exclusive_minimum);
        keep(&mut self.exclusive_maximum, other.exclusive_maximum);
        keep(&mut self.pattern, other.pattern);
        keep(&mut self.excluded_values, other.excluded_values);
        keep(&mut self.type_predicate, other.type_predicate);
        keep(&mut self.parity, other.parity);
        keep(&mut self.format, other.format);
        if other.required.is_some() {
            self.required = other.required;
        }
        self.extend_unhandled(other.unhandled);
    }

    /// Disjunction: combine independent branch sets into the constraints
    /// every branch satisfies.
    ///
    /// Enums intersect, lower bounds take the largest value across branches,
    /// upper bounds the smallest, and boolean flags AND together (an
    /// explicit `false` in any branch forces `false`). Remaining fields keep
    /// the first branch's value when the other branch is silent.
    pub fn intersect(mut self, other: ConstraintSet) -> ConstraintSet {
        self.enum_values = match (self.enum_values, other.enum_values) {
            (Some(a), Some(b)) => Some(a.into_iter().filter(|v| b.contains(v)).collect()),
            (a, b) => a.or(b),
        };
        self.minimum = num_upper(self.minimum, other.minimum);
        self.maximum = num_lower(self.maximum, other.maximum);
        self.min_size = match (self.min_size, other.min_size) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.max_size = match (self.max_size, other.max_size) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.nullable = and_flags(self.nullable, other.nullable);
        self.exclusive_minimum = and_flags(self.exclusive_minimum, other.exclusive_minimum);
        self.exclusive_maximum = and_flags(self.exclusive_maximum, other.exclusive_maximum);
        keep(&mut self.pattern, other.pattern);
        keep(&mut self.excluded_values, other.excluded_values);
        keep(&mut self.type_predicate, other.type_predicate);
        keep(&mut self.parity, other.parity);
        keep(&mut self.format, other.format);
        keep(&mut self.required, other.required);
        self.extend_unhandled(other.unhandled);
        self
    }

    fn extend_unhandled(&mut self, names: Vec<String>) {
        for name in names {
            if !self.unhandled.contains(&name) {
                self.unhandled.push(name);
            }
        }
    }
}

fn keep<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if slot.is_none() {
        *slot = incoming;
    }
}

/// Tri-state AND: an explicit `false` in either operand forces `false`,
/// `true` requires `true` on both sides, anything else stays unset.
fn and_flags(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn num_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or(0.0)
}

fn num_upper(a: Option<Number>, b: Option<Number>) -> Option<Number> {
    match (a, b) {
        (Some(x), Some(y)) => {
            if num_f64(&y) > num_f64(&x) {
                Some(y)
            } else {
                Some(x)
            }
        }
        (x, y) => x.or(y),
    }
}

fn num_lower(a: Option<Number>, b: Option<Number>) -> Option<Number> {
    match (a, b) {
        (Some(x), Some(y)) => {
            if num_f64(&y) < num_f64(&x) {
                Some(y)
            } else {
                Some(x)
            }
        }
        (x, y) => x.or(y),
    }
}

/// Fold static field metadata and extracted constraints onto a schema node.
///
/// Metadata is applied first as the declared baseline; rule-derived
/// constraints only fill fields still unset. Routing is type-aware: string
/// nodes take length/pattern facts, numeric nodes take bounds, array nodes
/// take item counts. A numeric bound arriving at a string node is a silent
/// no-op, not an error. Re-applying identical inputs changes nothing.
pub fn apply(schema: &mut SchemaNode, constraints: &ConstraintSet, meta: &FieldMeta) {
    apply_meta(schema, meta);

    // A type predicate fixes the node type when nothing declared one.
    if schema.ty.is_none() {
        schema.ty = constraints.type_predicate;
    }

    // Type-agnostic facts.
    if schema.enum_values.is_none() {
        schema.enum_values = constraints.enum_values.clone();
    }
    if schema.nullable.is_none() {
        schema.nullable = constraints.nullable;
    }
    if schema.format.is_none() {
        schema.format = constraints.format.clone();
    }
    if schema.excluded_values.is_none() {
        schema.excluded_values = constraints.excluded_values.clone();
    }
    if schema.parity.is_none() {
        schema.parity = constraints.parity;
    }

    // Type-routed facts.
    match schema.ty {
        Some(SchemaType::String) => {
            if schema.min_length.is_none() {
                schema.min_length = constraints.min_size;
            }
            if schema.max_length.is_none() {
                schema.max_length = constraints.max_size;
            }
            if schema.pattern.is_none() {
                schema.pattern = constraints.pattern.clone();
            }
        }
        Some(ty) if ty.is_numeric() => {
            if schema.minimum.is_none() {
                schema.minimum = constraints.minimum.clone();
                if schema.minimum.is_some() {
                    schema.exclusive_minimum = constraints.exclusive_minimum;
                }
            }
            if schema.maximum.is_none() {
                schema.maximum = constraints.maximum.clone();
                if schema.maximum.is_some() {
                    schema.exclusive_maximum = constraints.exclusive_maximum;
                }
            }
        }
        Some(SchemaType::Array) => {
            if schema.min_items.is_none() {
                schema.min_items = constraints.min_size;
            }
            if schema.max_items.is_none() {
                schema.max_items = constraints.max_size;
            }
        }
        // Object, boolean, or untyped nodes take no routed facts.
        _ => {}
    }

    schema.push_unhandled(&constraints.unhandled);
}

fn apply_meta(schema: &mut SchemaNode, meta: &FieldMeta) {
    if schema.ty.is_none() {
        schema.ty = meta.ty;
    }
    keep(&mut schema.description, meta.description.clone());
    keep(&mut schema.format, meta.format.clone());
    keep(&mut schema.pattern, meta.pattern.clone());
    keep(&mut schema.nullable, meta.nullable);
    keep(&mut schema.enum_values, meta.enum_values.clone());
    keep(&mut schema.minimum, meta.minimum.clone());
    keep(&mut schema.maximum, meta.maximum.clone());
    keep(&mut schema.min_length, meta.min_length);
    keep(&mut schema.max_length, meta.max_length);
    keep(&mut schema.min_items, meta.min_items);
    keep(&mut schema.max_items, meta.max_items);
    if schema.examples.is_empty() {
        schema.examples = meta.examples.clone();
    }
    for (key, value) in &meta.extensions {
        schema
            .extensions
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UNHANDLED_PREDICATES_KEY;
    use serde_json::json;

    fn num(n: i64) -> Number {
        Number::from(n)
    }

    #[test]
    fn merge_first_value_wins() {
        let mut a = ConstraintSet {
            minimum: Some(num(1)),
            ..ConstraintSet::default()
        };
        a.merge(ConstraintSet {
            minimum: Some(num(5)),
            maximum: Some(num(10)),
            ..ConstraintSet::default()
        });

        assert_eq!(a.minimum, Some(num(1)));
        assert_eq!(a.maximum, Some(num(10)));
    }

    #[test]
    fn merge_required_overwrites() {
        let mut a = ConstraintSet {
            required: Some(true),
            ..ConstraintSet::default()
        };
        a.merge(ConstraintSet {
            required: Some(false),
            ..ConstraintSet::default()
        });
        assert_eq!(a.required, Some(false));
    }

    #[test]
    fn merge_unhandled_appends_in_order() {
        let mut a = ConstraintSet {
            unhandled: vec!["alpha?".into()],
            ..ConstraintSet::default()
        };
        a.merge(ConstraintSet {
            unhandled: vec!["beta?".into(), "alpha?".into()],
            ..ConstraintSet::default()
        });
        assert_eq!(a.unhandled, vec!["alpha?".to_string(), "beta?".to_string()]);
    }

    #[test]
    fn intersect_enums() {
        let a = ConstraintSet {
            enum_values: Some(vec![json!("a"), json!("b")]),
            ..ConstraintSet::default()
        };
        let b = ConstraintSet {
            enum_values: Some(vec![json!("b"), json!("c")]),
            ..ConstraintSet::default()
        };
        assert_eq!(a.intersect(b).enum_values, Some(vec![json!("b")]));
    }

    #[test]
    fn intersect_disjoint_enums_empty() {
        let a = ConstraintSet {
            enum_values: Some(vec![json!(1)]),
            ..ConstraintSet::default()
        };
        let b = ConstraintSet {
            enum_values: Some(vec![json!(2)]),
            ..ConstraintSet::default()
        };
        assert_eq!(a.intersect(b).enum_values, Some(vec![]));
    }

    #[test]
    fn intersect_tightens_bounds() {
        let a = ConstraintSet {
            minimum: Some(num(1)),
            maximum: Some(num(10)),
            ..ConstraintSet::default()
        };
        let b = ConstraintSet {
            minimum: Some(num(5)),
            maximum: Some(num(8)),
            ..ConstraintSet::default()
        };
        let out = a.intersect(b);
        assert_eq!(out.minimum, Some(num(5)));
        assert_eq!(out.maximum, Some(num(8)));
    }

    #[test]
    fn intersect_flags_explicit_false_wins() {
        let a = ConstraintSet {
            nullable: Some(true),
            ..ConstraintSet::default()
        };
        let b = ConstraintSet {
            nullable: Some(false),
            ..ConstraintSet::default()
        };
        assert_eq!(a.intersect(b).nullable, Some(false));

        let a = ConstraintSet {
            nullable: Some(true),
            ..ConstraintSet::default()
        };
        let b = ConstraintSet::default();
        assert_eq!(a.intersect(b).nullable, None);
    }

    #[test]
    fn apply_routes_string_facts() {
        let mut schema = SchemaNode::typed(SchemaType::String);
        let cs = ConstraintSet {
            min_size: Some(3),
            max_size: Some(64),
            pattern: Some("^[a-z]+$".into()),
            ..ConstraintSet::default()
        };
        apply(&mut schema, &cs, &FieldMeta::default());

        assert_eq!(schema.min_length, Some(3));
        assert_eq!(schema.max_length, Some(64));
        assert_eq!(schema.pattern.as_deref(), Some("^[a-z]+$"));
        assert!(schema.min_items.is_none());
    }

    #[test]
    fn apply_numeric_facts_noop_on_string() {
        let mut schema = SchemaNode::typed(SchemaType::String);
        let cs = ConstraintSet {
            minimum: Some(num(1)),
            maximum: Some(num(9)),
            exclusive_minimum: Some(true),
            ..ConstraintSet::default()
        };
        apply(&mut schema, &cs, &FieldMeta::default());

        assert!(schema.minimum.is_none());
        assert!(schema.maximum.is_none());
        assert!(schema.min_length.is_none());
        assert!(schema.max_length.is_none());
        assert!(schema.pattern.is_none());
    }

    #[test]
    fn apply_routes_array_facts() {
        let mut schema = SchemaNode::typed(SchemaType::Array);
        let cs = ConstraintSet {
            min_size: Some(1),
            max_size: Some(5),
            ..ConstraintSet::default()
        };
        apply(&mut schema, &cs, &FieldMeta::default());

        assert_eq!(schema.min_items, Some(1));
        assert_eq!(schema.max_items, Some(5));
        assert!(schema.min_length.is_none());
    }

    #[test]
    fn apply_meta_takes_precedence() {
        let mut schema = SchemaNode::default();
        let meta = FieldMeta {
            ty: Some(SchemaType::Integer),
            minimum: Some(num(0)),
            description: Some("count".into()),
            ..FieldMeta::default()
        };
        let cs = ConstraintSet {
            minimum: Some(num(10)),
            type_predicate: Some(SchemaType::String),
            ..ConstraintSet::default()
        };
        apply(&mut schema, &cs, &meta);

        assert_eq!(schema.ty, Some(SchemaType::Integer));
        assert_eq!(schema.minimum, Some(num(0)));
        assert_eq!(schema.description.as_deref(), Some("count"));
    }

    #[test]
    fn apply_is_idempotent() {
        let mut schema = SchemaNode::typed(SchemaType::Integer);
        let cs = ConstraintSet {
            minimum: Some(num(1)),
            exclusive_minimum: Some(true),
            unhandled: vec!["custom?".into()],
            ..ConstraintSet::default()
        };
        let meta = FieldMeta::default();

        apply(&mut schema, &cs, &meta);
        let first = schema.clone();
        apply(&mut schema, &cs, &meta);
        assert_eq!(schema, first);
    }

    #[test]
    fn apply_records_unhandled_extension() {
        let mut schema = SchemaNode::typed(SchemaType::String);
        let cs = ConstraintSet {
            unhandled: vec!["respond_to?".into()],
            ..ConstraintSet::default()
        };
        apply(&mut schema, &cs, &FieldMeta::default());

        assert_eq!(
            schema.extensions[UNHANDLED_PREDICATES_KEY],
            json!(["respond_to?"])
        );
    }
}

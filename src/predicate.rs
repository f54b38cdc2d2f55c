//! Predicate-AST walking - extracts structural constraints from rule trees.
//!
//! Validation contracts represent each field's rules as a tagged boolean
//! tree: leaf predicates (`gt?`, `filled?`, `included_in?`, ...) combined by
//! `and`/`or`/`not`/`implication` and wrapped by structural `rule`/`key`/
//! `each` nodes. [`walk`] interprets that tree into a [`ConstraintSet`].
//!
//! The walker is pure and total: unrecognized node shapes degrade to empty
//! constraints and unknown predicate names are recorded, never rejected -
//! rule producers evolve independently of this engine.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::constraints::ConstraintSet;
use crate::schema::{Parity, SchemaType};

/// Tagged rule-tree node produced by a validation contract.
///
/// Treated as read-only input; the walker never mutates or normalizes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateNode {
    /// Leaf predicate with its declared arguments.
    Predicate {
        name: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    /// Transparent wrapper around a single child rule.
    Rule(Box<PredicateNode>),
    /// Conjunction of child rules.
    And(Vec<PredicateNode>),
    /// Disjunction of independent branches.
    Or(Vec<PredicateNode>),
    /// Negated child rule.
    Not(Box<PredicateNode>),
    /// Conditional rule: antecedent then consequent.
    Implication(Vec<PredicateNode>),
    /// Rule scoped to a named key.
    Key {
        name: String,
        node: Box<PredicateNode>,
    },
    /// Rule applied to every member of a collection.
    Each(Box<PredicateNode>),
}

impl PredicateNode {
    /// Convenience constructor for a leaf predicate.
    pub fn predicate(name: impl Into<String>, args: Vec<Value>) -> Self {
        PredicateNode::Predicate {
            name: name.into(),
            args,
        }
    }
}

/// Interpret a rule tree into the constraints it implies.
///
/// `and` merges child sets (first value wins per field), `or` intersects
/// independently-walked branches, `implication` folds the consequent in
/// like `and`. `not` returns the child's constraints unchanged except for
/// predicates whose name encodes polarity (`nil?`); compound negation is
/// not generically invertible and is intentionally left alone.
pub fn walk(node: &PredicateNode) -> ConstraintSet {
    match node {
        PredicateNode::Predicate { name, args } => walk_predicate(name, args),
        PredicateNode::Rule(child) | PredicateNode::Each(child) => walk(child),
        PredicateNode::Key { node, .. } => walk(node),
        PredicateNode::And(children) | PredicateNode::Implication(children) => {
            merge_all(children.iter().map(walk))
        }
        PredicateNode::Or(children) => intersect_all(children.iter().map(walk)),
        PredicateNode::Not(child) => walk_negated(child),
    }
}

/// Like [`walk`], but `each` sub-trees contribute nothing.
///
/// Used when the caller wants the constraints on a collection itself:
/// member rules live under `each` and must not leak into the container's
/// size bounds.
pub fn walk_container(node: &PredicateNode) -> ConstraintSet {
    match node {
        PredicateNode::Each(_) => ConstraintSet::default(),
        PredicateNode::Rule(child) => walk_container(child),
        PredicateNode::Key { node, .. } => walk_container(node),
        PredicateNode::And(children) | PredicateNode::Implication(children) => {
            merge_all(children.iter().map(walk_container))
        }
        PredicateNode::Or(children) => intersect_all(children.iter().map(walk_container)),
        other => walk(other),
    }
}

/// Locate the first `each` sub-tree's child, looking through structural
/// wrappers. Returns `None` when the rule has no member-level part.
pub fn each_child(node: &PredicateNode) -> Option<&PredicateNode> {
    match node {
        PredicateNode::Each(child) => Some(child),
        PredicateNode::Rule(child) | PredicateNode::Not(child) => each_child(child),
        PredicateNode::Key { node, .. } => each_child(node),
        PredicateNode::And(children)
        | PredicateNode::Or(children)
        | PredicateNode::Implication(children) => children.iter().find_map(each_child),
        PredicateNode::Predicate { .. } => None,
    }
}

/// Whether the rule's top-level tag is an implication, making the field's
/// presence conditional on the antecedent. Decided here at the rule level,
/// not inside the walker.
pub fn is_conditional(node: &PredicateNode) -> bool {
    match node {
        PredicateNode::Implication(_) => true,
        PredicateNode::Rule(child) => is_conditional(child),
        PredicateNode::Key { node, .. } => is_conditional(node),
        _ => false,
    }
}

fn merge_all(sets: impl Iterator<Item = ConstraintSet>) -> ConstraintSet {
    let mut acc = ConstraintSet::default();
    for set in sets {
        acc.merge(set);
    }
    acc
}

fn intersect_all(mut sets: impl Iterator<Item = ConstraintSet>) -> ConstraintSet {
    let Some(first) = sets.next() else {
        return ConstraintSet::default();
    };
    sets.fold(first, ConstraintSet::intersect)
}

/// Negation only flips predicates whose name carries polarity. Everything
/// else passes through structurally unchanged.
fn walk_negated(child: &PredicateNode) -> ConstraintSet {
    if let PredicateNode::Predicate { name, .. } = child {
        if matches!(name.as_str(), "nil?" | "none?") {
            return ConstraintSet {
                nullable: Some(false),
                ..ConstraintSet::default()
            };
        }
    }
    walk(child)
}

fn walk_predicate(name: &str, args: &[Value]) -> ConstraintSet {
    let mut cs = ConstraintSet::default();

    match name {
        "size?" => {
            if args.len() >= 2 {
                cs.min_size = arg_u64(args, 0);
                cs.max_size = arg_u64(args, 1);
            } else if let Some(range) = args.first().and_then(range_bounds) {
                cs.min_size = range.min.as_ref().and_then(Number::as_u64);
                cs.max_size = range.max.as_ref().and_then(Number::as_u64);
            } else {
                cs.min_size = arg_u64(args, 0);
            }
        }
        "min_size?" => cs.min_size = arg_u64(args, 0),
        "max_size?" => cs.max_size = arg_u64(args, 0),
        "empty?" => {
            cs.min_size = Some(0);
            cs.max_size = Some(0);
        }
        "range?" => {
            if let Some(range) = args.first().and_then(range_bounds) {
                cs.minimum = range.min;
                cs.maximum = range.max;
                if range.exclude_end && cs.maximum.is_some() {
                    cs.exclusive_maximum = Some(true);
                }
            }
        }
        "gt?" => {
            cs.minimum = arg_number(args, 0);
            if cs.minimum.is_some() {
                cs.exclusive_minimum = Some(true);
            }
        }
        "gteq?" | "min?" => cs.minimum = arg_number(args, 0),
        "lt?" => {
            cs.maximum = arg_number(args, 0);
            if cs.maximum.is_some() {
                cs.exclusive_maximum = Some(true);
            }
        }
        "lteq?" | "max?" => cs.maximum = arg_number(args, 0),
        "included_in?" => match args.first() {
            Some(Value::Array(values)) => cs.enum_values = Some(values.clone()),
            Some(other) => {
                if let Some(range) = range_bounds(other) {
                    cs.minimum = range.min;
                    cs.maximum = range.max;
                    if range.exclude_end && cs.maximum.is_some() {
                        cs.exclusive_maximum = Some(true);
                    }
                }
            }
            None => {}
        },
        "excluded_from?" => {
            if let Some(Value::Array(values)) = args.first() {
                cs.excluded_values = Some(values.clone());
            }
        }
        "eql?" => {
            if let Some(value) = args.first() {
                cs.enum_values = Some(vec![value.clone()]);
            }
        }
        "maybe" | "nil?" | "none?" => cs.nullable = Some(true),
        "filled?" => cs.nullable = Some(false),
        "format?" => cs.pattern = pattern_arg(args),
        "uuid?" | "uuid_v4?" => cs.format = Some("uuid".into()),
        "email?" => cs.format = Some("email".into()),
        "uri?" | "url?" => cs.format = Some("uri".into()),
        "date?" => cs.format = Some("date".into()),
        "date_time?" => cs.format = Some("date-time".into()),
        "time?" => cs.format = Some("time".into()),
        "bool?" | "boolean?" => cs.type_predicate = Some(SchemaType::Boolean),
        "int?" | "integer?" => cs.type_predicate = Some(SchemaType::Integer),
        "str?" | "string?" => cs.type_predicate = Some(SchemaType::String),
        "float?" | "decimal?" | "number?" => cs.type_predicate = Some(SchemaType::Number),
        "array?" => cs.type_predicate = Some(SchemaType::Array),
        "hash?" => cs.type_predicate = Some(SchemaType::Object),
        "type?" => match args.first().and_then(Value::as_str).and_then(SchemaType::parse) {
            Some(ty) => cs.type_predicate = Some(ty),
            // Unknown type names are preserved rather than guessed at.
            None => cs.unhandled.push(name.to_string()),
        },
        "odd?" => cs.parity = Some(Parity::Odd),
        "even?" => cs.parity = Some(Parity::Even),
        "key?" => cs.required = Some(true),
        // Lossless fallback for vocabularies this engine does not know.
        _ => cs.unhandled.push(name.to_string()),
    }

    cs
}

struct RangeBounds {
    min: Option<Number>,
    max: Option<Number>,
    exclude_end: bool,
}

/// Read a range argument: `{"min": 1, "max": 10}` with an optional
/// `"excludeEnd": true` for half-open ranges. `"start"`/`"end"` are
/// accepted as synonyms.
fn range_bounds(value: &Value) -> Option<RangeBounds> {
    let obj = value.as_object()?;
    let min = obj
        .get("min")
        .or_else(|| obj.get("start"))
        .and_then(Value::as_number)
        .cloned();
    let max = obj
        .get("max")
        .or_else(|| obj.get("end"))
        .and_then(Value::as_number)
        .cloned();
    if min.is_none() && max.is_none() {
        return None;
    }
    let exclude_end = obj
        .get("excludeEnd")
        .or_else(|| obj.get("exclude_end"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Some(RangeBounds {
        min,
        max,
        exclude_end,
    })
}

fn pattern_arg(args: &[Value]) -> Option<String> {
    match args.first() {
        Some(Value::String(s)) => Some(s.clone()),
        // Regex objects arrive as {"source": "..."}.
        Some(Value::Object(obj)) => obj
            .get("source")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn arg_number(args: &[Value], index: usize) -> Option<Number> {
    args.get(index).and_then(Value::as_number).cloned()
}

fn arg_u64(args: &[Value], index: usize) -> Option<u64> {
    args.get(index).and_then(Value::as_u64)
}

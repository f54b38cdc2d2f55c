//! Contract Schema
//!
//! Derives OpenAPI-style schema graphs from validation contracts and type
//! metadata.
//!
//! Type definitions (entities, validation contracts, unions, aliases) are
//! resolved into a graph of named [`SchemaNode`]s. Contract fields carry
//! boolean rule trees ([`PredicateNode`]) that a pure walker interprets into
//! structural constraints (bounds, enums, patterns, nullability); the
//! graph builder handles recursion, inheritance and union composition with
//! an explicit cycle guard and build cache.
//!
//! # Example
//!
//! ```
//! use contract_schema::{load_definitions_str, BuildContext, Builder, HandlerRegistry};
//! use serde_json::json;
//!
//! let document = json!({ "types": [{
//!     "kind": "contract",
//!     "name": "NewUser",
//!     "fields": [{
//!         "name": "email",
//!         "required": true,
//!         "meta": { "type": "string" },
//!         "rule": { "and": [
//!             { "predicate": { "name": "filled?", "args": [] } },
//!             { "predicate": { "name": "email?", "args": [] } }
//!         ]}
//!     }]
//! }]});
//!
//! let defs = load_definitions_str(&document.to_string()).unwrap();
//! let registry = HandlerRegistry::standard();
//! let builder = Builder::new(&defs, &registry);
//! let mut cx = BuildContext::new();
//!
//! let schema = builder.build("NewUser", &mut cx).unwrap().unwrap();
//! assert_eq!(schema.properties["email"].format.as_deref(), Some("email"));
//! assert_eq!(schema.required, vec!["email".to_string()]);
//! ```
//!
//! # Forward compatibility
//!
//! Rule producers evolve independently of this engine: unknown predicate
//! names are preserved under the `x-unhandled-predicates` extension rather
//! than rejected, and unrecognized rule shapes degrade to empty
//! constraints. The one hard error is a union variant no handler can
//! resolve, since dropping an alternative would corrupt the output.

mod builder;
mod constraints;
mod error;
mod loader;
mod predicate;
mod registry;
mod schema;
mod types;

pub use builder::{
    AliasHandler, BuildContext, Builder, ContractHandler, EntityHandler, UnionHandler,
};
pub use constraints::{apply, ConstraintSet};
pub use error::{BuildError, LoadError};
pub use loader::{load_definitions, load_definitions_str};
pub use predicate::{each_child, is_conditional, walk, walk_container, PredicateNode};
pub use registry::{HandlerRegistry, SchemaHandler};
pub use schema::{Parity, SchemaNode, SchemaType, UNHANDLED_PREDICATES_KEY};
pub use types::{
    AliasDef, ArrayRef, ContractDef, ContractField, Definitions, EntityDef, FieldDef, FieldMeta,
    TypeDef, TypeRef, UnionDef,
};

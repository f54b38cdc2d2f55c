//! Integration tests for schema-graph resolution.

use std::sync::Arc;

use contract_schema::{
    load_definitions_str, BuildContext, BuildError, Builder, Definitions, HandlerRegistry,
    SchemaType,
};
use serde_json::json;

fn defs(value: serde_json::Value) -> Definitions {
    load_definitions_str(&value.to_string()).unwrap()
}

// === Cycle Handling ===

mod cycles {
    use super::*;

    #[test]
    fn self_referential_entity_terminates() {
        let defs = defs(json!({ "types": [{
            "kind": "entity",
            "name": "Node",
            "fields": [
                { "name": "value", "type": "string", "required": true },
                { "name": "children", "type": { "items": "Node" } }
            ]
        }]}));

        let registry = HandlerRegistry::standard();
        let builder = Builder::new(&defs, &registry);
        let mut cx = BuildContext::new();

        let node = builder.build("Node", &mut cx).unwrap().unwrap();

        // The nested occurrence is a reference placeholder with the same
        // canonical name as the root.
        let children = &node.properties["children"];
        assert_eq!(children.ty, Some(SchemaType::Array));
        let item = children.items.as_ref().unwrap();
        assert!(item.is_reference());
        assert_eq!(item.canonical_name, node.canonical_name);
    }

    #[test]
    fn mutual_recursion_resolves_both_directions() {
        let defs = defs(json!({ "types": [
            {
                "kind": "entity",
                "name": "Author",
                "fields": [
                    { "name": "name", "type": "string", "required": true },
                    { "name": "books", "type": { "items": "Book" } }
                ]
            },
            {
                "kind": "entity",
                "name": "Book",
                "fields": [
                    { "name": "title", "type": "string", "required": true },
                    { "name": "author", "type": "Author" }
                ]
            }
        ]}));

        let registry = HandlerRegistry::standard();
        let builder = Builder::new(&defs, &registry);
        let mut cx = BuildContext::new();

        let author = builder.build("Author", &mut cx).unwrap().unwrap();
        assert_eq!(author.properties.len(), 2);

        // Book was built as part of Author and is a full schema.
        let book = cx.cached("Book").unwrap();
        assert_eq!(book.ty, Some(SchemaType::Object));
        assert_eq!(book.properties["title"].ty, Some(SchemaType::String));

        // The back-reference inside Book points at Author by name.
        let back = &book.properties["author"];
        assert!(back.is_reference());
        assert_eq!(back.canonical_name.as_deref(), Some("Author"));
    }

    #[test]
    fn deep_synthetic_cycle_terminates() {
        // A 1000-type chain whose tail closes back on the head. The build
        // recurses once per type, so give the thread room.
        let depth = 1000;
        let types: Vec<serde_json::Value> = (0..depth)
            .map(|i| {
                json!({
                    "kind": "entity",
                    "name": format!("T{}", i),
                    "fields": [
                        { "name": "next", "type": format!("T{}", (i + 1) % depth) }
                    ]
                })
            })
            .collect();
        let defs = defs(json!({ "types": types }));

        let handle = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(move || {
                let registry = HandlerRegistry::standard();
                let builder = Builder::new(&defs, &registry);
                let mut cx = BuildContext::new();
                builder.build("T0", &mut cx).unwrap().unwrap();
                cx.schemas().len()
            })
            .unwrap();

        assert_eq!(handle.join().unwrap(), depth);
    }
}

// === Inheritance ===

mod inheritance {
    use super::*;

    fn pet_defs(discriminator: bool) -> Definitions {
        let mut dog = json!({
            "kind": "entity",
            "name": "Dog",
            "parent": "Pet",
            "fields": [
                { "name": "petType", "type": "string", "required": true },
                { "name": "id", "type": "integer" },
                { "name": "bark", "type": "boolean" }
            ]
        });
        if discriminator {
            dog["discriminator"] = json!("petType");
        }
        defs(json!({ "types": [
            {
                "kind": "entity",
                "name": "Pet",
                "fields": [
                    { "name": "id", "type": "integer", "required": true },
                    { "name": "name", "type": "string" }
                ]
            },
            dog
        ]}))
    }

    #[test]
    fn without_discriminator_flattens() {
        let defs = pet_defs(false);
        let registry = HandlerRegistry::standard();
        let builder = Builder::new(&defs, &registry);
        let mut cx = BuildContext::new();

        let dog = builder.build("Dog", &mut cx).unwrap().unwrap();
        assert!(dog.all_of.is_empty());

        let keys: Vec<&str> = dog.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "name", "petType", "bark"]);
        assert!(dog.required.contains(&"id".to_string()));
        assert!(dog.required.contains(&"petType".to_string()));
    }

    #[test]
    fn with_discriminator_composes_all_of() {
        let defs = pet_defs(true);
        let registry = HandlerRegistry::standard();
        let builder = Builder::new(&defs, &registry);
        let mut cx = BuildContext::new();

        let dog = builder.build("Dog", &mut cx).unwrap().unwrap();
        assert_eq!(dog.all_of.len(), 2);
        assert!(dog.properties.is_empty());

        let parent = &dog.all_of[0];
        assert_eq!(parent.canonical_name.as_deref(), Some("Pet"));
        // The parent entry is the full schema, not a placeholder.
        assert_eq!(parent.properties.len(), 2);

        // The child part carries only what Dog adds beyond Pet.
        let child_only = &dog.all_of[1];
        let keys: Vec<&str> = child_only.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["petType", "bark"]);
        for key in parent.properties.keys() {
            assert!(!child_only.properties.contains_key(key));
        }
    }

    #[test]
    fn parent_is_cached_independently() {
        let defs = pet_defs(true);
        let registry = HandlerRegistry::standard();
        let builder = Builder::new(&defs, &registry);
        let mut cx = BuildContext::new();

        builder.build("Dog", &mut cx).unwrap().unwrap();
        let pet = cx.cached("Pet").unwrap();
        assert_eq!(pet.properties.len(), 2);
    }
}

// === Unions ===

mod unions {
    use super::*;

    #[test]
    fn variants_are_fully_resolved() {
        let defs = defs(json!({ "types": [
            {
                "kind": "entity",
                "name": "Card",
                "fields": [{ "name": "pan", "type": "string", "required": true }]
            },
            {
                "kind": "entity",
                "name": "BankTransfer",
                "fields": [{ "name": "iban", "type": "string", "required": true }]
            },
            {
                "kind": "entity",
                "name": "Wallet",
                "fields": [{ "name": "provider", "type": "string", "required": true }]
            },
            {
                "kind": "union",
                "name": "PaymentMethod",
                "variants": ["Card", "BankTransfer", "Wallet"]
            }
        ]}));

        let registry = HandlerRegistry::standard();
        let builder = Builder::new(&defs, &registry);
        let mut cx = BuildContext::new();

        let union = builder.build("PaymentMethod", &mut cx).unwrap().unwrap();
        assert!(union.ty.is_none());
        assert_eq!(union.any_of.len(), 3);
        for variant in &union.any_of {
            // Full properties are readable without a second resolution pass.
            assert!(!variant.is_reference());
            assert!(!variant.properties.is_empty());
        }
    }

    #[test]
    fn unresolved_variant_is_a_hard_error() {
        let defs = defs(json!({ "types": [{
            "kind": "union",
            "name": "PaymentMethod",
            "variants": ["Card"]
        }]}));

        let registry = HandlerRegistry::standard();
        let builder = Builder::new(&defs, &registry);
        let mut cx = BuildContext::new();

        let result = builder.build("PaymentMethod", &mut cx);
        assert!(matches!(
            result,
            Err(BuildError::UnresolvedVariant { union, variant })
                if union == "PaymentMethod" && variant == "Card"
        ));
    }

    #[test]
    fn scalar_variants_allowed() {
        let defs = defs(json!({ "types": [{
            "kind": "union",
            "name": "Id",
            "variants": ["string", "integer"]
        }]}));

        let registry = HandlerRegistry::standard();
        let builder = Builder::new(&defs, &registry);
        let mut cx = BuildContext::new();

        let union = builder.build("Id", &mut cx).unwrap().unwrap();
        assert_eq!(union.any_of.len(), 2);
        assert_eq!(union.any_of[0].ty, Some(SchemaType::String));
        assert_eq!(union.any_of[1].ty, Some(SchemaType::Integer));
    }
}

// === Caching ===

mod caching {
    use super::*;

    #[test]
    fn same_identity_returns_identical_node() {
        let defs = defs(json!({ "types": [{
            "kind": "entity",
            "name": "Pet",
            "fields": [{ "name": "id", "type": "integer", "required": true }]
        }]}));

        let registry = HandlerRegistry::standard();
        let builder = Builder::new(&defs, &registry);
        let mut cx = BuildContext::new();

        let first = builder.build("Pet", &mut cx).unwrap().unwrap();
        let second = builder.build("Pet", &mut cx).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn independent_contexts_do_not_share() {
        let defs = defs(json!({ "types": [{
            "kind": "entity",
            "name": "Pet",
            "fields": [{ "name": "id", "type": "integer" }]
        }]}));

        let registry = HandlerRegistry::standard();
        let builder = Builder::new(&defs, &registry);

        let mut a = BuildContext::new();
        let mut b = BuildContext::new();
        let first = builder.build("Pet", &mut a).unwrap().unwrap();
        let second = builder.build("Pet", &mut b).unwrap().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn shared_nested_type_built_once() {
        let defs = defs(json!({ "types": [
            { "kind": "alias", "name": "Uuid", "type": "string", "format": "uuid" },
            {
                "kind": "entity",
                "name": "Order",
                "fields": [
                    { "name": "id", "type": "Uuid", "required": true },
                    { "name": "parentId", "type": "Uuid" }
                ]
            }
        ]}));

        let registry = HandlerRegistry::standard();
        let builder = Builder::new(&defs, &registry);
        let mut cx = BuildContext::new();

        let order = builder.build("Order", &mut cx).unwrap().unwrap();
        let id = &order.properties["id"];
        let parent_id = &order.properties["parentId"];
        assert!(Arc::ptr_eq(id, parent_id));
    }
}

//! Schema-graph construction - recursive, cycle-safe resolution of type
//! definitions into named schema nodes.
//!
//! The builder owns the orchestration: memoization, the visitation stack
//! that guards against cycles, and inheritance/union composition. Per-kind
//! construction is delegated to handlers from the [`HandlerRegistry`], which
//! recurse back into the builder for nested subjects. Build state lives in
//! an explicit [`BuildContext`] threaded through every call - never in
//! globals - so independent builds can run concurrently on separate
//! contexts.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::constraints::{apply, ConstraintSet};
use crate::error::BuildError;
use crate::predicate::{each_child, is_conditional, walk, walk_container};
use crate::registry::{HandlerRegistry, SchemaHandler};
use crate::schema::{SchemaNode, SchemaType};
use crate::types::{
    ContractDef, ContractField, Definitions, EntityDef, FieldDef, FieldMeta, TypeDef, TypeRef,
    UnionDef,
};

/// Per-build state: the visitation stack (cycle guard) and the cache of
/// completed schemas keyed by canonical name.
///
/// Together they guarantee at most one build per identity and termination
/// on self- or mutually-referential graphs.
#[derive(Debug, Default)]
pub struct BuildContext {
    stack: Vec<String>,
    cache: IndexMap<String, Arc<SchemaNode>>,
}

impl BuildContext {
    pub fn new() -> Self {
        BuildContext::default()
    }

    /// Whether the identity is currently being built.
    pub fn in_progress(&self, id: &str) -> bool {
        self.stack.iter().any(|s| s == id)
    }

    /// The completed schema for an identity, if already built.
    pub fn cached(&self, id: &str) -> Option<Arc<SchemaNode>> {
        self.cache.get(id).cloned()
    }

    /// All completed schemas in build order. This is the named-schema graph
    /// exporters serialize; reference placeholders resolve against it.
    pub fn schemas(&self) -> &IndexMap<String, Arc<SchemaNode>> {
        &self.cache
    }
}

/// Resolves type definitions into a schema-node graph.
pub struct Builder<'a> {
    defs: &'a Definitions,
    registry: &'a HandlerRegistry,
}

impl<'a> Builder<'a> {
    pub fn new(defs: &'a Definitions, registry: &'a HandlerRegistry) -> Self {
        Builder { defs, registry }
    }

    /// Build the schema for a named definition.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownRoot` when no definition has that name,
    /// or `BuildError::UnresolvedVariant` from union resolution.
    pub fn build(
        &self,
        name: &str,
        cx: &mut BuildContext,
    ) -> Result<Option<Arc<SchemaNode>>, BuildError> {
        let Some(def) = self.defs.get(name) else {
            return Err(BuildError::UnknownRoot {
                name: name.to_string(),
            });
        };
        self.build_def(def, cx)
    }

    /// Build every named definition against one shared context.
    pub fn build_all(&self, cx: &mut BuildContext) -> Result<(), BuildError> {
        for name in self.defs.names() {
            self.build(name, cx)?;
        }
        Ok(())
    }

    /// Resolve a subject through the registry, with memoization and the
    /// cycle guard.
    ///
    /// A cached identity comes back as the identical node. An identity
    /// already on the stack comes back as a reference placeholder carrying
    /// only the canonical name; consumers re-fetch the full node from the
    /// cache once the owning build completes. `Ok(None)` means no handler
    /// accepted the subject.
    pub fn build_def(
        &self,
        def: &TypeDef,
        cx: &mut BuildContext,
    ) -> Result<Option<Arc<SchemaNode>>, BuildError> {
        let id = def.name();
        if let Some(node) = cx.cached(id) {
            return Ok(Some(node));
        }
        if cx.in_progress(id) {
            return Ok(Some(Arc::new(SchemaNode::reference(id))));
        }
        let Some(handler) = self.registry.find(def) else {
            return Ok(None);
        };
        let handler = Arc::clone(handler);

        cx.stack.push(id.to_string());
        let built = handler.build(def, self, cx);
        cx.stack.pop();

        Ok(built?.map(|node| {
            let node = Arc::new(node.named(id));
            cx.cache.insert(id.to_string(), Arc::clone(&node));
            node
        }))
    }

    /// Resolve a type reference: scalars and arrays build inline, named
    /// references go through [`build_def`](Self::build_def). A name with no
    /// definition becomes an opaque reference rather than being dropped.
    pub fn build_ref(
        &self,
        r: &TypeRef,
        cx: &mut BuildContext,
    ) -> Result<Option<Arc<SchemaNode>>, BuildError> {
        match r {
            TypeRef::Scalar(ty) => Ok(Some(Arc::new(SchemaNode::typed(*ty)))),
            TypeRef::Array(array) => {
                let items = self.build_ref(&array.items, cx)?;
                Ok(Some(Arc::new(SchemaNode::array(items))))
            }
            TypeRef::Named(name) => match self.defs.get(name) {
                Some(def) => self.build_def(def, cx),
                None => Ok(Some(Arc::new(SchemaNode::reference(name)))),
            },
        }
    }

    // --- Entity resolution ---

    fn build_entity(
        &self,
        entity: &EntityDef,
        cx: &mut BuildContext,
    ) -> Result<SchemaNode, BuildError> {
        let parent = match &entity.parent {
            Some(parent_name) => self.build_ref(&TypeRef::Named(parent_name.clone()), cx)?,
            None => None,
        };

        let node = match parent {
            // Distinguishable child: compose as "all of parent, then the
            // fields the child adds".
            Some(parent_node) if entity.discriminator.is_some() => {
                let inherited = property_names(&parent_node);
                let mut child_only = SchemaNode::object();
                self.add_entity_fields(&mut child_only, entity, &inherited, cx)?;
                let mut composed =
                    SchemaNode::all_of(vec![parent_node, Arc::new(child_only)]);
                composed.description = entity.description.clone();
                composed
            }
            // No discriminator: inheritance means "same shape", so parent
            // properties flatten into one plain schema.
            Some(parent_node) => {
                let mut node = SchemaNode::object();
                node.description = entity.description.clone();
                flatten_properties(&parent_node, &mut node);
                self.add_entity_fields(&mut node, entity, &HashSet::new(), cx)?;
                node
            }
            None => {
                let mut node = SchemaNode::object();
                node.description = entity.description.clone();
                self.add_entity_fields(&mut node, entity, &HashSet::new(), cx)?;
                node
            }
        };

        Ok(node)
    }

    fn add_entity_fields(
        &self,
        node: &mut SchemaNode,
        entity: &EntityDef,
        skip: &HashSet<String>,
        cx: &mut BuildContext,
    ) -> Result<(), BuildError> {
        for field in &entity.fields {
            if skip.contains(&field.name) {
                continue;
            }
            let prop = self.build_field(field, cx)?;
            node.properties.insert(field.name.clone(), prop);
            if field.required && !node.required.contains(&field.name) {
                node.required.push(field.name.clone());
            }
        }
        Ok(())
    }

    fn build_field(
        &self,
        field: &FieldDef,
        cx: &mut BuildContext,
    ) -> Result<Arc<SchemaNode>, BuildError> {
        let base = self
            .build_ref(&field.ty, cx)?
            .unwrap_or_else(|| Arc::new(SchemaNode::default()));
        if field.meta.is_default() {
            return Ok(base);
        }
        // Field-level metadata must not leak into the shared cached node.
        let mut decorated = (*base).clone();
        apply(&mut decorated, &ConstraintSet::default(), &field.meta);
        Ok(Arc::new(decorated))
    }

    // --- Contract resolution ---

    fn build_contract(&self, contract: &ContractDef) -> SchemaNode {
        let mut node = SchemaNode::object();
        node.description = contract.description.clone();
        for field in &contract.fields {
            let (prop, required) = self.build_contract_field(field);
            node.properties.insert(field.name.clone(), prop);
            if required {
                node.required.push(field.name.clone());
            }
        }
        node
    }

    fn build_contract_field(&self, field: &ContractField) -> (Arc<SchemaNode>, bool) {
        let mut schema = SchemaNode::default();

        // Member rules under `each` apply to collection members, never to
        // the container. Array-ness can come from the declared metadata or
        // from the rule itself, so the presence of a member rule alone
        // forces the container walk.
        let member_rule = field.rule.as_ref().and_then(each_child);
        let targets_array =
            field.meta.ty == Some(SchemaType::Array) || member_rule.is_some();

        let (constraints, conditional) = match &field.rule {
            Some(rule) => {
                let set = if targets_array {
                    walk_container(rule)
                } else {
                    walk(rule)
                };
                (set, is_conditional(rule))
            }
            None => (ConstraintSet::default(), false),
        };

        // Typed before `apply` so container size bounds route to item
        // counts rather than being dropped on an untyped node.
        if member_rule.is_some() && field.meta.ty.is_none() {
            schema.ty = Some(SchemaType::Array);
        }

        apply(&mut schema, &constraints, &field.meta);

        if let Some(member_rule) = member_rule {
            let member_set = walk(member_rule);
            let mut item = SchemaNode::default();
            apply(&mut item, &member_set, &FieldMeta::default());
            schema.items = Some(Arc::new(item));
        }

        // A top-level implication makes presence conditional regardless of
        // the declared flag; otherwise an explicit key predicate wins over
        // the declaration.
        let required = if conditional {
            false
        } else {
            constraints.required.unwrap_or(field.required)
        };

        (Arc::new(schema), required)
    }

    // --- Union resolution ---

    fn build_union(
        &self,
        union: &UnionDef,
        cx: &mut BuildContext,
    ) -> Result<SchemaNode, BuildError> {
        let mut variants = Vec::with_capacity(union.variants.len());
        for variant in &union.variants {
            let resolved = match variant {
                // Unlike field references, a union variant that cannot be
                // resolved is a hard error: silently dropping an
                // alternative would corrupt the description.
                TypeRef::Named(name) => match self.defs.get(name) {
                    Some(def) => self.build_def(def, cx)?,
                    None => None,
                },
                other => self.build_ref(other, cx)?,
            };
            match resolved {
                Some(node) => variants.push(node),
                None => {
                    return Err(BuildError::UnresolvedVariant {
                        union: union.name.clone(),
                        variant: variant.display_name(),
                    })
                }
            }
        }
        let mut node = SchemaNode::any_of(variants);
        node.description = union.description.clone();
        Ok(node)
    }
}

/// Property names reachable on a node, looking through `allOf` members.
fn property_names(node: &SchemaNode) -> HashSet<String> {
    let mut names: HashSet<String> = node.properties.keys().cloned().collect();
    for part in &node.all_of {
        names.extend(property_names(part));
    }
    names
}

/// Copy a parent's properties and required names into `target`, looking
/// through `allOf` members. Nodes are shared, not cloned.
fn flatten_properties(source: &SchemaNode, target: &mut SchemaNode) {
    for part in &source.all_of {
        flatten_properties(part, target);
    }
    for (name, prop) in &source.properties {
        target.properties.insert(name.clone(), Arc::clone(prop));
    }
    for name in &source.required {
        if !target.required.contains(name) {
            target.required.push(name.clone());
        }
    }
}

// --- Built-in handlers ---

/// Builds entity definitions, including inheritance composition.
pub struct EntityHandler;

impl SchemaHandler for EntityHandler {
    fn name(&self) -> &'static str {
        "entity"
    }

    fn handles(&self, subject: &TypeDef) -> bool {
        matches!(subject, TypeDef::Entity(_))
    }

    fn build(
        &self,
        subject: &TypeDef,
        builder: &Builder<'_>,
        cx: &mut BuildContext,
    ) -> Result<Option<SchemaNode>, BuildError> {
        let TypeDef::Entity(entity) = subject else {
            return Ok(None);
        };
        builder.build_entity(entity, cx).map(Some)
    }
}

/// Builds validation contracts by walking each field's rule tree.
pub struct ContractHandler;

impl SchemaHandler for ContractHandler {
    fn name(&self) -> &'static str {
        "contract"
    }

    fn handles(&self, subject: &TypeDef) -> bool {
        matches!(subject, TypeDef::Contract(_))
    }

    fn build(
        &self,
        subject: &TypeDef,
        builder: &Builder<'_>,
        _cx: &mut BuildContext,
    ) -> Result<Option<SchemaNode>, BuildError> {
        let TypeDef::Contract(contract) = subject else {
            return Ok(None);
        };
        Ok(Some(builder.build_contract(contract)))
    }
}

/// Builds union definitions as fully-resolved `anyOf` compositions.
pub struct UnionHandler;

impl SchemaHandler for UnionHandler {
    fn name(&self) -> &'static str {
        "union"
    }

    fn handles(&self, subject: &TypeDef) -> bool {
        matches!(subject, TypeDef::Union(_))
    }

    fn build(
        &self,
        subject: &TypeDef,
        builder: &Builder<'_>,
        cx: &mut BuildContext,
    ) -> Result<Option<SchemaNode>, BuildError> {
        let TypeDef::Union(union) = subject else {
            return Ok(None);
        };
        builder.build_union(union, cx).map(Some)
    }
}

/// Builds named scalar aliases.
pub struct AliasHandler;

impl SchemaHandler for AliasHandler {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn handles(&self, subject: &TypeDef) -> bool {
        matches!(subject, TypeDef::Alias(_))
    }

    fn build(
        &self,
        subject: &TypeDef,
        _builder: &Builder<'_>,
        _cx: &mut BuildContext,
    ) -> Result<Option<SchemaNode>, BuildError> {
        let TypeDef::Alias(alias) = subject else {
            return Ok(None);
        };
        let mut node = SchemaNode::typed(alias.ty);
        node.description = alias.description.clone();
        node.format = alias.format.clone();
        Ok(Some(node))
    }
}

impl HandlerRegistry {
    /// Registry with the built-in handlers in priority order.
    pub fn standard() -> Self {
        let mut registry = HandlerRegistry::empty();
        registry.register(Arc::new(EntityHandler));
        registry.register(Arc::new(ContractHandler));
        registry.register(Arc::new(UnionHandler));
        registry.register(Arc::new(AliasHandler));
        registry
    }
}

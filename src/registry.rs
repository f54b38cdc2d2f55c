//! Handler registry - ordered, pluggable type-to-schema resolvers.
//!
//! The builder consults handlers in registration order and uses the first
//! whose `handles` accepts the subject. Callers extend the pipeline by
//! inserting their own handlers before or after a named built-in.

use std::fmt;
use std::sync::Arc;

use crate::builder::{BuildContext, Builder};
use crate::error::BuildError;
use crate::schema::SchemaNode;
use crate::types::TypeDef;

/// A pluggable resolver for some subject kinds.
pub trait SchemaHandler: Send + Sync {
    /// Stable name used as an insertion anchor and for unregistration.
    fn name(&self) -> &'static str;

    /// Whether this handler can build a schema for the subject.
    fn handles(&self, subject: &TypeDef) -> bool;

    /// Build a schema for the subject. Handlers recurse through the builder
    /// for nested subjects, sharing the caller's context. `Ok(None)` means
    /// the subject yields no schema.
    fn build(
        &self,
        subject: &TypeDef,
        builder: &Builder<'_>,
        cx: &mut BuildContext,
    ) -> Result<Option<SchemaNode>, BuildError>;
}

/// Ordered collection of handlers.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn SchemaHandler>>,
}

impl HandlerRegistry {
    /// A registry with no handlers.
    pub fn empty() -> Self {
        HandlerRegistry::default()
    }

    /// Append a handler. Registering a handler whose name is already
    /// present is a no-op.
    pub fn register(&mut self, handler: Arc<dyn SchemaHandler>) {
        if self.position(handler.name()).is_none() {
            self.handlers.push(handler);
        }
    }

    /// Insert a handler immediately before the named anchor, or append if
    /// the anchor is not registered. A missing anchor never fails the
    /// registration.
    pub fn register_before(&mut self, handler: Arc<dyn SchemaHandler>, anchor: &str) {
        if self.position(handler.name()).is_some() {
            return;
        }
        match self.position(anchor) {
            Some(idx) => self.handlers.insert(idx, handler),
            None => self.handlers.push(handler),
        }
    }

    /// Insert a handler immediately after the named anchor, or append if
    /// the anchor is not registered.
    pub fn register_after(&mut self, handler: Arc<dyn SchemaHandler>, anchor: &str) {
        if self.position(handler.name()).is_some() {
            return;
        }
        match self.position(anchor) {
            Some(idx) => self.handlers.insert(idx + 1, handler),
            None => self.handlers.push(handler),
        }
    }

    /// Remove the named handler. Returns whether it was present.
    pub fn unregister(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(idx) => {
                self.handlers.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Remove all handlers.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SchemaHandler>> {
        self.handlers.iter()
    }

    /// The first handler in order that accepts the subject.
    pub fn find(&self, subject: &TypeDef) -> Option<&Arc<dyn SchemaHandler>> {
        self.handlers.iter().find(|h| h.handles(subject))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.handlers.iter().position(|h| h.name() == name)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

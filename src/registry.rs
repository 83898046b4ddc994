//! Type registry: the id-keyed table of named schema nodes.
//!
//! The registry is an explicit object owned by a [`crate::builder::SchemaBuilder`]
//! and passed by reference into the compiler and the application-definition
//! builder. It is never an ambient singleton, so independent definitions
//! (and tests) coexist without interference.
//!
//! Entries go through two phases: [`RegistryEntry::Pending`] while a
//! recursive body is still being resolved, then [`RegistryEntry::Resolved`].
//! Lookups of an in-flight id return the pending stub rather than
//! re-entering resolution.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::SchemaBuildError;
use crate::schema::SchemaNode;

/// One registry slot.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEntry {
    /// Declared but not yet resolved; exists so self-references made during
    /// resolution land on a real slot.
    Pending,
    /// Fully resolved schema body.
    Resolved(SchemaNode),
}

/// Id-keyed table of named schema nodes within one application definition.
///
/// Insertion order is preserved; it is the declaration order downstream
/// consumers observe.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    entries: IndexMap<String, RegistryEntry>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a pending slot for `id` ahead of resolving its body.
    ///
    /// Fails if `id` is already mid-resolution. A resolved entry is left in
    /// place; the subsequent [`register`](Self::register) performs the
    /// dedup-or-collide check against it.
    pub fn declare(&mut self, id: &str) -> Result<(), SchemaBuildError> {
        match self.entries.get(id) {
            Some(RegistryEntry::Pending) => Err(SchemaBuildError::AlreadyResolving {
                id: id.to_string(),
            }),
            Some(RegistryEntry::Resolved(_)) => Ok(()),
            None => {
                trace!(id, "declaring pending registry slot");
                self.entries.insert(id.to_string(), RegistryEntry::Pending);
                Ok(())
            }
        }
    }

    /// Store the resolved body for `id`.
    ///
    /// A pending slot is filled in place. Registering a structurally
    /// identical body twice is a no-op; a structurally different body under
    /// the same id is an [`SchemaBuildError::IdCollision`].
    pub fn register(&mut self, id: &str, node: SchemaNode) -> Result<(), SchemaBuildError> {
        match self.entries.get(id) {
            Some(RegistryEntry::Resolved(existing)) => {
                if existing.structurally_equal(&node) {
                    debug!(id, "identical redefinition deduplicated");
                    Ok(())
                } else {
                    Err(SchemaBuildError::IdCollision { id: id.to_string() })
                }
            }
            Some(RegistryEntry::Pending) | None => {
                trace!(id, "registering schema");
                self.entries
                    .insert(id.to_string(), RegistryEntry::Resolved(node));
                Ok(())
            }
        }
    }

    /// Look up an entry, pending or resolved.
    pub fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.get(id)
    }

    /// Look up a resolved body. Pending stubs yield `None`.
    pub fn resolved(&self, id: &str) -> Option<&SchemaNode> {
        match self.entries.get(id) {
            Some(RegistryEntry::Resolved(node)) => Some(node),
            _ => None,
        }
    }

    /// Whether any entry exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Iterate resolved entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.entries.iter().filter_map(|(id, entry)| match entry {
            RegistryEntry::Resolved(node) => Some((id.as_str(), node)),
            RegistryEntry::Pending => None,
        })
    }

    /// Number of entries, pending slots included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entry has been declared or registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = TypeRegistry::new();
        registry.register("User", object([("id", string())])).unwrap();
        assert!(registry.contains("User"));
        assert!(registry.resolved("User").is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_identical_redefinition_is_noop() {
        let mut registry = TypeRegistry::new();
        registry.register("User", object([("id", string())])).unwrap();
        registry.register("User", object([("id", string())])).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_structural_collision_fails() {
        let mut registry = TypeRegistry::new();
        registry.register("User", object([("id", string())])).unwrap();
        let err = registry
            .register("User", object([("id", int64())]))
            .unwrap_err();
        assert_eq!(err, SchemaBuildError::IdCollision { id: "User".into() });
    }

    #[test]
    fn test_pending_slot_visible_but_unresolved() {
        let mut registry = TypeRegistry::new();
        registry.declare("Node").unwrap();
        assert!(registry.contains("Node"));
        assert!(registry.resolved("Node").is_none());
        assert!(matches!(registry.get("Node"), Some(RegistryEntry::Pending)));

        // Filling the slot resolves it.
        registry
            .register("Node", object([("value", string())]))
            .unwrap();
        assert!(registry.resolved("Node").is_some());
    }

    #[test]
    fn test_redeclaring_in_flight_id_fails() {
        let mut registry = TypeRegistry::new();
        registry.declare("Node").unwrap();
        let err = registry.declare("Node").unwrap_err();
        assert_eq!(err, SchemaBuildError::AlreadyResolving { id: "Node".into() });
    }

    #[test]
    fn test_iteration_preserves_registration_order() {
        let mut registry = TypeRegistry::new();
        registry.register("B", string()).unwrap();
        registry.register("A", boolean()).unwrap();
        let ids: Vec<_> = registry.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["B", "A"]);
    }
}

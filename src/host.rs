//! Read-only contract between the inspection core and the host ECS world.
//!
//! The core never mutates the world: every method here is a read, and the
//! per-frame refresh treats any failure as transient (the affected node
//! keeps its previous cached value).

use serde_json::Value;

use crate::error::Result;
use crate::schema::TypeHandle;

/// Opaque identifier for a simulation object. Valid only while the entity
/// exists in the live world, or while a snapshot of it is held.
pub type EntityId = u64;

/// The null entity. References carrying this id render as unallocated and
/// are never followed during snapshot capture.
pub const NULL_ENTITY: EntityId = 0;

/// Dynamic component state as handed over by the host.
pub type ComponentValue = Value;

/// Live ECS world access, as narrow as the core needs it.
///
/// `component_types` must return a sequence that is stable across calls
/// within one frame for the same entity; the core compares it order-
/// sensitively to decide between incremental refresh and full rebuild.
pub trait LiveDataSource {
    /// Whether the entity currently exists.
    fn exists(&self, entity: EntityId) -> bool;

    /// Ordered component type handles attached to the entity. Empty for
    /// nonexistent entities.
    fn component_types(&self, entity: EntityId) -> Vec<TypeHandle>;

    /// Current value of an ordinary component.
    fn component_value(&self, entity: EntityId, component: &TypeHandle) -> Result<ComponentValue>;

    /// Current element list of a buffer-like component.
    fn buffer_values(&self, entity: EntityId, component: &TypeHandle)
        -> Result<Vec<ComponentValue>>;

    /// Whether the entity currently carries the given component.
    fn has_component(&self, entity: EntityId, component: &TypeHandle) -> bool {
        self.component_types(entity).iter().any(|t| t == component)
    }

    /// All currently live entity ids, for query evaluation. Order is not
    /// significant.
    fn entity_ids(&self) -> Vec<EntityId>;

    /// Resolved display name for an entity, if the host can provide one.
    /// Name resolution may be expensive; callers memoize the result.
    fn display_name(&self, entity: EntityId) -> Option<String> {
        let _ = entity;
        None
    }
}

/// Pull an entity id out of a dynamic value.
///
/// Hosts serialize entity references either as a bare number or as an
/// object carrying the id under a well-known key.
pub fn extract_entity_id(value: &Value) -> Option<EntityId> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::Object(obj) => {
            for key in ["entity", "id", "index", "target"] {
                if let Some(Value::Number(n)) = obj.get(key) {
                    if let Some(id) = n.as_u64() {
                        return Some(id);
                    }
                }
            }
            None
        }
        _ => None,
    }
}

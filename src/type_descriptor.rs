//! Cached field discovery over a reflection provider.
//!
//! Results are computed once per type handle and never recomputed. Types on
//! the deny-list (and the deny-listed categories: fixed strings, opaque
//! handles, archetype tokens) are reported as zero-field regardless of their
//! registered shape, which stops recursion into host-internal
//! representations. A provider failure is also degraded to zero fields: an
//! unreadable type renders as a tag rather than poisoning the tree.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::schema::{FieldShape, ReflectionProvider, TypeCategory, TypeHandle};

/// One inspectable field of a type. Immutable once computed; owned by the
/// descriptor cache and shared out by reference count.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_handle: TypeHandle,
    pub is_entity_ref: bool,
    pub shape: FieldShape,
}

impl FieldDescriptor {
    pub fn is_collection(&self) -> bool {
        self.shape.is_collection()
    }
}

/// Lazy, process-lifetime cache of per-type field lists.
pub struct TypeDescriptor {
    provider: Box<dyn ReflectionProvider>,
    cache: HashMap<TypeHandle, Arc<[FieldDescriptor]>>,
    denied: HashSet<TypeHandle>,
}

impl TypeDescriptor {
    pub fn new(provider: Box<dyn ReflectionProvider>) -> Self {
        Self {
            provider,
            cache: HashMap::new(),
            denied: HashSet::new(),
        }
    }

    /// Extend the deny-list with explicitly named host types.
    pub fn deny_all<I, S>(&mut self, handles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<TypeHandle>,
    {
        self.denied.extend(handles.into_iter().map(Into::into));
    }

    /// Ordered inspectable fields of a type. Stable across calls for the
    /// same handle; static fields are filtered out.
    pub fn fields_of(&mut self, handle: &TypeHandle) -> Arc<[FieldDescriptor]> {
        if let Some(cached) = self.cache.get(handle) {
            return Arc::clone(cached);
        }

        let fields = self.discover(handle);
        debug!(%handle, count = fields.len(), "cached field list");
        let fields: Arc<[FieldDescriptor]> = fields.into();
        self.cache.insert(handle.clone(), Arc::clone(&fields));
        fields
    }

    /// True iff the type has no inspectable fields.
    pub fn is_tag(&mut self, handle: &TypeHandle) -> bool {
        self.fields_of(handle).is_empty()
    }

    /// Category of a type; unknown types are treated as opaque handles so
    /// the fallback stringification applies.
    pub fn category(&self, handle: &TypeHandle) -> TypeCategory {
        self.provider
            .category(handle)
            .unwrap_or(TypeCategory::OpaqueHandle)
    }

    /// Whether a component type is buffer-like.
    pub fn is_buffer(&self, handle: &TypeHandle) -> bool {
        self.provider.is_buffer(handle)
    }

    /// Whether field discovery is suppressed for this type.
    pub fn is_denied(&self, handle: &TypeHandle) -> bool {
        self.denied.contains(handle) || self.category(handle).is_denied()
    }

    fn discover(&self, handle: &TypeHandle) -> Vec<FieldDescriptor> {
        if self.is_denied(handle) {
            return Vec::new();
        }

        let raw = match self.provider.raw_fields(handle) {
            Ok(raw) => raw,
            Err(e) => {
                // An unreadable type is treated as tag-like, not fatal.
                warn!(%handle, error = %e, "field discovery failed, treating type as zero-field");
                return Vec::new();
            }
        };

        raw.into_iter()
            .filter(|field| !field.is_static)
            .map(|field| FieldDescriptor {
                is_entity_ref: matches!(field.shape, FieldShape::EntityRef),
                name: field.name,
                type_handle: field.declared_type,
                shape: field.shape,
            })
            .collect()
    }

    pub fn cached_type_count(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawFieldInfo, SchemaRegistry, TypeCategory, TypeSchema};

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry.register_struct(
            "Health",
            vec![
                RawFieldInfo::new("current", "f32", FieldShape::Scalar),
                RawFieldInfo::new("max", "f32", FieldShape::Scalar),
                RawFieldInfo {
                    name: "shared_lookup".to_string(),
                    declared_type: "HealthTable".to_string(),
                    is_static: true,
                    shape: FieldShape::Scalar,
                },
            ],
        );
        registry.register_tag("Dead");
        registry.register(TypeSchema {
            handle: "FixedString64".to_string(),
            category: TypeCategory::FixedString {
                capacity_name: "FixedString64".to_string(),
            },
            fields: vec![RawFieldInfo::new("bytes", "u8", FieldShape::Scalar)],
            buffer_component: false,
        });
        registry
    }

    #[test]
    fn statics_are_filtered_and_results_cached() {
        let mut descriptor = TypeDescriptor::new(Box::new(registry()));
        let handle = "Health".to_string();

        let first = descriptor.fields_of(&handle);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].name, "current");

        // Second call serves the same allocation.
        let second = descriptor.fields_of(&handle);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(descriptor.cached_type_count(), 1);
    }

    #[test]
    fn tag_detection_and_unknown_type_degradation() {
        let mut descriptor = TypeDescriptor::new(Box::new(registry()));
        assert!(descriptor.is_tag(&"Dead".to_string()));
        assert!(!descriptor.is_tag(&"Health".to_string()));
        // Unregistered type: reflection fails, reported as zero-field.
        assert!(descriptor.is_tag(&"NeverRegistered".to_string()));
    }

    #[test]
    fn denied_categories_report_zero_fields() {
        let mut descriptor = TypeDescriptor::new(Box::new(registry()));
        // FixedString64 registers a field, but its category is deny-listed.
        assert!(descriptor.fields_of(&"FixedString64".to_string()).is_empty());
    }

    #[test]
    fn explicit_deny_list_overrides_registered_shape() {
        let mut descriptor = TypeDescriptor::new(Box::new(registry()));
        descriptor.deny_all(["Health"]);
        assert!(descriptor.fields_of(&"Health".to_string()).is_empty());
    }
}

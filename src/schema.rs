//! Explicit schema registry standing in for host reflection.
//!
//! Instead of discovering type shapes reflectively at runtime, the embedder
//! registers a [`TypeSchema`] per inspectable host type: an ordered field
//! list with declared shapes, plus a category that drives display and
//! deny-listing. Entries can be hand-written or generated from the host's
//! type metadata at build time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Stable identifier for a structural type (component kind or nested value
/// type). Used as a cache key for the process lifetime.
pub type TypeHandle = String;

/// Well-known handle for the host's entity-reference type.
pub const ENTITY_TYPE: &str = "Entity";

/// Declared shape of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldShape {
    /// Plain value: number, bool, string, or a nested structure.
    Scalar,
    /// Reference to another entity.
    EntityRef,
    /// Inline array with a fixed element count.
    FixedArray { element: TypeHandle, len: usize },
    /// ECS-buffer-like list of component-shaped items. Child nodes are not
    /// materialized until the node is first expanded.
    ComponentList { element: TypeHandle },
    /// Growable list of arbitrary elements.
    DynamicList { element: TypeHandle },
}

impl FieldShape {
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            FieldShape::FixedArray { .. }
                | FieldShape::ComponentList { .. }
                | FieldShape::DynamicList { .. }
        )
    }

    /// Element type for collection shapes.
    pub fn element_type(&self) -> Option<&TypeHandle> {
        match self {
            FieldShape::FixedArray { element, .. }
            | FieldShape::ComponentList { element }
            | FieldShape::DynamicList { element } => Some(element),
            _ => None,
        }
    }
}

/// Category of a registered type. The last three are primitive-like host
/// internals that must never be introspected field-by-field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeCategory {
    /// Ordinary nested structure.
    Struct,
    /// Zero-field marker component.
    Tag,
    /// Number, bool, or string.
    Primitive,
    /// Renders itself as a single line (host "formattable" capability).
    Formattable,
    /// Fixed-capacity inline string buffer. Rendered quoted with its
    /// declared capacity name.
    FixedString { capacity_name: String },
    /// Handle to host-managed data. Rendered via its target's string form
    /// or as unallocated.
    OpaqueHandle,
    /// Archetype-like token. Rendered as a summary of its constituent type
    /// names.
    ArchetypeToken,
}

impl TypeCategory {
    /// Whether field discovery must be suppressed for this category.
    pub fn is_denied(&self) -> bool {
        matches!(
            self,
            TypeCategory::FixedString { .. }
                | TypeCategory::OpaqueHandle
                | TypeCategory::ArchetypeToken
        )
    }
}

/// Field information as reported by a reflection provider, before the
/// descriptor layer filters and caches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFieldInfo {
    pub name: String,
    pub declared_type: TypeHandle,
    pub is_static: bool,
    pub shape: FieldShape,
}

impl RawFieldInfo {
    pub fn new(name: &str, declared_type: &str, shape: FieldShape) -> Self {
        Self {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            is_static: false,
            shape,
        }
    }

    pub fn entity_ref(name: &str) -> Self {
        Self::new(name, ENTITY_TYPE, FieldShape::EntityRef)
    }
}

/// Source of type structure. [`SchemaRegistry`] is the in-crate
/// implementation; a host with its own metadata system can provide another.
pub trait ReflectionProvider {
    /// Declared fields of a type, statics included. Fails for unknown
    /// handles; the descriptor layer degrades that to a zero-field type.
    fn raw_fields(&self, handle: &TypeHandle) -> Result<Vec<RawFieldInfo>>;

    /// Category of a type, if known.
    fn category(&self, handle: &TypeHandle) -> Option<TypeCategory>;

    /// Whether a component type is buffer-like (ordered element list).
    fn is_buffer(&self, handle: &TypeHandle) -> bool;
}

/// Registered shape of one host type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSchema {
    pub handle: TypeHandle,
    pub category: TypeCategory,
    pub fields: Vec<RawFieldInfo>,
    /// Buffer-like component types expose an element list instead of a
    /// single value.
    pub buffer_component: bool,
}

/// Table of registered type schemas.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: HashMap<TypeHandle, TypeSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            types: HashMap::new(),
        };
        // The entity-reference type is always known.
        registry.register(TypeSchema {
            handle: ENTITY_TYPE.to_string(),
            category: TypeCategory::OpaqueHandle,
            fields: Vec::new(),
            buffer_component: false,
        });
        registry
    }

    pub fn register(&mut self, schema: TypeSchema) -> &mut Self {
        self.types.insert(schema.handle.clone(), schema);
        self
    }

    /// Register an ordinary struct type.
    pub fn register_struct(&mut self, handle: &str, fields: Vec<RawFieldInfo>) -> &mut Self {
        self.register(TypeSchema {
            handle: handle.to_string(),
            category: TypeCategory::Struct,
            fields,
            buffer_component: false,
        })
    }

    /// Register a zero-field tag component.
    pub fn register_tag(&mut self, handle: &str) -> &mut Self {
        self.register(TypeSchema {
            handle: handle.to_string(),
            category: TypeCategory::Tag,
            fields: Vec::new(),
            buffer_component: false,
        })
    }

    /// Register a primitive leaf type.
    pub fn register_primitive(&mut self, handle: &str) -> &mut Self {
        self.register(TypeSchema {
            handle: handle.to_string(),
            category: TypeCategory::Primitive,
            fields: Vec::new(),
            buffer_component: false,
        })
    }

    /// Register a buffer-like component whose elements have the given
    /// fields.
    pub fn register_buffer(&mut self, handle: &str, fields: Vec<RawFieldInfo>) -> &mut Self {
        self.register(TypeSchema {
            handle: handle.to_string(),
            category: TypeCategory::Struct,
            fields,
            buffer_component: true,
        })
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.types.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl ReflectionProvider for SchemaRegistry {
    fn raw_fields(&self, handle: &TypeHandle) -> Result<Vec<RawFieldInfo>> {
        self.types
            .get(handle)
            .map(|schema| schema.fields.clone())
            .ok_or_else(|| Error::Reflection(format!("unregistered type: {handle}")))
    }

    fn category(&self, handle: &TypeHandle) -> Option<TypeCategory> {
        self.types.get(handle).map(|schema| schema.category.clone())
    }

    fn is_buffer(&self, handle: &TypeHandle) -> bool {
        self.types
            .get(handle)
            .map(|schema| schema.buffer_component)
            .unwrap_or(false)
    }
}

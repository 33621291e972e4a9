//! Shared scripted world for integration tests.
//!
//! `ScriptedWorld` is an in-memory stand-in for the live side: tests spawn
//! entities, attach component values, and mutate them between refresh
//! calls to simulate a running simulation. Component order per entity is
//! insertion order and stays stable across calls, matching the host
//! contract the inspector relies on.

use std::collections::{BTreeMap, HashMap};
use std::sync::Once;

use serde_json::Value;

use ecs_inspector::error::{Error, Result};
use ecs_inspector::host::{EntityId, LiveDataSource};
use ecs_inspector::schema::{
    FieldShape, RawFieldInfo, SchemaRegistry, TypeCategory, TypeHandle, TypeSchema,
};
use ecs_inspector::type_descriptor::TypeDescriptor;

static TRACING: Once = Once::new();

/// Route tracing output through the test harness. Controlled by RUST_LOG.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Default)]
pub struct ScriptedWorld {
    entities: BTreeMap<EntityId, Vec<(TypeHandle, Value)>>,
    names: HashMap<EntityId, String>,
}

#[allow(dead_code)]
impl ScriptedWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: EntityId) -> &mut Self {
        self.entities.entry(entity).or_default();
        self
    }

    /// Attach or replace a component value. Replacement keeps the
    /// component's position in the sequence.
    pub fn set_component(&mut self, entity: EntityId, component: &str, value: Value) -> &mut Self {
        let components = self.entities.entry(entity).or_default();
        match components.iter_mut().find(|(t, _)| t == component) {
            Some((_, existing)) => *existing = value,
            None => components.push((component.to_string(), value)),
        }
        self
    }

    pub fn remove_component(&mut self, entity: EntityId, component: &str) -> &mut Self {
        if let Some(components) = self.entities.get_mut(&entity) {
            components.retain(|(t, _)| t != component);
        }
        self
    }

    pub fn despawn(&mut self, entity: EntityId) -> &mut Self {
        self.entities.remove(&entity);
        self.names.remove(&entity);
        self
    }

    pub fn set_name(&mut self, entity: EntityId, name: &str) -> &mut Self {
        self.names.insert(entity, name.to_string());
        self
    }
}

impl LiveDataSource for ScriptedWorld {
    fn exists(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    fn component_types(&self, entity: EntityId) -> Vec<TypeHandle> {
        self.entities
            .get(&entity)
            .map(|components| components.iter().map(|(t, _)| t.clone()).collect())
            .unwrap_or_default()
    }

    fn component_value(&self, entity: EntityId, component: &TypeHandle) -> Result<Value> {
        self.entities
            .get(&entity)
            .and_then(|components| {
                components
                    .iter()
                    .find(|(t, _)| t == component)
                    .map(|(_, v)| v.clone())
            })
            .ok_or_else(|| Error::Host(format!("entity {entity} has no {component}")))
    }

    fn buffer_values(&self, entity: EntityId, component: &TypeHandle) -> Result<Vec<Value>> {
        match self.component_value(entity, component)? {
            Value::Array(values) => Ok(values),
            other => Ok(vec![other]),
        }
    }

    fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    fn display_name(&self, entity: EntityId) -> Option<String> {
        self.names.get(&entity).cloned()
    }
}

/// Schema vocabulary shared by the integration tests.
pub fn test_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.register_primitive("f32");
    registry.register_primitive("u32");
    registry.register_struct(
        "Position",
        vec![
            RawFieldInfo::new("x", "f32", FieldShape::Scalar),
            RawFieldInfo::new("y", "f32", FieldShape::Scalar),
        ],
    );
    registry.register_struct(
        "Health",
        vec![
            RawFieldInfo::new("current", "f32", FieldShape::Scalar),
            RawFieldInfo::new("max", "f32", FieldShape::Scalar),
        ],
    );
    registry.register_struct("Follow", vec![RawFieldInfo::entity_ref("target")]);
    registry.register_struct(
        "Item",
        vec![
            RawFieldInfo::new("id", "u32", FieldShape::Scalar),
            RawFieldInfo::new("count", "u32", FieldShape::Scalar),
        ],
    );
    registry.register_struct(
        "Inventory",
        vec![RawFieldInfo::new(
            "items",
            "ItemList",
            FieldShape::DynamicList {
                element: "Item".to_string(),
            },
        )],
    );
    registry.register_tag("Frozen");
    registry.register_buffer("Squad", vec![RawFieldInfo::entity_ref("member")]);
    registry.register(TypeSchema {
        handle: "SelfRef".to_string(),
        category: TypeCategory::Struct,
        fields: vec![RawFieldInfo::new("next", "SelfRef", FieldShape::Scalar)],
        buffer_component: false,
    });
    registry.register(TypeSchema {
        handle: "Label".to_string(),
        category: TypeCategory::FixedString {
            capacity_name: "FixedString64".to_string(),
        },
        fields: Vec::new(),
        buffer_component: false,
    });
    registry
}

pub fn test_descriptor() -> TypeDescriptor {
    TypeDescriptor::new(Box::new(test_registry()))
}

/// Deeply nested self-referential value, `levels` objects deep.
#[allow(dead_code)]
pub fn nested_self_ref(levels: usize) -> Value {
    let mut value = Value::Null;
    for _ in 0..levels {
        value = serde_json::json!({ "next": value });
    }
    value
}

/// Inventory component value with `count` sequential items.
#[allow(dead_code)]
pub fn inventory(count: usize) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|index| serde_json::json!({"id": index as u64, "count": 1}))
        .collect();
    serde_json::json!({ "items": items })
}

/*
 * ECS Inspector - Entity graph snapshots
 * Copyright (C) 2025 the ecs-inspector authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Point-in-time capture of entity graphs.
//!
//! A capture walks the transitive closure of every entity reachable from
//! the root through entity-reference fields (one level per component:
//! direct fields of each component value, and direct fields of every
//! buffer element). The walk is iterative with an explicit work stack, so
//! pathological reference graphs cannot exhaust the call stack, and a
//! visited set makes cycles terminate. Captured values are detached: they
//! share nothing with the live world.
//!
//! Capture is a manual, user-triggered operation and can be expensive;
//! nothing in this crate runs it implicitly.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::host::{extract_entity_id, ComponentValue, EntityId, LiveDataSource, NULL_ENTITY};
use crate::schema::TypeHandle;
use crate::type_descriptor::TypeDescriptor;

/// Detached value of one captured component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CapturedComponent {
    /// Zero-field marker component.
    Tag,
    /// Ordinary component value.
    Value(ComponentValue),
    /// Buffer-like component element list.
    Buffer(Vec<ComponentValue>),
}

/// Immutable record of one entity at capture time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshotData {
    pub entity: EntityId,
    /// Component types present at capture time, in host order.
    pub component_types: Vec<TypeHandle>,
    components: HashMap<TypeHandle, CapturedComponent>,
    /// Display name at capture time, if the host provided one.
    pub name: Option<String>,
    /// Capture time, unix milliseconds.
    pub captured_at_ms: i64,
}

impl EntitySnapshotData {
    pub fn component(&self, handle: &TypeHandle) -> Option<&CapturedComponent> {
        self.components.get(handle)
    }

    pub fn has_component(&self, handle: &TypeHandle) -> bool {
        self.components.contains_key(handle)
    }

    pub fn component_count(&self) -> usize {
        self.component_types.len()
    }

    /// Explicit disposal: drops every captured value. The record is
    /// otherwise immutable after capture.
    fn dispose(&mut self) {
        self.components.clear();
        self.component_types.clear();
    }
}

/// Aggregate numbers over the store, for status displays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub entity_count: usize,
    pub component_count: usize,
    pub by_component_type: HashMap<TypeHandle, usize>,
    pub oldest_capture_ms: Option<i64>,
    pub newest_capture_ms: Option<i64>,
}

/// Process-wide table of captured entity records, keyed by entity id.
///
/// Shared by identity across every view that displays a captured entity.
/// Records never expire on their own; only [`SnapshotStore::clear`]
/// removes them. Construct one per embedding and pass it explicitly;
/// there is no global instance.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    records: HashMap<EntityId, EntitySnapshotData>,
    /// Set on any mutation so dependent views know to refresh.
    dirty: bool,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `root` and everything reachable from it. No-op if the root
    /// is null, nonexistent, or already captured. Returns the number of
    /// entities captured by this call.
    pub fn capture(
        &mut self,
        root: EntityId,
        live: &dyn LiveDataSource,
        descriptor: &mut TypeDescriptor,
    ) -> usize {
        if root == NULL_ENTITY || self.records.contains_key(&root) || !live.exists(root) {
            debug!(entity = root, "capture skipped");
            return 0;
        }

        let mut visited: HashSet<EntityId> = HashSet::new();
        let mut stack = vec![root];
        let mut captured = 0;

        while let Some(entity) = stack.pop() {
            if entity == NULL_ENTITY || !visited.insert(entity) {
                continue;
            }
            if self.records.contains_key(&entity) || !live.exists(entity) {
                // Already captured earlier, or a dangling reference;
                // either way there is nothing to record.
                continue;
            }

            let component_types = live.component_types(entity);
            let mut components = HashMap::with_capacity(component_types.len());

            for handle in &component_types {
                let captured_component = if descriptor.is_tag(handle) {
                    CapturedComponent::Tag
                } else if descriptor.is_buffer(handle) {
                    match live.buffer_values(entity, handle) {
                        Ok(values) => {
                            for value in &values {
                                push_referenced_entities(descriptor, handle, value, &mut stack);
                            }
                            CapturedComponent::Buffer(values)
                        }
                        Err(e) => {
                            warn!(entity, component = %handle, error = %e,
                                "buffer capture failed, storing empty list");
                            CapturedComponent::Buffer(Vec::new())
                        }
                    }
                } else {
                    match live.component_value(entity, handle) {
                        Ok(value) => {
                            push_referenced_entities(descriptor, handle, &value, &mut stack);
                            CapturedComponent::Value(value)
                        }
                        Err(e) => {
                            warn!(entity, component = %handle, error = %e,
                                "component capture failed, storing null");
                            CapturedComponent::Value(Value::Null)
                        }
                    }
                };
                components.insert(handle.clone(), captured_component);
            }

            self.records.insert(
                entity,
                EntitySnapshotData {
                    entity,
                    component_types,
                    components,
                    name: live.display_name(entity),
                    captured_at_ms: chrono::Utc::now().timestamp_millis(),
                },
            );
            captured += 1;
        }

        if captured > 0 {
            self.dirty = true;
        }
        info!(root, captured, "snapshot capture complete");
        captured
    }

    pub fn get(&self, entity: EntityId) -> Option<&EntitySnapshotData> {
        self.records.get(&entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.records.contains_key(&entity)
    }

    /// Dispose every record and mark the store dirty.
    pub fn clear(&mut self) {
        for record in self.records.values_mut() {
            record.dispose();
        }
        let dropped = self.records.len();
        self.records.clear();
        self.dirty = true;
        info!(dropped, "snapshot store cleared");
    }

    /// Read and reset the dirty flag. Dependent views call this once per
    /// frame to learn whether captured data changed under them.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.records.keys().copied().collect()
    }

    pub fn statistics(&self) -> SnapshotStats {
        let mut stats = SnapshotStats {
            entity_count: self.records.len(),
            ..Default::default()
        };
        for record in self.records.values() {
            stats.component_count += record.component_count();
            for handle in &record.component_types {
                *stats.by_component_type.entry(handle.clone()).or_insert(0) += 1;
            }
            stats.oldest_capture_ms = Some(match stats.oldest_capture_ms {
                Some(oldest) => oldest.min(record.captured_at_ms),
                None => record.captured_at_ms,
            });
            stats.newest_capture_ms = Some(match stats.newest_capture_ms {
                Some(newest) => newest.max(record.captured_at_ms),
                None => record.captured_at_ms,
            });
        }
        stats
    }
}

/// Queue every entity referenced by the value's entity-reference fields.
/// Scans the component's direct fields only: one level per component.
fn push_referenced_entities(
    descriptor: &mut TypeDescriptor,
    component: &TypeHandle,
    value: &Value,
    stack: &mut Vec<EntityId>,
) {
    let fields = descriptor.fields_of(component);
    for field in fields.iter().filter(|f| f.is_entity_ref) {
        if let Some(field_value) = value.get(&field.name) {
            if let Some(referenced) = extract_entity_id(field_value) {
                if referenced != NULL_ENTITY {
                    stack.push(referenced);
                }
            }
        }
    }
}

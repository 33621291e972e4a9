/*
 * ECS Inspector - Incremental refresh engine
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

//! Per-frame refresh of an inspection tree against a value source.
//!
//! The dominant optimization: a collapsed, already-initialized subtree is
//! skipped before its value is even fetched, so it costs O(1) per frame
//! regardless of size. Snapshot-backed nodes are exempt and always refresh
//! fully. Structural reconciliation of a collection always happens before
//! any of its children's values are refreshed, and a parent's value is
//! written before its children are visited; the walk is single-threaded
//! and depth-first.

use serde_json::Value;
use tracing::{debug, warn};

use crate::builder::GraphBuilder;
use crate::config::InspectorConfig;
use crate::error::{Error, Result};
use crate::format::{display_entity, display_for, display_value};
use crate::host::{extract_entity_id, ComponentValue, EntityId, LiveDataSource, NULL_ENTITY};
use crate::schema::TypeHandle;
use crate::snapshot::{CapturedComponent, SnapshotStore};
use crate::tree::{Access, CollectionFlavor, Node, NodeArena, NodeId, NodeKind, TreeEvent};
use crate::type_descriptor::TypeDescriptor;

/// Uniform read surface over either the live world or a snapshot store, so
/// the refresh walk is identical in both modes.
pub trait ValueSource {
    fn is_snapshot(&self) -> bool;
    fn entity_alive(&self, entity: EntityId) -> bool;
    fn component_value(&self, entity: EntityId, component: &TypeHandle) -> Result<ComponentValue>;
    fn buffer_values(&self, entity: EntityId, component: &TypeHandle)
        -> Result<Vec<ComponentValue>>;
    fn display_name(&self, entity: EntityId) -> Option<String>;
    fn component_types(&self, entity: EntityId) -> Vec<TypeHandle>;
}

/// Reads straight from the live world.
pub struct LiveSource<'a> {
    pub world: &'a dyn LiveDataSource,
}

impl ValueSource for LiveSource<'_> {
    fn is_snapshot(&self) -> bool {
        false
    }

    fn entity_alive(&self, entity: EntityId) -> bool {
        self.world.exists(entity)
    }

    fn component_value(&self, entity: EntityId, component: &TypeHandle) -> Result<ComponentValue> {
        self.world.component_value(entity, component)
    }

    fn buffer_values(
        &self,
        entity: EntityId,
        component: &TypeHandle,
    ) -> Result<Vec<ComponentValue>> {
        self.world.buffer_values(entity, component)
    }

    fn display_name(&self, entity: EntityId) -> Option<String> {
        self.world.display_name(entity)
    }

    fn component_types(&self, entity: EntityId) -> Vec<TypeHandle> {
        self.world.component_types(entity)
    }
}

/// Reads from captured records; the data never changes underneath.
pub struct SnapshotSource<'a> {
    pub store: &'a SnapshotStore,
}

impl ValueSource for SnapshotSource<'_> {
    fn is_snapshot(&self) -> bool {
        true
    }

    fn entity_alive(&self, entity: EntityId) -> bool {
        self.store.contains(entity)
    }

    fn component_value(&self, entity: EntityId, component: &TypeHandle) -> Result<ComponentValue> {
        let record = self
            .store
            .get(entity)
            .ok_or_else(|| Error::Snapshot(format!("no snapshot for entity {entity}")))?;
        match record.component(component) {
            Some(CapturedComponent::Tag) => Ok(Value::Null),
            Some(CapturedComponent::Value(value)) => Ok(value.clone()),
            Some(CapturedComponent::Buffer(values)) => Ok(Value::Array(values.clone())),
            None => Err(Error::Snapshot(format!(
                "snapshot of entity {entity} has no {component}"
            ))),
        }
    }

    fn buffer_values(
        &self,
        entity: EntityId,
        component: &TypeHandle,
    ) -> Result<Vec<ComponentValue>> {
        match self.component_value(entity, component)? {
            Value::Array(values) => Ok(values),
            other => Ok(vec![other]),
        }
    }

    fn display_name(&self, entity: EntityId) -> Option<String> {
        self.store.get(entity).and_then(|record| record.name.clone())
    }

    fn component_types(&self, entity: EntityId) -> Vec<TypeHandle> {
        self.store
            .get(entity)
            .map(|record| record.component_types.clone())
            .unwrap_or_default()
    }
}

/// Drives one tree through one frame.
pub struct RefreshEngine<'a> {
    descriptor: &'a mut TypeDescriptor,
    config: &'a InspectorConfig,
    source: &'a dyn ValueSource,
    /// Entity whose components the root nodes are bound to.
    entity: EntityId,
    events: &'a mut Vec<TreeEvent>,
}

/// Skip test for the stale-cache optimization: an expandable node that is
/// collapsed and has refreshed at least once is not touched again until it
/// is reactivated. Snapshot nodes never skip.
fn should_skip(node: &Node) -> bool {
    node.initialized && !node.active && !node.snapshot && node.is_expandable()
}

impl<'a> RefreshEngine<'a> {
    pub fn new(
        descriptor: &'a mut TypeDescriptor,
        config: &'a InspectorConfig,
        source: &'a dyn ValueSource,
        entity: EntityId,
        events: &'a mut Vec<TreeEvent>,
    ) -> Self {
        Self {
            descriptor,
            config,
            source,
            entity,
            events,
        }
    }

    /// Refresh one component root: fetch its value from the source, then
    /// walk the subtree.
    pub fn refresh_root(&mut self, arena: &mut NodeArena, root: NodeId) {
        let (type_handle, is_buffer_root, skip) = match arena.get(root) {
            Some(node) => (
                node.type_handle.clone(),
                matches!(
                    node.kind,
                    NodeKind::Collection {
                        flavor: CollectionFlavor::ComponentList,
                        ..
                    }
                ) && node.access == Access::Root,
                should_skip(node),
            ),
            None => return,
        };
        if skip {
            return;
        }

        let fetched = if is_buffer_root {
            self.source
                .buffer_values(self.entity, &type_handle)
                .map(Value::Array)
        } else {
            self.source.component_value(self.entity, &type_handle)
        };

        match fetched {
            Ok(value) => {
                if let Some(node) = arena.get_mut(root) {
                    node.cached = value;
                }
                self.refresh_node(arena, root);
            }
            Err(e) => {
                // Transient read failure: keep the previous cached value
                // and move on to the next component.
                warn!(entity = self.entity, component = %type_handle, error = %e,
                    "component fetch failed, keeping cached value");
            }
        }
    }

    /// Refresh a node whose `cached` value was just written by the caller.
    fn refresh_node(&mut self, arena: &mut NodeArena, id: NodeId) {
        let kind = match arena.get(id) {
            Some(node) => node.kind.clone(),
            None => return,
        };

        match kind {
            NodeKind::MaxDepth => {}
            NodeKind::Leaf => self.refresh_leaf(arena, id),
            NodeKind::EntityRef { .. } => self.refresh_entity_ref(arena, id),
            NodeKind::Struct { materialized } => self.refresh_struct(arena, id, materialized),
            NodeKind::Collection { .. } => self.refresh_collection(arena, id),
        }
    }

    fn refresh_leaf(&mut self, arena: &mut NodeArena, id: NodeId) {
        let Some(node) = arena.get_mut(id) else {
            return;
        };
        let category = self.descriptor.category(&node.type_handle);
        node.display = display_for(&category, &node.cached);
        node.initialized = true;
    }

    fn refresh_entity_ref(&mut self, arena: &mut NodeArena, id: NodeId) {
        let Some(node) = arena.get_mut(id) else {
            return;
        };
        let resolved = extract_entity_id(&node.cached).filter(|&e| e != NULL_ENTITY);
        let alive = resolved
            .map(|entity| self.source.entity_alive(entity))
            .unwrap_or(false);

        let NodeKind::EntityRef {
            entity,
            display_name,
            can_inspect,
            can_navigate,
            popup_open,
        } = &mut node.kind
        else {
            return;
        };

        let was_alive = *can_inspect;
        let entity_changed = *entity != resolved;
        if entity_changed {
            *display_name = None;
        }
        *entity = resolved;
        *can_inspect = alive;
        *can_navigate = alive;

        if !alive && node.snapshot {
            // Reference died out of the snapshot's view: drop the cached
            // name and force-close any inspector popup showing it.
            *display_name = None;
            if *popup_open {
                *popup_open = false;
                self.events.push(TreeEvent::PopupClosed {
                    node: id,
                    entity: resolved,
                });
            }
        } else if alive && (!was_alive || entity_changed || !node.initialized) {
            // Name resolution is expensive; recompute only on the
            // not-resolvable to resolvable edge.
            *display_name = resolved.and_then(|e| self.source.display_name(e));
        }

        node.display = display_entity(
            resolved,
            match &node.kind {
                NodeKind::EntityRef { display_name, .. } => display_name.as_deref(),
                _ => None,
            },
            alive,
        );
        node.initialized = true;
    }

    fn refresh_struct(&mut self, arena: &mut NodeArena, id: NodeId, materialized: bool) {
        let (value, depth, activated) = match arena.get(id) {
            Some(node) => (node.cached.clone(), node.depth, node.active || node.snapshot),
            None => return,
        };

        if activated && !materialized {
            let fields = self.descriptor.fields_of(&type_handle_of(arena, id));
            if !fields.is_empty() {
                let snapshot = arena.get(id).map(|n| n.snapshot).unwrap_or(false);
                let mut builder = GraphBuilder::new(self.descriptor, self.config, snapshot);
                for field in fields.iter() {
                    builder.build_field_node(arena, id, field, depth + 1);
                }
                if let Some(node) = arena.get_mut(id) {
                    if let NodeKind::Struct { materialized } = &mut node.kind {
                        *materialized = true;
                    }
                }
            }
        }

        if activated {
            let children: Vec<NodeId> = arena
                .get(id)
                .map(|node| node.children.clone())
                .unwrap_or_default();
            for child in children {
                self.refresh_child_from(arena, child, &value);
            }
        }

        if let Some(node) = arena.get_mut(id) {
            node.display = display_value(&node.cached);
            node.initialized = true;
        }
    }

    fn refresh_collection(&mut self, arena: &mut NodeArena, id: NodeId) {
        let (items, depth, active, snapshot, element, flavor, old_len, old_page) =
            match arena.get(id) {
                Some(node) => {
                    let NodeKind::Collection {
                        flavor,
                        element,
                        page,
                        len,
                        ..
                    } = &node.kind
                    else {
                        return;
                    };
                    let Some(items) = node.cached.as_array() else {
                        debug!(label = %node.label, "collection value is not a list, keeping children");
                        return;
                    };
                    (
                        items.clone(),
                        node.depth,
                        node.active,
                        node.snapshot,
                        element.clone(),
                        *flavor,
                        *len,
                        *page,
                    )
                }
                None => return,
            };

        let new_len = items.len();
        let activated = active || snapshot;

        // Buffer-like lists defer child materialization until first
        // activation; bookkeeping still tracks the live count.
        let materialize = activated || flavor != CollectionFlavor::ComponentList;

        if materialize {
            let child_count = arena.get(id).map(|n| n.children.len()).unwrap_or(0);
            if new_len > child_count {
                let mut builder = GraphBuilder::new(self.descriptor, self.config, snapshot);
                for index in child_count..new_len {
                    builder.build_element_node(arena, id, index, &element, depth + 1);
                }
            } else if new_len < child_count {
                let excess: Vec<NodeId> = arena
                    .get_mut(id)
                    .map(|node| node.children.split_off(new_len))
                    .unwrap_or_default();
                for child in excess {
                    arena.release_subtree(child, self.events);
                }
            }
        }

        // Any structural change resets pagination.
        let structural_change = new_len != old_len;
        let page = if structural_change { 1 } else { old_page };
        let page_count = self.config.page_count(new_len);
        if let Some(node) = arena.get_mut(id) {
            if let NodeKind::Collection {
                page: p,
                page_count: pc,
                len,
                ..
            } = &mut node.kind
            {
                *p = page;
                *pc = page_count;
                *len = new_len;
            }
        }

        if materialize && activated {
            // Snapshot data is static, so paging buys nothing there: every
            // element refreshes. Live collections refresh only the current
            // page window.
            let (start, end) = if snapshot {
                (0, new_len)
            } else {
                self.config.page_window(page, new_len)
            };
            let children: Vec<NodeId> = arena
                .get(id)
                .map(|node| node.children[start..end].to_vec())
                .unwrap_or_default();
            for (offset, child) in children.into_iter().enumerate() {
                let value = &items[start + offset];
                self.refresh_child_with(arena, child, value);
            }
        }

        if let Some(node) = arena.get_mut(id) {
            node.display = format!("[{new_len} items]");
            node.initialized = true;
        }
    }

    /// Write a struct child's value (looked up by its field access) and
    /// recurse, honoring the skip rule.
    fn refresh_child_from(&mut self, arena: &mut NodeArena, child: NodeId, parent_value: &Value) {
        let access = match arena.get(child) {
            Some(node) => {
                if should_skip(node) {
                    return;
                }
                node.access.clone()
            }
            None => return,
        };
        let Access::Field(name) = &access else {
            return;
        };
        match parent_value.get(name) {
            Some(value) => {
                let value = value.clone();
                if let Some(node) = arena.get_mut(child) {
                    node.cached = value;
                }
                self.refresh_node(arena, child);
            }
            None => {
                // Field missing from the fetched value: stale cache stays.
                debug!(field = %name, "field absent from source value, keeping cached value");
            }
        }
    }

    /// Write a collection child's value and recurse, honoring the skip
    /// rule.
    fn refresh_child_with(&mut self, arena: &mut NodeArena, child: NodeId, value: &Value) {
        match arena.get(child) {
            Some(node) if !should_skip(node) => {}
            _ => return,
        }
        if let Some(node) = arena.get_mut(child) {
            node.cached = value.clone();
        }
        self.refresh_node(arena, child);
    }
}

fn type_handle_of(arena: &NodeArena, id: NodeId) -> TypeHandle {
    arena
        .get(id)
        .map(|node| node.type_handle.clone())
        .unwrap_or_default()
}

/// Refresh every component root of a tree, depth-first, in order.
pub fn refresh_tree(
    arena: &mut NodeArena,
    roots: &[NodeId],
    entity: EntityId,
    descriptor: &mut TypeDescriptor,
    source: &dyn ValueSource,
    config: &InspectorConfig,
    events: &mut Vec<TreeEvent>,
) {
    let mut engine = RefreshEngine::new(descriptor, config, source, entity, events);
    for &root in roots {
        engine.refresh_root(arena, root);
    }
}

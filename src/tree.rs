/*
 * ECS Inspector - Node tree
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

//! Arena-backed inspection tree.
//!
//! Nodes are stored in a per-tree arena and referenced by generation-checked
//! indices: releasing a subtree bumps the generation of every slot it
//! occupied, so a stale [`NodeId`] held by the UI simply stops resolving
//! instead of reading a recycled node. Release is synchronous and cascades
//! to all children before returning; popup closures encountered on the way
//! are reported through [`TreeEvent`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::EntityId;
use crate::schema::TypeHandle;

/// Generation-checked handle to a node in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// How a node's value is reached from its parent's cached value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Component root; the owning view fetches this value from the source.
    Root,
    /// Named field of the parent structure.
    Field(String),
    /// Element index of the parent collection.
    Index(usize),
}

/// Collection node variants, fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionFlavor {
    FixedArray,
    DynamicList,
    /// ECS-buffer-like list; children materialize on first expansion.
    ComponentList,
}

/// Kind-specific node payload. The variant is selected once when the node
/// is built and never changes.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Primitive or formattable value.
    Leaf,
    /// Placeholder emitted at the depth guard.
    MaxDepth,
    EntityRef {
        entity: Option<EntityId>,
        /// Resolved lazily, at most once per liveness transition.
        display_name: Option<String>,
        can_inspect: bool,
        can_navigate: bool,
        /// Whether a child inspector popup is showing this reference.
        popup_open: bool,
    },
    Struct {
        /// Children exist; set on first activation (or snapshot build).
        materialized: bool,
    },
    Collection {
        flavor: CollectionFlavor,
        element: TypeHandle,
        /// 1-based current page.
        page: usize,
        page_count: usize,
        /// Element count as of the last reconciliation.
        len: usize,
    },
}

/// One element of the inspection tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub label: String,
    pub type_handle: TypeHandle,
    pub access: Access,
    pub depth: usize,
    /// User-expanded. Only active (or snapshot) nodes pay refresh cost.
    pub active: bool,
    /// Has been value-refreshed at least once.
    pub initialized: bool,
    /// Belongs to a snapshot tree; always fully refreshed.
    pub snapshot: bool,
    /// Last value pulled from the source. Stale by design while inactive.
    pub cached: Value,
    pub display: String,
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn new(
        label: impl Into<String>,
        type_handle: TypeHandle,
        access: Access,
        depth: usize,
        kind: NodeKind,
        snapshot: bool,
    ) -> Self {
        Self {
            label: label.into(),
            type_handle,
            access,
            depth,
            active: false,
            initialized: false,
            snapshot,
            cached: Value::Null,
            display: String::new(),
            kind,
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn is_expandable(&self) -> bool {
        matches!(self.kind, NodeKind::Struct { .. } | NodeKind::Collection { .. })
    }

    pub fn is_entity_ref(&self) -> bool {
        matches!(self.kind, NodeKind::EntityRef { .. })
    }
}

/// Observable side effects of refresh and release, drained by the owning
/// view each frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// The whole tree was rebuilt after a structural mismatch.
    Rebuilt,
    /// An entity-reference popup was force-closed (reference died, or its
    /// node was released).
    PopupClosed {
        node: NodeId,
        entity: Option<EntityId>,
    },
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena owning every node of one inspection tree.
#[derive(Debug, Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Insert a node and register it as a child of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        node.parent = Some(parent);
        let id = self.insert(node);
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.push(id);
        }
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Release a node and every node below it. Cached values are dropped
    /// eagerly and slot generations bumped, so ids into the subtree stop
    /// resolving the moment this returns. Open popups found on the way are
    /// reported as [`TreeEvent::PopupClosed`]. Returns the released count.
    ///
    /// The caller is responsible for removing `root` from its parent's
    /// child list.
    pub fn release_subtree(&mut self, root: NodeId, events: &mut Vec<TreeEvent>) -> usize {
        let mut stack = vec![root];
        let mut released = 0;

        while let Some(id) = stack.pop() {
            let slot = match self.slots.get_mut(id.index as usize) {
                Some(slot) if slot.generation == id.generation => slot,
                _ => continue,
            };
            let Some(node) = slot.node.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            released += 1;

            if let NodeKind::EntityRef {
                entity,
                popup_open: true,
                ..
            } = node.kind
            {
                events.push(TreeEvent::PopupClosed { node: id, entity });
            }

            stack.extend(node.children);
        }

        released
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/*
 * ECS Inspector - Per-view entity inspector
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

//! One inspection view over one entity, live or snapshot-backed.
//!
//! Each view owns its tree exclusively: two views of the same entity get
//! two independent trees, each driving its own per-frame refresh. All
//! collaborators are passed in explicitly; the inspector holds no shared
//! state and no references to the host.

use tracing::debug;

use crate::builder::GraphBuilder;
use crate::config::InspectorConfig;
use crate::host::{EntityId, LiveDataSource};
use crate::refresh::{refresh_tree, LiveSource, SnapshotSource, ValueSource};
use crate::schema::TypeHandle;
use crate::snapshot::SnapshotStore;
use crate::tree::{NodeArena, NodeId, TreeEvent};
use crate::type_descriptor::TypeDescriptor;
use crate::view::{self, InspectorRequest, NodeRow, UserIntent};

/// Where a view reads its values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionMode {
    Live,
    Snapshot,
}

/// Per-view inspection state for one entity.
pub struct EntityInspector {
    entity: EntityId,
    mode: InspectionMode,
    arena: NodeArena,
    roots: Vec<NodeId>,
    /// Component-type sequence the current tree was built against.
    built_against: Vec<TypeHandle>,
    built: bool,
    events: Vec<TreeEvent>,
}

impl EntityInspector {
    pub fn new(entity: EntityId, mode: InspectionMode) -> Self {
        Self {
            entity,
            mode,
            arena: NodeArena::new(),
            roots: Vec::new(),
            built_against: Vec::new(),
            built: false,
            events: Vec::new(),
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn mode(&self) -> InspectionMode {
        self.mode
    }

    /// Per-frame tick: reconcile the tree structure, then refresh values.
    ///
    /// The live component-type sequence is compared order-sensitively with
    /// the sequence the tree was built against; any difference triggers a
    /// full rebuild rather than an incremental patch. A host that reorders
    /// its reported component sequence between frames will therefore
    /// rebuild every time it does so.
    pub fn refresh(
        &mut self,
        descriptor: &mut TypeDescriptor,
        live: &dyn LiveDataSource,
        snapshots: &SnapshotStore,
        config: &InspectorConfig,
    ) {
        match self.mode {
            InspectionMode::Live => {
                let source = LiveSource { world: live };
                self.refresh_with(descriptor, &source, config);
            }
            InspectionMode::Snapshot => {
                let source = SnapshotSource { store: snapshots };
                self.refresh_with(descriptor, &source, config);
            }
        }
    }

    fn refresh_with(
        &mut self,
        descriptor: &mut TypeDescriptor,
        source: &dyn ValueSource,
        config: &InspectorConfig,
    ) {
        let sequence = source.component_types(self.entity);
        if sequence != self.built_against {
            self.rebuild(descriptor, config, sequence);
        }
        refresh_tree(
            &mut self.arena,
            &self.roots,
            self.entity,
            descriptor,
            source,
            config,
            &mut self.events,
        );
    }

    fn rebuild(
        &mut self,
        descriptor: &mut TypeDescriptor,
        config: &InspectorConfig,
        sequence: Vec<TypeHandle>,
    ) {
        let had_tree = self.built;
        for root in std::mem::take(&mut self.roots) {
            self.arena.release_subtree(root, &mut self.events);
        }

        // Embedder-configured deny-list entries take effect wherever a
        // tree is (re)built.
        descriptor.deny_all(config.deny_list.iter().cloned());

        let snapshot_mode = self.mode == InspectionMode::Snapshot;
        let mut builder = GraphBuilder::new(descriptor, config, snapshot_mode);
        for handle in &sequence {
            let root = builder.build_component_root(&mut self.arena, handle);
            self.roots.push(root);
        }

        self.built_against = sequence;
        self.built = true;
        if had_tree {
            debug!(
                entity = self.entity,
                components = self.built_against.len(),
                "component set changed, tree rebuilt"
            );
            self.events.push(TreeEvent::Rebuilt);
        }
    }

    /// Flat view-model rows for the current frame.
    pub fn rows(&self, config: &InspectorConfig) -> Vec<NodeRow> {
        view::visible_rows(&self.arena, &self.roots, config)
    }

    /// Apply one user intent; cross-view intents come back as requests.
    pub fn apply(&mut self, intent: UserIntent) -> Option<InspectorRequest> {
        view::apply_intent(&mut self.arena, intent)
    }

    /// Record that a child inspector popup for this entity-reference node
    /// was opened or closed by the embedder.
    pub fn set_popup_open(&mut self, node: NodeId, open: bool) {
        view::set_popup_open(&mut self.arena, node, open);
    }

    /// Events accumulated since the last drain (rebuilds, forced popup
    /// closures).
    pub fn drain_events(&mut self) -> Vec<TreeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Tear the view down: releases every node synchronously. Popup
    /// closures surface through [`EntityInspector::drain_events`].
    pub fn release(&mut self) {
        for root in std::mem::take(&mut self.roots) {
            self.arena.release_subtree(root, &mut self.events);
        }
        self.built_against.clear();
        self.built = false;
    }

    /// Read access to the underlying tree, for embedders that need more
    /// than rows.
    pub fn tree(&self) -> &NodeArena {
        &self.arena
    }
}

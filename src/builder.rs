//! Node construction: decides which node kind wraps each field.
//!
//! The kind is picked once, from the schema's declared field shape and the
//! declared type's category, and never re-examined at refresh time.
//! Children are never built eagerly here: struct children materialize on
//! first activation, collection children during reconciliation.

use tracing::trace;

use crate::config::InspectorConfig;
use crate::format::{short_type_name, MAX_DEPTH_PLACEHOLDER};
use crate::schema::{FieldShape, TypeCategory, TypeHandle, ENTITY_TYPE};
use crate::tree::{Access, CollectionFlavor, Node, NodeArena, NodeId, NodeKind};
use crate::type_descriptor::{FieldDescriptor, TypeDescriptor};

/// Builds nodes for one tree, in either live or snapshot mode.
pub struct GraphBuilder<'a> {
    descriptor: &'a mut TypeDescriptor,
    config: &'a InspectorConfig,
    snapshot: bool,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        descriptor: &'a mut TypeDescriptor,
        config: &'a InspectorConfig,
        snapshot: bool,
    ) -> Self {
        Self {
            descriptor,
            config,
            snapshot,
        }
    }

    /// Root node for one attached component.
    pub fn build_component_root(&mut self, arena: &mut NodeArena, component: &TypeHandle) -> NodeId {
        let label = short_type_name(component).to_string();
        let kind = if self.descriptor.is_buffer(component) {
            NodeKind::Collection {
                flavor: CollectionFlavor::ComponentList,
                element: component.clone(),
                page: 1,
                page_count: 0,
                len: 0,
            }
        } else {
            self.kind_for(component, &FieldShape::Scalar, 0)
        };
        trace!(%component, ?kind, "built component root");
        arena.insert(Node::new(
            label,
            component.clone(),
            Access::Root,
            0,
            kind,
            self.snapshot,
        ))
    }

    /// Child node for one field of a structure.
    pub fn build_field_node(
        &mut self,
        arena: &mut NodeArena,
        parent: NodeId,
        field: &FieldDescriptor,
        depth: usize,
    ) -> NodeId {
        let kind = if depth >= self.config.max_depth {
            NodeKind::MaxDepth
        } else {
            self.kind_for(&field.type_handle, &field.shape, depth)
        };
        let mut node = Node::new(
            field.name.clone(),
            field.type_handle.clone(),
            Access::Field(field.name.clone()),
            depth,
            kind,
            self.snapshot,
        );
        if matches!(node.kind, NodeKind::MaxDepth) {
            node.display = MAX_DEPTH_PLACEHOLDER.to_string();
        }
        arena.insert_child(parent, node)
    }

    /// Child node for one element of a collection.
    pub fn build_element_node(
        &mut self,
        arena: &mut NodeArena,
        parent: NodeId,
        index: usize,
        element: &TypeHandle,
        depth: usize,
    ) -> NodeId {
        let shape = if element == ENTITY_TYPE {
            FieldShape::EntityRef
        } else {
            FieldShape::Scalar
        };
        let kind = if depth >= self.config.max_depth {
            NodeKind::MaxDepth
        } else {
            self.kind_for(element, &shape, depth)
        };
        let mut node = Node::new(
            format!("[{index}]"),
            element.clone(),
            Access::Index(index),
            depth,
            kind,
            self.snapshot,
        );
        if matches!(node.kind, NodeKind::MaxDepth) {
            node.display = MAX_DEPTH_PLACEHOLDER.to_string();
        }
        arena.insert_child(parent, node)
    }

    /// Dispatch, in priority order: formattable/primitive leaf, entity
    /// reference, fixed array, buffer-like list, dynamic list, non-empty
    /// structure, fallback leaf.
    fn kind_for(&mut self, handle: &TypeHandle, shape: &FieldShape, depth: usize) -> NodeKind {
        let category = self.descriptor.category(handle);
        if matches!(category, TypeCategory::Primitive | TypeCategory::Formattable) {
            return NodeKind::Leaf;
        }

        match shape {
            FieldShape::EntityRef => NodeKind::EntityRef {
                entity: None,
                display_name: None,
                can_inspect: false,
                can_navigate: false,
                popup_open: false,
            },
            FieldShape::FixedArray { element, .. } => {
                // Element descriptors come from the descriptor cache so the
                // element type is discovered (and denied) the same way as
                // anywhere else.
                self.descriptor.fields_of(element);
                NodeKind::Collection {
                    flavor: CollectionFlavor::FixedArray,
                    element: element.clone(),
                    page: 1,
                    page_count: 0,
                    len: 0,
                }
            }
            FieldShape::ComponentList { element } => NodeKind::Collection {
                flavor: CollectionFlavor::ComponentList,
                element: element.clone(),
                page: 1,
                page_count: 0,
                len: 0,
            },
            FieldShape::DynamicList { element } => NodeKind::Collection {
                flavor: CollectionFlavor::DynamicList,
                element: element.clone(),
                page: 1,
                page_count: 0,
                len: 0,
            },
            FieldShape::Scalar => {
                let denied = self.descriptor.is_denied(handle);
                let has_fields = !self.descriptor.fields_of(handle).is_empty();
                if has_fields && !denied && depth < self.config.max_depth {
                    NodeKind::Struct {
                        materialized: false,
                    }
                } else {
                    NodeKind::Leaf
                }
            }
        }
    }
}

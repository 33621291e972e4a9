//! View-model surface for the (out-of-scope) rendering layer.
//!
//! Each frame the UI asks for a flat list of [`NodeRow`]s and hands user
//! input back as [`UserIntent`]s. Intents that only affect the tree are
//! applied in place; intents that concern other views (open an inspector,
//! take a snapshot) bubble up as [`InspectorRequest`]s for the embedder.

use serde::Serialize;

use crate::config::InspectorConfig;
use crate::host::EntityId;
use crate::tree::{NodeArena, NodeId, NodeKind};

/// Pagination summary shown next to a collection row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: usize,
    pub page_count: usize,
    pub len: usize,
}

/// One rendered line of the inspection tree.
#[derive(Debug, Clone, Serialize)]
pub struct NodeRow {
    pub node: NodeId,
    pub depth: usize,
    pub label: String,
    pub value: String,
    pub is_entity_ref: bool,
    pub can_inspect: bool,
    pub can_navigate: bool,
    pub expandable: bool,
    pub expanded: bool,
    pub page: Option<PageInfo>,
}

/// User input routed back from the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserIntent {
    ToggleExpand(NodeId),
    NextPage(NodeId),
    PreviousPage(NodeId),
    RequestInspect(EntityId),
    RequestSnapshot(EntityId),
}

/// Intent the tree cannot satisfy itself; handled by the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectorRequest {
    Inspect(EntityId),
    Snapshot(EntityId),
}

/// Flatten the visible part of a tree, depth-first. Children appear only
/// under expanded nodes; for live collections only the current page window
/// is emitted, while snapshot collections render all elements.
pub fn visible_rows(arena: &NodeArena, roots: &[NodeId], config: &InspectorConfig) -> Vec<NodeRow> {
    let mut rows = Vec::new();
    for &root in roots {
        emit_rows(arena, root, config, &mut rows);
    }
    rows
}

fn emit_rows(arena: &NodeArena, id: NodeId, config: &InspectorConfig, rows: &mut Vec<NodeRow>) {
    let Some(node) = arena.get(id) else {
        return;
    };

    let (is_entity_ref, can_inspect, can_navigate) = match &node.kind {
        NodeKind::EntityRef {
            can_inspect,
            can_navigate,
            ..
        } => (true, *can_inspect, *can_navigate),
        _ => (false, false, false),
    };
    let page = match &node.kind {
        NodeKind::Collection {
            page,
            page_count,
            len,
            ..
        } => Some(PageInfo {
            page: *page,
            page_count: *page_count,
            len: *len,
        }),
        _ => None,
    };

    rows.push(NodeRow {
        node: id,
        depth: node.depth,
        label: node.label.clone(),
        value: node.display.clone(),
        is_entity_ref,
        can_inspect,
        can_navigate,
        expandable: node.is_expandable(),
        expanded: node.active,
        page,
    });

    if !node.active {
        return;
    }

    match &node.kind {
        NodeKind::Collection { page, len, .. } => {
            let (start, end) = if node.snapshot {
                (0, node.children.len())
            } else {
                let (start, end) = config.page_window(*page, *len);
                (start.min(node.children.len()), end.min(node.children.len()))
            };
            for &child in &node.children[start..end] {
                emit_rows(arena, child, config, rows);
            }
        }
        _ => {
            for &child in &node.children {
                emit_rows(arena, child, config, rows);
            }
        }
    }
}

/// Apply one intent. Tree-local intents return `None`; cross-view intents
/// come back as requests.
pub fn apply_intent(arena: &mut NodeArena, intent: UserIntent) -> Option<InspectorRequest> {
    match intent {
        UserIntent::ToggleExpand(id) => {
            toggle_expand(arena, id);
            None
        }
        UserIntent::NextPage(id) => {
            turn_page(arena, id, 1);
            None
        }
        UserIntent::PreviousPage(id) => {
            turn_page(arena, id, -1);
            None
        }
        UserIntent::RequestInspect(entity) => Some(InspectorRequest::Inspect(entity)),
        UserIntent::RequestSnapshot(entity) => Some(InspectorRequest::Snapshot(entity)),
    }
}

/// Record whether a child inspector popup is showing the referenced
/// entity. The refresh engine force-closes it (with a
/// [`crate::tree::TreeEvent::PopupClosed`]) when a snapshot-backed
/// reference stops resolving.
pub fn set_popup_open(arena: &mut NodeArena, id: NodeId, open: bool) {
    if let Some(node) = arena.get_mut(id) {
        if let NodeKind::EntityRef { popup_open, .. } = &mut node.kind {
            *popup_open = open;
        }
    }
}

/// Toggle a node's expanded state. Returns the new state; non-expandable
/// nodes stay collapsed.
pub fn toggle_expand(arena: &mut NodeArena, id: NodeId) -> bool {
    match arena.get_mut(id) {
        Some(node) if node.is_expandable() => {
            node.active = !node.active;
            node.active
        }
        _ => false,
    }
}

fn turn_page(arena: &mut NodeArena, id: NodeId, direction: isize) {
    if let Some(node) = arena.get_mut(id) {
        if let NodeKind::Collection {
            page, page_count, ..
        } = &mut node.kind
        {
            let last = (*page_count).max(1);
            let next = page.saturating_add_signed(direction);
            *page = next.clamp(1, last);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Access, CollectionFlavor, Node};
    use serde_json::Value;

    fn collection_node(len: usize, page: usize, snapshot: bool) -> Node {
        let mut node = Node::new(
            "items",
            "ItemList".to_string(),
            Access::Root,
            0,
            NodeKind::Collection {
                flavor: CollectionFlavor::DynamicList,
                element: "Item".to_string(),
                page,
                page_count: len.div_ceil(10),
                len,
            },
            snapshot,
        );
        node.active = true;
        node
    }

    fn leaf(index: usize) -> Node {
        let mut node = Node::new(
            format!("[{index}]"),
            "Item".to_string(),
            Access::Index(index),
            1,
            NodeKind::Leaf,
            false,
        );
        node.cached = Value::from(index as u64);
        node.display = index.to_string();
        node
    }

    fn build_collection(arena: &mut NodeArena, len: usize, page: usize, snapshot: bool) -> NodeId {
        let id = arena.insert(collection_node(len, page, snapshot));
        for index in 0..len {
            arena.insert_child(id, leaf(index));
        }
        id
    }

    #[test]
    fn rows_for_live_collection_cover_only_current_page() {
        let mut arena = NodeArena::new();
        let config = InspectorConfig::default();
        let id = build_collection(&mut arena, 25, 3, false);

        let rows = visible_rows(&arena, &[id], &config);
        // Collection row itself plus the 5 items of the last page.
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[1].label, "[20]");
        assert_eq!(rows[5].label, "[24]");
        assert_eq!(
            rows[0].page,
            Some(PageInfo {
                page: 3,
                page_count: 3,
                len: 25
            })
        );
    }

    #[test]
    fn rows_for_snapshot_collection_ignore_paging() {
        let mut arena = NodeArena::new();
        let config = InspectorConfig::default();
        let id = build_collection(&mut arena, 25, 1, true);

        let rows = visible_rows(&arena, &[id], &config);
        assert_eq!(rows.len(), 26);
    }

    #[test]
    fn collapsed_nodes_hide_their_children() {
        let mut arena = NodeArena::new();
        let config = InspectorConfig::default();
        let id = build_collection(&mut arena, 5, 1, false);
        toggle_expand(&mut arena, id);

        let rows = visible_rows(&arena, &[id], &config);
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].expanded);
    }

    #[test]
    fn page_turns_clamp_to_valid_range() {
        let mut arena = NodeArena::new();
        let id = build_collection(&mut arena, 25, 1, false);

        apply_intent(&mut arena, UserIntent::PreviousPage(id));
        assert_eq!(current_page(&arena, id), 1);
        apply_intent(&mut arena, UserIntent::NextPage(id));
        apply_intent(&mut arena, UserIntent::NextPage(id));
        apply_intent(&mut arena, UserIntent::NextPage(id));
        assert_eq!(current_page(&arena, id), 3);
    }

    #[test]
    fn cross_view_intents_bubble_up() {
        let mut arena = NodeArena::new();
        assert_eq!(
            apply_intent(&mut arena, UserIntent::RequestInspect(7)),
            Some(InspectorRequest::Inspect(7))
        );
        assert_eq!(
            apply_intent(&mut arena, UserIntent::RequestSnapshot(7)),
            Some(InspectorRequest::Snapshot(7))
        );
    }

    fn current_page(arena: &NodeArena, id: NodeId) -> usize {
        match &arena.get(id).unwrap().kind {
            NodeKind::Collection { page, .. } => *page,
            _ => unreachable!(),
        }
    }
}

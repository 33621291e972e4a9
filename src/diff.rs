//! Field-level comparison of a captured snapshot against the live world.
//!
//! Read-only on both sides. The comparison never fails on shape surprises:
//! mismatched value kinds are reported as modifications, and a component
//! that can no longer be read live counts as removed.

use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::format::display_value;
use crate::host::{EntityId, LiveDataSource};
use crate::schema::TypeHandle;
use crate::snapshot::{CapturedComponent, SnapshotStore};

/// Nesting bound for value comparison; deeper structure is compared as a
/// whole at the boundary.
const MAX_DIFF_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One changed field, addressed by its dotted path inside the component.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FieldDiff {
    pub path: String,
    pub change: ChangeKind,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DiffSummary {
    pub compared_components: usize,
    pub added_fields: usize,
    pub removed_fields: usize,
    pub modified_fields: usize,
}

impl DiffSummary {
    pub fn changed_fields(&self) -> usize {
        self.added_fields + self.removed_fields + self.modified_fields
    }
}

/// Result of comparing one entity's snapshot with its live state.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SnapshotDiff {
    pub entity: EntityId,
    pub live_entity_exists: bool,
    /// Components on the live entity that the snapshot does not have.
    pub added_components: Vec<TypeHandle>,
    /// Snapshot components missing from (or unreadable on) the live entity.
    pub removed_components: Vec<TypeHandle>,
    pub field_diffs: HashMap<TypeHandle, Vec<FieldDiff>>,
    pub summary: DiffSummary,
    pub descriptions: Vec<String>,
}

impl SnapshotDiff {
    pub fn is_unchanged(&self) -> bool {
        self.live_entity_exists
            && self.added_components.is_empty()
            && self.removed_components.is_empty()
            && self.summary.changed_fields() == 0
    }
}

/// Compare the captured state of `entity` against the live world.
pub fn diff_against_live(
    store: &SnapshotStore,
    entity: EntityId,
    live: &dyn LiveDataSource,
) -> Result<SnapshotDiff> {
    let record = store
        .get(entity)
        .ok_or_else(|| Error::Snapshot(format!("no snapshot for entity {entity}")))?;

    let live_entity_exists = live.exists(entity);
    let live_types = if live_entity_exists {
        live.component_types(entity)
    } else {
        Vec::new()
    };

    let mut diff = SnapshotDiff {
        entity,
        live_entity_exists,
        added_components: live_types
            .iter()
            .filter(|t| !record.has_component(t))
            .cloned()
            .collect(),
        removed_components: Vec::new(),
        field_diffs: HashMap::new(),
        summary: DiffSummary::default(),
        descriptions: Vec::new(),
    };

    for handle in &record.component_types {
        let captured = match record.component(handle) {
            Some(captured) => captured,
            None => continue,
        };
        if !live_types.iter().any(|t| t == handle) {
            diff.removed_components.push(handle.clone());
            continue;
        }

        let before = match captured {
            CapturedComponent::Tag => continue,
            CapturedComponent::Value(value) => value.clone(),
            CapturedComponent::Buffer(values) => Value::Array(values.clone()),
        };
        let after = match captured {
            CapturedComponent::Buffer(_) => live
                .buffer_values(entity, handle)
                .map(Value::Array),
            _ => live.component_value(entity, handle),
        };
        let after = match after {
            Ok(value) => value,
            Err(_) => {
                diff.removed_components.push(handle.clone());
                continue;
            }
        };

        diff.summary.compared_components += 1;
        let mut field_diffs = Vec::new();
        diff_values("", &before, &after, 0, &mut field_diffs);
        if !field_diffs.is_empty() {
            for field_diff in &field_diffs {
                match field_diff.change {
                    ChangeKind::Added => diff.summary.added_fields += 1,
                    ChangeKind::Removed => diff.summary.removed_fields += 1,
                    ChangeKind::Modified => diff.summary.modified_fields += 1,
                }
                diff.descriptions.push(describe(handle, field_diff));
            }
            diff.field_diffs.insert(handle.clone(), field_diffs);
        }
    }

    Ok(diff)
}

fn diff_values(path: &str, before: &Value, after: &Value, depth: usize, out: &mut Vec<FieldDiff>) {
    if depth > MAX_DIFF_DEPTH {
        if before != after {
            out.push(modified(path, before, after));
        }
        return;
    }

    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            for (key, old_value) in old {
                let child_path = join(path, key);
                match new.get(key) {
                    Some(new_value) => {
                        diff_values(&child_path, old_value, new_value, depth + 1, out)
                    }
                    None => out.push(FieldDiff {
                        path: child_path,
                        change: ChangeKind::Removed,
                        before: Some(old_value.clone()),
                        after: None,
                    }),
                }
            }
            for (key, new_value) in new {
                if !old.contains_key(key) {
                    out.push(FieldDiff {
                        path: join(path, key),
                        change: ChangeKind::Added,
                        before: None,
                        after: Some(new_value.clone()),
                    });
                }
            }
        }
        (Value::Array(old), Value::Array(new)) => {
            if old.len() != new.len() {
                out.push(modified(path, before, after));
            } else {
                for (index, (old_value, new_value)) in old.iter().zip(new).enumerate() {
                    diff_values(
                        &format!("{path}[{index}]"),
                        old_value,
                        new_value,
                        depth + 1,
                        out,
                    );
                }
            }
        }
        _ => {
            if before != after {
                out.push(modified(path, before, after));
            }
        }
    }
}

fn modified(path: &str, before: &Value, after: &Value) -> FieldDiff {
    FieldDiff {
        path: path.to_string(),
        change: ChangeKind::Modified,
        before: Some(before.clone()),
        after: Some(after.clone()),
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn describe(component: &TypeHandle, field_diff: &FieldDiff) -> String {
    let at = if field_diff.path.is_empty() {
        component.clone()
    } else {
        format!("{component}.{}", field_diff.path)
    };
    match field_diff.change {
        ChangeKind::Added => format!(
            "Added {at} with value {}",
            field_diff.after.as_ref().map(display_value).unwrap_or_default()
        ),
        ChangeKind::Removed => format!(
            "Removed {at} (was {})",
            field_diff.before.as_ref().map(display_value).unwrap_or_default()
        ),
        ChangeKind::Modified => format!(
            "Modified {at}: {} -> {}",
            field_diff.before.as_ref().map(display_value).unwrap_or_default(),
            field_diff.after.as_ref().map(display_value).unwrap_or_default()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_modifications_get_dotted_paths() {
        let mut out = Vec::new();
        diff_values(
            "",
            &json!({"pos": {"x": 1.0, "y": 2.0}}),
            &json!({"pos": {"x": 1.5, "y": 2.0}}),
            0,
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "pos.x");
        assert_eq!(out[0].change, ChangeKind::Modified);
    }

    #[test]
    fn added_and_removed_keys_are_reported() {
        let mut out = Vec::new();
        diff_values(
            "",
            &json!({"a": 1, "b": 2}),
            &json!({"b": 2, "c": 3}),
            0,
            &mut out,
        );
        let changes: Vec<(&str, ChangeKind)> = out
            .iter()
            .map(|d| (d.path.as_str(), d.change))
            .collect();
        assert!(changes.contains(&("a", ChangeKind::Removed)));
        assert!(changes.contains(&("c", ChangeKind::Added)));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn array_length_change_is_one_modification() {
        let mut out = Vec::new();
        diff_values("", &json!([1, 2]), &json!([1, 2, 3]), 0, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].change, ChangeKind::Modified);
    }

    #[test]
    fn equal_values_produce_no_diffs() {
        let mut out = Vec::new();
        diff_values("", &json!({"x": [1, {"y": 2}]}), &json!({"x": [1, {"y": 2}]}), 0, &mut out);
        assert!(out.is_empty());
    }
}

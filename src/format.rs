//! Display formatting for cached values.
//!
//! Every formatter is total: unexpected shapes fall back to a generic
//! rendering instead of failing, so a formatting problem can never take
//! down a frame.

use serde_json::Value;

use crate::host::{EntityId, NULL_ENTITY};
use crate::schema::TypeCategory;

/// Placeholder text for leaves emitted at the depth guard.
pub const MAX_DEPTH_PLACEHOLDER: &str = "(max depth reached)";

/// Marker for opaque handles that point at nothing.
pub const UNALLOCATED: &str = "(unallocated)";

/// Generic one-line rendering of a dynamic value.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("\"{s}\""),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{ {} fields }}", obj.len()),
    }
}

/// Category-aware rendering, covering the primitive-like host types that
/// are never introspected field-by-field.
pub fn display_for(category: &TypeCategory, value: &Value) -> String {
    match category {
        TypeCategory::FixedString { capacity_name } => {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Object(obj) => obj
                    .get("value")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                other => display_value(other),
            };
            format!("\"{text}\" ({capacity_name})")
        }
        TypeCategory::OpaqueHandle => match value {
            Value::Null => UNALLOCATED.to_string(),
            Value::Number(n) if n.as_u64() == Some(0) => UNALLOCATED.to_string(),
            Value::String(s) if s.is_empty() => UNALLOCATED.to_string(),
            Value::String(s) => s.clone(),
            other => display_value(other),
        },
        TypeCategory::ArchetypeToken => {
            let names: Vec<&str> = match value {
                Value::Array(arr) => arr.iter().filter_map(Value::as_str).collect(),
                Value::Object(obj) => obj
                    .get("types")
                    .and_then(Value::as_array)
                    .map(|arr| arr.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default(),
                _ => Vec::new(),
            };
            if names.is_empty() {
                "Archetype []".to_string()
            } else {
                format!("Archetype [{}]", names.join(", "))
            }
        }
        TypeCategory::Tag => "(tag)".to_string(),
        _ => display_value(value),
    }
}

/// Rendering for entity-reference leaves.
pub fn display_entity(entity: Option<EntityId>, name: Option<&str>, alive: bool) -> String {
    match entity {
        None => "Entity (null)".to_string(),
        Some(NULL_ENTITY) => "Entity (null)".to_string(),
        Some(id) if !alive => format!("Entity {id} (not found)"),
        Some(id) => match name {
            Some(name) => format!("Entity {id} ({name})"),
            None => format!("Entity {id}"),
        },
    }
}

/// Last path segment of a type handle, for row labels.
pub fn short_type_name(handle: &str) -> &str {
    handle
        .rsplit("::")
        .next()
        .and_then(|tail| tail.rsplit('.').next())
        .unwrap_or(handle)
}

/// Best-effort type name from a value's own shape, for diagnostics.
pub fn infer_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Option (None)",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() {
                "i64"
            } else if n.is_u64() {
                "u64"
            } else {
                "f64"
            }
        }
        Value::String(_) => "String",
        Value::Array(_) => "List",
        Value::Object(_) => "Struct",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generic_display_covers_all_value_arms() {
        assert_eq!(display_value(&json!(null)), "None");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&json!(1.5)), "1.5");
        assert_eq!(display_value(&json!("hi")), "\"hi\"");
        assert_eq!(display_value(&json!([1, 2, 3])), "[3 items]");
        assert_eq!(display_value(&json!({"a": 1})), "{ 1 fields }");
    }

    #[test]
    fn fixed_strings_render_quoted_with_capacity_name() {
        let category = TypeCategory::FixedString {
            capacity_name: "FixedString32".to_string(),
        };
        assert_eq!(
            display_for(&category, &json!("hello")),
            "\"hello\" (FixedString32)"
        );
        assert_eq!(
            display_for(&category, &json!({"value": "abc"})),
            "\"abc\" (FixedString32)"
        );
    }

    #[test]
    fn opaque_handles_mark_unallocated() {
        assert_eq!(display_for(&TypeCategory::OpaqueHandle, &json!(null)), UNALLOCATED);
        assert_eq!(display_for(&TypeCategory::OpaqueHandle, &json!(0)), UNALLOCATED);
        assert_eq!(display_for(&TypeCategory::OpaqueHandle, &json!("")), UNALLOCATED);
        assert_eq!(
            display_for(&TypeCategory::OpaqueHandle, &json!("Mesh#12")),
            "Mesh#12"
        );
    }

    #[test]
    fn archetype_tokens_summarize_constituents() {
        assert_eq!(
            display_for(
                &TypeCategory::ArchetypeToken,
                &json!(["Transform", "Velocity"])
            ),
            "Archetype [Transform, Velocity]"
        );
        assert_eq!(
            display_for(&TypeCategory::ArchetypeToken, &json!(17)),
            "Archetype []"
        );
    }

    #[test]
    fn entity_rendering_tracks_liveness_and_names() {
        assert_eq!(display_entity(None, None, false), "Entity (null)");
        assert_eq!(display_entity(Some(0), None, true), "Entity (null)");
        assert_eq!(display_entity(Some(7), None, false), "Entity 7 (not found)");
        assert_eq!(display_entity(Some(7), None, true), "Entity 7");
        assert_eq!(
            display_entity(Some(7), Some("Player"), true),
            "Entity 7 (Player)"
        );
    }
}

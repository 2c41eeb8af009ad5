//! Merged metadata computed from the structural tree.
//!
//! Attributes fold leaf-to-root. Sequencing merges with the right side
//! winning on conflicts (the right step produces the final value, so its
//! declared type is the one that holds). Unions collect both branch
//! types into a flattened list. Compound containers contribute their
//! container type only -- element and field metadata stays inside them.

use crate::ast::{AstNode, AstTag};
use crate::value::Value;
use std::collections::BTreeMap;

type Meta = BTreeMap<String, Value>;

/// Compute the merged metadata for a structural tree.
pub fn metadata(node: &AstNode) -> Meta {
    match node.tag {
        AstTag::And | AstTag::Pipeline => {
            let mut merged = Meta::new();
            for child in &node.children {
                merge_into(&mut merged, metadata(child));
            }
            merged
        }

        AstTag::Or => {
            let mut types = Vec::new();
            let mut merged = Meta::new();
            for child in &node.children {
                let mut child_meta = metadata(child);
                if let Some(t) = child_meta.remove("type") {
                    flatten_type(&mut types, t);
                }
                merge_into(&mut merged, child_meta);
            }
            match types.len() {
                0 => {}
                1 => {
                    merged.insert("type".to_string(), types.remove(0));
                }
                _ => {
                    merged.insert("type".to_string(), Value::Array(types));
                }
            }
            merged
        }

        AstTag::Not => node
            .children
            .first()
            .map(metadata)
            .unwrap_or_default(),

        // A rule contributes one `{rule_name: argument}` entry on top of
        // its inner type's metadata.
        AstTag::Policy => {
            let mut merged = node.children.first().map(metadata).unwrap_or_default();
            if let (Some(Value::Str(name)), Some(arg)) =
                (node.attr("policy_name"), node.attr("arg"))
            {
                merged.insert(name.clone(), arg.clone());
            }
            merged
        }

        AstTag::Default => {
            let mut merged = node.children.first().map(metadata).unwrap_or_default();
            if let Some(default) = node.attr("default") {
                merged.insert("default".to_string(), default.clone());
            }
            merged
        }

        // Containers declare their own type; what is inside them does
        // not bubble up.
        AstTag::Array | AstTag::Stream => container_meta(node, "Array"),
        AstTag::Hash | AstTag::HashMap | AstTag::TaggedHash => container_meta(node, "Hash"),
        AstTag::Tuple => container_meta(node, "Tuple"),

        // Leaves carry their attributes, minus the structural step
        // marker used by opaque wrappers (check, coerce, present).
        _ => {
            let mut attrs = node.attrs.clone();
            attrs.remove("step");
            attrs
        }
    }
}

fn container_meta(node: &AstNode, type_name: &str) -> Meta {
    let mut merged = Meta::new();
    merged.insert("type".to_string(), Value::Str(type_name.to_string()));
    // Container-level attributes (discriminator key, declared keys) are
    // structural, not metadata; only an explicit `type` override wins.
    if let Some(t) = node.attr("type") {
        merged.insert("type".to_string(), t.clone());
    }
    merged
}

fn merge_into(target: &mut Meta, incoming: Meta) {
    for (key, value) in incoming {
        target.insert(key, value);
    }
}

/// Append a `type` attribute into the union's collection, splicing
/// already-flattened lists and dropping duplicates.
fn flatten_type(types: &mut Vec<Value>, t: Value) {
    match t {
        Value::Array(items) => {
            for item in items {
                flatten_type(types, item);
            }
        }
        single => {
            if !types.contains(&single) {
                types.push(single);
            }
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    #[test]
    fn sequence_right_type_wins() {
        let t = types::string().transform("Integer", |_| Value::Int(0));
        assert_eq!(
            t.metadata().get("type"),
            Some(&Value::Str("Integer".into()))
        );
    }

    #[test]
    fn union_collects_branch_types_and_extra_attrs() {
        let t = types::string().or(types::integer().meta([("foo", Value::Str("bar".into()))]));
        let meta = t.metadata();
        assert_eq!(
            meta.get("type"),
            Some(&Value::Array(vec![
                Value::Str("String".into()),
                Value::Str("Integer".into()),
            ]))
        );
        assert_eq!(meta.get("foo"), Some(&Value::Str("bar".into())));
    }

    #[test]
    fn nested_unions_flatten_and_dedupe() {
        let t = types::string().or(types::numeric());
        assert_eq!(
            t.metadata().get("type"),
            Some(&Value::Array(vec![
                Value::Str("String".into()),
                Value::Str("Integer".into()),
                Value::Str("Decimal".into()),
            ]))
        );
    }

    #[test]
    fn default_contributes_its_value() {
        let t = types::string().default("Mr");
        let meta = t.metadata();
        assert_eq!(meta.get("type"), Some(&Value::Str("String".into())));
        assert_eq!(meta.get("default"), Some(&Value::Str("Mr".into())));
    }

    #[test]
    fn policy_contributes_a_rule_entry() {
        let t = types::integer().rule("gt", 10i64).unwrap();
        let meta = t.metadata();
        assert_eq!(meta.get("type"), Some(&Value::Str("Integer".into())));
        assert_eq!(meta.get("gt"), Some(&Value::Int(10)));
    }

    #[test]
    fn containers_hide_their_insides() {
        let t: crate::step::Type = types::array(types::string()).into();
        assert_eq!(t.metadata().get("type"), Some(&Value::Str("Array".into())));

        let t: crate::step::Type = types::hash([("a", types::integer())]).into();
        assert_eq!(t.metadata().get("type"), Some(&Value::Str("Hash".into())));
    }
}

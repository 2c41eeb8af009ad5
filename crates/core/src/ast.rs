//! Shallow structural description of a composed type.
//!
//! Every step yields one [`AstNode`]: a tag, an attribute map, and child
//! nodes. Visitors walk this tree to compute merged metadata and to emit
//! JSON Schema. The tree is deliberately shallow and finite: a deferred
//! (recursive) step emits a leaf `Any` node rather than expanding its
//! target, so traversals always terminate.

use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

// ──────────────────────────────────────────────
// Tags
// ──────────────────────────────────────────────

/// Node kinds. One tag per step family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstTag {
    Any,
    Step,
    Pipeline,
    Hash,
    HashMap,
    Array,
    Stream,
    Tuple,
    TaggedHash,
    And,
    Or,
    Not,
    Value,
    Static,
    Undefined,
    Transform,
    Metadata,
    Policy,
    Match,
    Interface,
    Build,
    Constructor,
    Default,
    Boolean,
}

impl AstTag {
    pub fn name(self) -> &'static str {
        match self {
            AstTag::Any => "any",
            AstTag::Step => "step",
            AstTag::Pipeline => "pipeline",
            AstTag::Hash => "hash",
            AstTag::HashMap => "hash_map",
            AstTag::Array => "array",
            AstTag::Stream => "stream",
            AstTag::Tuple => "tuple",
            AstTag::TaggedHash => "tagged_hash",
            AstTag::And => "and",
            AstTag::Or => "or",
            AstTag::Not => "not",
            AstTag::Value => "value",
            AstTag::Static => "static",
            AstTag::Undefined => "undefined",
            AstTag::Transform => "transform",
            AstTag::Metadata => "metadata",
            AstTag::Policy => "policy",
            AstTag::Match => "match",
            AstTag::Interface => "interface",
            AstTag::Build => "build",
            AstTag::Constructor => "constructor",
            AstTag::Default => "default",
            AstTag::Boolean => "boolean",
        }
    }
}

impl fmt::Display for AstTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ──────────────────────────────────────────────
// Nodes
// ──────────────────────────────────────────────

/// One node of the structural tree: `(tag, attrs, children)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub tag: AstTag,
    pub attrs: BTreeMap<String, Value>,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(tag: AstTag, attrs: BTreeMap<String, Value>, children: Vec<AstNode>) -> AstNode {
        AstNode {
            tag,
            attrs,
            children,
        }
    }

    /// A childless, attribute-less node.
    pub fn leaf(tag: AstTag) -> AstNode {
        AstNode::new(tag, BTreeMap::new(), Vec::new())
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> AstNode {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<AstNode>) -> AstNode {
        self.children = children;
        self
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Canonical JSON form `[tag, {attrs}, [children]]`, stable under
    /// the BTreeMap's sorted attribute order.
    pub fn to_json(&self) -> serde_json::Value {
        let attrs: serde_json::Map<String, serde_json::Value> = self
            .attrs
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::json!([
            self.tag.name(),
            attrs,
            self.children
                .iter()
                .map(AstNode::to_json)
                .collect::<Vec<_>>(),
        ])
    }

    /// Derived display name for unnamed types: composition shows its
    /// operators, leaves show their tag (plus the matched type when one
    /// is recorded).
    pub fn display_name(&self) -> String {
        match self.tag {
            AstTag::And => format!(
                "({} >> {})",
                child_name(self, 0),
                child_name(self, 1)
            ),
            AstTag::Or => format!("({} | {})", child_name(self, 0), child_name(self, 1)),
            AstTag::Not => format!("Not({})", child_name(self, 0)),
            AstTag::Match | AstTag::Transform | AstTag::Build | AstTag::Constructor => self
                .attr("type")
                .map(Value::to_string)
                .unwrap_or_else(|| capitalize(self.tag.name())),
            AstTag::Value => format!(
                "Value({})",
                self.attr("value").map(Value::inspect).unwrap_or_default()
            ),
            AstTag::Static => format!(
                "Static({})",
                self.attr("static").map(Value::inspect).unwrap_or_default()
            ),
            AstTag::Default | AstTag::Policy | AstTag::Metadata => child_name(self, 0),
            _ => capitalize(self.tag.name()),
        }
    }
}

fn child_name(node: &AstNode, index: usize) -> String {
    node.children
        .get(index)
        .map(AstNode::display_name)
        .unwrap_or_else(|| "?".to_string())
}

fn capitalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_form_is_tag_attrs_children() {
        let node = AstNode::leaf(AstTag::Match)
            .with_attr("type", "String")
            .with_children(vec![AstNode::leaf(AstTag::Any)]);
        assert_eq!(
            node.to_json(),
            serde_json::json!(["match", {"type": "String"}, [["any", {}, []]]])
        );
    }

    #[test]
    fn display_names_show_composition() {
        let left = AstNode::leaf(AstTag::Match).with_attr("type", "String");
        let right = AstNode::leaf(AstTag::Match).with_attr("type", "Integer");
        let node = AstNode::leaf(AstTag::Or).with_children(vec![left, right]);
        assert_eq!(node.display_name(), "(String | Integer)");
    }

    #[test]
    fn tag_names_are_snake_case() {
        assert_eq!(AstTag::HashMap.name(), "hash_map");
        assert_eq!(AstTag::TaggedHash.name(), "tagged_hash");
    }
}

//! Discriminated unions over hash schemas.
//!
//! A tagged hash routes its input to one of several variant schemas by
//! the literal value found at a discriminator key. The routing table is
//! built at construction time, which is also where the shape is
//! enforced: every variant must declare the key, and the key's type must
//! resolve to a single static value.

use crate::ast::{AstNode, AstTag};
use crate::hash::HashSchema;
use crate::outcome::Outcome;
use crate::step::{Step, Type};
use crate::value::Value;

/// Construction-time failures for [`TaggedHash`].
#[derive(Debug, thiserror::Error)]
pub enum TaggedHashError {
    #[error("tagged_by requires at least one variant")]
    NoVariants,
    #[error("variant {index} does not declare key '{key}'")]
    MissingKey { index: usize, key: String },
    #[error("variant {index} key '{key}' does not resolve to a static value")]
    NonStaticKey { index: usize, key: String },
}

#[derive(Debug, Clone)]
pub struct TaggedHash {
    base: HashSchema,
    key: String,
    variants: Vec<(Value, HashSchema)>,
}

impl TaggedHash {
    pub fn new<I>(base: HashSchema, key: &str, variants: I) -> Result<TaggedHash, TaggedHashError>
    where
        I: IntoIterator<Item = HashSchema>,
    {
        let mut routed = Vec::new();
        for (index, variant) in variants.into_iter().enumerate() {
            let field = variant
                .field_type(key)
                .ok_or_else(|| TaggedHashError::MissingKey {
                    index,
                    key: key.to_string(),
                })?;
            let tag = static_value(&field.ast()).ok_or_else(|| TaggedHashError::NonStaticKey {
                index,
                key: key.to_string(),
            })?;
            routed.push((tag, variant));
        }
        if routed.is_empty() {
            return Err(TaggedHashError::NoVariants);
        }
        Ok(TaggedHash {
            base,
            key: key.to_string(),
            variants: routed,
        })
    }

    fn dispatch_miss(&self) -> String {
        let tags: Vec<String> = self
            .variants
            .iter()
            .map(|(tag, _)| tag.to_string())
            .collect();
        format!("expected :{} to be one of {}", self.key, tags.join(", "))
    }
}

impl Step for TaggedHash {
    fn apply(&self, input: Outcome) -> Outcome {
        let based = Type::from(self.base.clone()).apply(input);
        if based.is_halt() {
            return based;
        }
        let tag = based.value().get(&self.key).clone();
        match self.variants.iter().find(|(t, _)| *t == tag) {
            Some((_, variant)) => Type::from(variant.clone()).apply(based),
            None => {
                let message = self.dispatch_miss();
                based.halt(message)
            }
        }
    }

    fn ast(&self) -> AstNode {
        let tags: Vec<Value> = self.variants.iter().map(|(tag, _)| tag.clone()).collect();
        let children = self
            .variants
            .iter()
            .map(|(_, variant)| variant.ast())
            .collect();
        AstNode::leaf(AstTag::TaggedHash)
            .with_attr("key", self.key.as_str())
            .with_attr("values", Value::Array(tags))
            .with_children(children)
    }
}

impl From<TaggedHash> for Type {
    fn from(tagged: TaggedHash) -> Type {
        Type::new(tagged)
    }
}

/// Walk a structural tree for the literal a field type settles on:
/// `Static`/`Value` directly, or the rightmost such node inside
/// sequences and wrappers. `None` when no literal exists.
fn static_value(node: &AstNode) -> Option<Value> {
    match node.tag {
        AstTag::Static => node.attr("static").cloned(),
        AstTag::Value => node.attr("value").cloned(),
        _ => node.children.iter().rev().find_map(static_value),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

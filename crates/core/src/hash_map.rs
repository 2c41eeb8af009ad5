//! Map-mode hashes: no declared keys, every entry checked against one
//! key type and one value type.
//!
//! Entries validate lazily in insertion order and the first failure
//! halts, so a huge input stops at its first bad entry. The formatted
//! failure names the offending key or value. On success the input
//! passes through unchanged.

use crate::ast::{AstNode, AstTag};
use crate::outcome::Outcome;
use crate::step::{Step, Type};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct HashMapType {
    key_type: Type,
    value_type: Type,
}

impl HashMapType {
    pub fn new(key_type: impl Into<Type>, value_type: impl Into<Type>) -> HashMapType {
        HashMapType {
            key_type: key_type.into(),
            value_type: value_type.into(),
        }
    }
}

impl Step for HashMapType {
    fn apply(&self, input: Outcome) -> Outcome {
        let entries = match input.value() {
            Value::Hash(entries) => entries.clone(),
            _ => return input.halt("Must be a Hash"),
        };

        for (key, value) in &entries {
            let key_out = self.key_type.resolve(Value::Str(key.clone()));
            if let Some(errs) = key_out.errors() {
                let message = format!("key {} {}", Value::Str(key.clone()).inspect(), errs);
                return input.halt(message);
            }
            let value_out = self.value_type.resolve(value.clone());
            if let Some(errs) = value_out.errors() {
                let message = format!("value {} {}", value.inspect(), errs);
                return input.halt(message);
            }
        }

        input
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::HashMap)
            .with_children(vec![self.key_type.ast(), self.value_type.ast()])
    }
}

impl From<HashMapType> for Type {
    fn from(map: HashMapType) -> Type {
        Type::new(map)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    fn counts() -> Type {
        HashMapType::new(types::string(), types::integer()).into()
    }

    #[test]
    fn valid_maps_pass_through_unchanged() {
        let input = Value::hash_of([("a", Value::Int(1)), ("b", Value::Int(2))]);
        let out = counts().resolve(input.clone());
        assert!(out.is_valid());
        assert_eq!(out.value(), &input);
    }

    #[test]
    fn first_bad_value_halts_with_a_formatted_message() {
        let input = Value::hash_of([
            ("a", Value::Int(1)),
            ("b", Value::Str("two".into())),
            ("c", Value::Str("three".into())),
        ]);
        let out = counts().resolve(input);
        assert_eq!(
            out.errors().unwrap().to_string(),
            "value \"two\" Must be a Integer"
        );
    }

    #[test]
    fn keys_are_validated_too() {
        let gated: Type = HashMapType::new(
            types::string().matching(crate::matcher::Matcher::regex("^[a-z]+$").unwrap()),
            types::any(),
        )
        .into();
        let out = gated.resolve(Value::hash_of([("ok", Value::Int(1)), ("NO", Value::Int(2))]));
        assert!(out
            .errors()
            .unwrap()
            .to_string()
            .starts_with("key \"NO\""));
    }

    #[test]
    fn non_hash_input_halts() {
        assert_eq!(
            counts().resolve(1).errors().unwrap().to_string(),
            "Must be a Hash"
        );
    }
}

//! Fixed-arity heterogeneous sequences.

use crate::ast::{AstNode, AstTag};
use crate::outcome::{ErrorTree, Outcome};
use crate::step::{Step, Type};
use crate::value::Value;
use std::collections::BTreeMap;

/// A sequence of exactly `types.len()` items, the i-th validated by the
/// i-th type. Errors aggregate by index.
#[derive(Debug, Clone)]
pub struct TupleType {
    types: Vec<Type>,
}

impl TupleType {
    pub fn new<I, T>(types: I) -> TupleType
    where
        T: Into<Type>,
        I: IntoIterator<Item = T>,
    {
        TupleType {
            types: types.into_iter().map(Into::into).collect(),
        }
    }
}

impl Step for TupleType {
    fn apply(&self, input: Outcome) -> Outcome {
        let items = match input.value() {
            Value::Array(items) => items.clone(),
            _ => return input.halt("Must be a Array"),
        };
        if items.len() != self.types.len() {
            return input.halt(format!("Must have size {}", self.types.len()));
        }

        let mut output = Vec::with_capacity(items.len());
        let mut errors: BTreeMap<usize, ErrorTree> = BTreeMap::new();
        for (index, (typ, item)) in self.types.iter().zip(items).enumerate() {
            let (value, errs) = typ.resolve(item).into_parts();
            match errs {
                None => output.push(value),
                Some(errs) => {
                    errors.insert(index, errs);
                }
            }
        }

        if errors.is_empty() {
            input.valid(Value::Array(output))
        } else {
            let original = input.value().clone();
            input.halt_with(ErrorTree::Items(errors), original)
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Tuple).with_children(self.types.iter().map(Type::ast).collect())
    }
}

impl From<TupleType> for Type {
    fn from(tuple: TupleType) -> Type {
        Type::new(tuple)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

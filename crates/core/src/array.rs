//! Homogeneous arrays: one element type applied to every item.
//!
//! Errors aggregate by index; the halted outcome carries the original
//! input sequence so callers can report against what they were given.
//! The concurrent variant fans element evaluation out to scoped worker
//! threads -- element types are immutable and share no state, so no
//! locking is involved -- and reassembles results in input order.

use crate::ast::{AstNode, AstTag};
use crate::outcome::{ErrorTree, Outcome};
use crate::step::{Step, Type};
use crate::value::Value;
use std::collections::BTreeMap;

/// Array of `element`. Non-sequences halt with a type mismatch.
#[derive(Debug, Clone)]
pub struct ArrayType {
    element: Type,
    concurrent: bool,
}

impl ArrayType {
    pub fn new(element: impl Into<Type>) -> ArrayType {
        ArrayType {
            element: element.into(),
            concurrent: false,
        }
    }

    /// Evaluate elements on worker threads. Output ordering still
    /// follows input ordering; a panicked worker surfaces as a halt at
    /// its index. Worth it only when per-element work dominates dispatch
    /// cost.
    pub fn concurrent(mut self) -> ArrayType {
        self.concurrent = true;
        self
    }

    fn apply_sequential(&self, items: &[Value]) -> Vec<Outcome> {
        items
            .iter()
            .map(|item| self.element.resolve(item.clone()))
            .collect()
    }

    fn apply_concurrent(&self, items: &[Value]) -> Vec<Outcome> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = items
                .iter()
                .map(|item| {
                    let element = &self.element;
                    scope.spawn(move || element.resolve(item.clone()))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(out) => out,
                    Err(_) => {
                        Outcome::wrap(Value::Null).halt("element evaluation panicked")
                    }
                })
                .collect()
        })
    }
}

impl Step for ArrayType {
    fn apply(&self, input: Outcome) -> Outcome {
        let items = match input.value() {
            Value::Array(items) => items.clone(),
            _ => return input.halt("Must be a Array"),
        };

        let results = if self.concurrent {
            self.apply_concurrent(&items)
        } else {
            self.apply_sequential(&items)
        };

        let mut output = Vec::with_capacity(results.len());
        let mut errors: BTreeMap<usize, ErrorTree> = BTreeMap::new();
        for (index, result) in results.into_iter().enumerate() {
            let (value, errs) = result.into_parts();
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
        AstNode::leaf(AstTag::Array).with_children(vec![self.element.ast()])
    }
}

impl From<ArrayType> for Type {
    fn from(array: ArrayType) -> Type {
        Type::new(array)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

//! Pull-based element validation.
//!
//! A stream applies its element type lazily, one item per pull, and
//! never short-circuits: each pull yields that element's own outcome and
//! the consumer decides whether to keep going. The iterator is bounded
//! by the input and cannot be restarted.

use crate::ast::{AstNode, AstTag};
use crate::outcome::Outcome;
use crate::step::{Step, Type};
use crate::value::Value;

/// Lazy element-wise validation over a sequence.
#[derive(Debug, Clone)]
pub struct StreamType {
    element: Type,
}

impl StreamType {
    pub fn new(element: impl Into<Type>) -> StreamType {
        StreamType {
            element: element.into(),
        }
    }

    /// Pull-based results. Halts up front (as a single erroneous pull)
    /// when the input is not a sequence.
    pub fn stream(&self, value: Value) -> StreamIter {
        match value {
            Value::Array(items) => StreamIter {
                element: self.element.clone(),
                items: items.into_iter(),
                failed: false,
            },
            other => StreamIter {
                element: self.element.clone(),
                items: vec![other].into_iter(),
                failed: true,
            },
        }
    }
}

impl Step for StreamType {
    /// As a step, a stream only vouches for sequence-ness; per-element
    /// results come from [`StreamType::stream`].
    fn apply(&self, input: Outcome) -> Outcome {
        match input.value() {
            Value::Array(_) => input,
            _ => input.halt("Must be a Array"),
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Stream).with_children(vec![self.element.ast()])
    }
}

impl From<StreamType> for Type {
    fn from(stream: StreamType) -> Type {
        Type::new(stream)
    }
}

/// One outcome per input element. Finite and non-restartable.
pub struct StreamIter {
    element: Type,
    items: std::vec::IntoIter<Value>,
    failed: bool,
}

impl Iterator for StreamIter {
    type Item = Outcome;

    fn next(&mut self) -> Option<Outcome> {
        let item = self.items.next()?;
        if self.failed {
            // Single poisoned pull for non-sequence input.
            return Some(Outcome::wrap(item).halt("Must be a Array"));
        }
        Some(self.element.resolve(item))
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
    fn pulls_yield_per_element_outcomes_without_short_circuit() {
        let stream = StreamType::new(types::integer());
        let outcomes: Vec<Outcome> = stream
            .stream(Value::Array(vec![
                Value::Int(1),
                Value::Str("x".into()),
                Value::Int(3),
            ]))
            .collect();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_valid());
        assert!(outcomes[1].is_halt());
        assert!(outcomes[2].is_valid());
    }

    #[test]
    fn stream_is_bounded_by_input() {
        let stream = StreamType::new(types::any());
        assert_eq!(stream.stream(Value::Array(vec![])).count(), 0);
    }

    #[test]
    fn non_sequence_yields_one_failed_pull() {
        let stream = StreamType::new(types::any());
        let outcomes: Vec<Outcome> = stream.stream(Value::Int(5)).collect();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_halt());
    }

    #[test]
    fn as_a_step_it_checks_sequence_ness_only() {
        let t: Type = StreamType::new(types::integer()).into();
        assert!(t.resolve(Value::Array(vec![Value::Str("x".into())])).is_valid());
        assert!(t.resolve(1).is_halt());
    }
}

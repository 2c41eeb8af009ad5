//! Leaf steps: the smallest building blocks of the algebra.
//!
//! Each leaf does exactly one thing to an outcome and reports itself as
//! a single AST node. Compound behavior comes from composition, never
//! from flags on the leaves.

use crate::ast::{AstNode, AstTag};
use crate::matcher::Matcher;
use crate::outcome::Outcome;
use crate::step::Step;
use crate::value::{Value, ValueKind};

// ──────────────────────────────────────────────
// Any
// ──────────────────────────────────────────────

/// The identity step. Accepts everything, changes nothing.
#[derive(Debug, Clone, Copy)]
pub struct Any;

impl Step for Any {
    fn apply(&self, input: Outcome) -> Outcome {
        input
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Any)
    }
}

// ──────────────────────────────────────────────
// Static
// ──────────────────────────────────────────────

/// Replaces whatever value arrives with a fixed one.
#[derive(Debug, Clone)]
pub struct Static {
    value: Value,
}

impl Static {
    pub fn new(value: impl Into<Value>) -> Static {
        Static {
            value: value.into(),
        }
    }
}

impl Step for Static {
    fn apply(&self, input: Outcome) -> Outcome {
        input.valid(self.value.clone())
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Static)
            .with_attr("static", self.value.clone())
            .with_attr("type", self.value.type_name())
    }
}

// ──────────────────────────────────────────────
// ValueEq
// ──────────────────────────────────────────────

/// Exact-equality gate.
#[derive(Debug, Clone)]
pub struct ValueEq {
    expected: Value,
}

impl ValueEq {
    pub fn new(expected: impl Into<Value>) -> ValueEq {
        ValueEq {
            expected: expected.into(),
        }
    }
}

impl Step for ValueEq {
    fn apply(&self, input: Outcome) -> Outcome {
        if input.value() == &self.expected {
            input
        } else {
            input.halt(format!("Must be equal to {}", self.expected.inspect()))
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Value)
            .with_attr("value", self.expected.clone())
            .with_attr("type", self.expected.type_name())
    }
}

// ──────────────────────────────────────────────
// Match
// ──────────────────────────────────────────────

/// Polymorphic predicate gate over a [`Matcher`].
#[derive(Debug, Clone)]
pub struct MatchStep {
    matcher: Matcher,
}

impl MatchStep {
    pub fn new(matcher: impl Into<Matcher>) -> MatchStep {
        MatchStep {
            matcher: matcher.into(),
        }
    }
}

impl Step for MatchStep {
    fn apply(&self, input: Outcome) -> Outcome {
        if self.matcher.admits(input.value()) {
            input
        } else {
            let message = match &self.matcher {
                Matcher::Kind(kind) => format!("Must be a {}", kind.name()),
                other => format!("Must match {}", other),
            };
            input.halt(message)
        }
    }

    fn ast(&self) -> AstNode {
        let node = AstNode::leaf(AstTag::Match);
        match &self.matcher {
            Matcher::Kind(kind) => node.with_attr("type", kind.name()),
            Matcher::Regex(re) => node
                .with_attr("type", ValueKind::Str.name())
                .with_attr("pattern", re.as_str()),
            Matcher::Range { .. } => node.with_attr("range", self.matcher.to_value()),
            Matcher::Predicate { name, .. } => node.with_attr("predicate", name.as_str()),
            Matcher::Literal(v) => node.with_attr("match", v.clone()),
        }
    }
}

// ──────────────────────────────────────────────
// Undefined / Nothing
// ──────────────────────────────────────────────

/// Matches only the `Undefined` sentinel -- the "no value was provided"
/// case. Everything else halts.
#[derive(Debug, Clone, Copy)]
pub struct Nothing;

impl Step for Nothing {
    fn apply(&self, input: Outcome) -> Outcome {
        if input.value().is_undefined() {
            input
        } else {
            input.halt("Must be Undefined")
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Undefined)
    }
}

// ──────────────────────────────────────────────
// Null
// ──────────────────────────────────────────────

/// Matches only null.
#[derive(Debug, Clone, Copy)]
pub struct NullType;

impl Step for NullType {
    fn apply(&self, input: Outcome) -> Outcome {
        if input.value().is_null() {
            input
        } else {
            input.halt("Must be nil")
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Match).with_attr("type", ValueKind::Null.name())
    }
}

// ──────────────────────────────────────────────
// Present
// ──────────────────────────────────────────────

/// Halts for undefined, null, and empty sized values (string, array,
/// hash). Everything else passes through.
#[derive(Debug, Clone, Copy)]
pub struct Present;

impl Step for Present {
    fn apply(&self, input: Outcome) -> Outcome {
        let value = input.value();
        if value.is_undefined() || value.is_null() || value.is_empty() {
            input.halt("must be present")
        } else {
            input
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Step).with_attr("step", "present")
    }
}

// ──────────────────────────────────────────────
// Boolean
// ──────────────────────────────────────────────

/// Accepts `true` or `false`, the union of the two boolean literals.
#[derive(Debug, Clone, Copy)]
pub struct BooleanType;

impl Step for BooleanType {
    fn apply(&self, input: Outcome) -> Outcome {
        match input.value() {
            Value::Bool(_) => input,
            _ => input.halt("Must be a Boolean"),
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Boolean).with_attr("type", ValueKind::Bool.name())
    }
}

// ──────────────────────────────────────────────
// Interface
// ──────────────────────────────────────────────

/// Capability check: the value must support every named operation (see
/// `Value::responds_to`).
#[derive(Debug, Clone)]
pub struct Interface {
    methods: Vec<String>,
}

impl Interface {
    pub fn new<I, S>(methods: I) -> Interface
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        Interface {
            methods: methods.into_iter().map(Into::into).collect(),
        }
    }
}

impl Step for Interface {
    fn apply(&self, input: Outcome) -> Outcome {
        let missing: Vec<&str> = self
            .methods
            .iter()
            .map(String::as_str)
            .filter(|m| !input.value().responds_to(m))
            .collect();
        if missing.is_empty() {
            input
        } else {
            input.halt(format!("Must respond to {}", missing.join(", ")))
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Interface).with_attr(
            "methods",
            Value::Array(
                self.methods
                    .iter()
                    .map(|m| Value::Str(m.clone()))
                    .collect(),
            ),
        )
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

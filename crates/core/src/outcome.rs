//! The result type threaded through every step.
//!
//! An [`Outcome`] always carries a value, even when halted, so error
//! reports can point at the offending input. A halted outcome is terminal
//! for sequencing (`then`) but may be recovered by a union (`or`).
//!
//! Errors form a tree mirroring the shape of the data: plain messages at
//! the leaves, field-keyed subtrees for hashes, index-keyed subtrees for
//! arrays and tuples, and ordered groups for union branches.

use crate::value::Value;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;

// ──────────────────────────────────────────────
// Error tree
// ──────────────────────────────────────────────

/// Structured validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorTree {
    /// A single message.
    Message(String),
    /// Ordered aggregation of branch errors, produced when every branch
    /// of a union halts.
    Group(Vec<ErrorTree>),
    /// Field-name-keyed errors from hash schemas. Preserves declared
    /// field order.
    Fields(IndexMap<String, ErrorTree>),
    /// Index-keyed errors from arrays and tuples.
    Items(BTreeMap<usize, ErrorTree>),
}

impl ErrorTree {
    pub fn message(msg: impl Into<String>) -> ErrorTree {
        ErrorTree::Message(msg.into())
    }

    /// Join two error trees into an ordered group, splicing existing
    /// groups so `(a | b) | c` reports three entries, not a nested pair.
    pub fn join(left: ErrorTree, right: ErrorTree) -> ErrorTree {
        let mut entries = Vec::new();
        match left {
            ErrorTree::Group(mut inner) => entries.append(&mut inner),
            other => entries.push(other),
        }
        match right {
            ErrorTree::Group(mut inner) => entries.append(&mut inner),
            other => entries.push(other),
        }
        ErrorTree::Group(entries)
    }

    /// JSON rendering: messages as strings, groups as arrays, keyed
    /// subtrees as objects.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ErrorTree::Message(msg) => serde_json::Value::String(msg.clone()),
            ErrorTree::Group(entries) => {
                serde_json::Value::Array(entries.iter().map(ErrorTree::to_json).collect())
            }
            ErrorTree::Fields(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(name, errs)| (name.clone(), errs.to_json()))
                    .collect(),
            ),
            ErrorTree::Items(items) => serde_json::Value::Object(
                items
                    .iter()
                    .map(|(idx, errs)| (idx.to_string(), errs.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorTree::Message(msg) => f.write_str(msg),
            ErrorTree::Group(entries) => {
                let rendered: Vec<String> = entries.iter().map(ErrorTree::to_string).collect();
                f.write_str(&rendered.join(", "))
            }
            ErrorTree::Fields(fields) => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|(name, errs)| format!("{}: ({})", name, errs))
                    .collect();
                f.write_str(&rendered.join(", "))
            }
            ErrorTree::Items(items) => {
                let rendered: Vec<String> = items
                    .iter()
                    .map(|(idx, errs)| format!("[{}] ({})", idx, errs))
                    .collect();
                f.write_str(&rendered.join(", "))
            }
        }
    }
}

impl From<&str> for ErrorTree {
    fn from(msg: &str) -> Self {
        ErrorTree::Message(msg.to_string())
    }
}

impl From<String> for ErrorTree {
    fn from(msg: String) -> Self {
        ErrorTree::Message(msg)
    }
}

// ──────────────────────────────────────────────
// Outcome
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Status {
    Valid,
    Halt(ErrorTree),
}

/// The value-plus-status pair consumed and produced by every step.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    value: Value,
    status: Status,
}

impl Outcome {
    /// Wrap a raw value as a valid outcome, the entry point into a type.
    pub fn wrap(value: impl Into<Value>) -> Outcome {
        Outcome {
            value: value.into(),
            status: Status::Valid,
        }
    }

    /// Transition to valid, replacing the carried value.
    pub fn valid(self, value: impl Into<Value>) -> Outcome {
        Outcome {
            value: value.into(),
            status: Status::Valid,
        }
    }

    /// Transition to halted, keeping the carried value.
    pub fn halt(self, errors: impl Into<ErrorTree>) -> Outcome {
        Outcome {
            value: self.value,
            status: Status::Halt(errors.into()),
        }
    }

    /// Transition to halted with a replacement value (used by compound
    /// types to expose the partially built output).
    pub fn halt_with(self, errors: impl Into<ErrorTree>, value: impl Into<Value>) -> Outcome {
        Outcome {
            value: value.into(),
            status: Status::Halt(errors.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.status, Status::Valid)
    }

    pub fn is_halt(&self) -> bool {
        !self.is_valid()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn errors(&self) -> Option<&ErrorTree> {
        match &self.status {
            Status::Valid => None,
            Status::Halt(errors) => Some(errors),
        }
    }

    /// Split into `(value, errors)`.
    pub fn into_parts(self) -> (Value, Option<ErrorTree>) {
        match self.status {
            Status::Valid => (self.value, None),
            Status::Halt(errors) => (self.value, Some(errors)),
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

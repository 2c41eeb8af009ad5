//! sieve-schema: a field-by-field builder over the core hash types.
//!
//! Thin sugar for the common case of declaring a record shape: name the
//! fields, mark some optional, hang defaults off the field types, and
//! publish. `before` hooks see the raw input ahead of field validation;
//! `after` hooks see the validated output. The two channels are
//! distinct, both run in registration order, and either may halt.
//!
//! ```
//! use sieve_core::{types, Value};
//! use sieve_schema::Schema;
//!
//! let person = Schema::new()
//!     .field("name", types::string())
//!     .field("title", types::string().default("Mr"))
//!     .build();
//! let out = person.resolve(Value::hash_of([
//!     ("name", Value::Str("Ismael".into())),
//! ]));
//! assert_eq!(out.value().get("title"), &Value::Str("Mr".into()));
//! ```

use sieve_core::ast::AstNode;
use sieve_core::hash::Key;
use sieve_core::outcome::Outcome;
use sieve_core::step::{Step, Type};
use sieve_core::HashSchema;
use std::fmt;
use std::sync::Arc;

type Hook = Arc<dyn Fn(Outcome) -> Outcome + Send + Sync>;

/// Consuming builder. Publish with [`Schema::build`].
#[derive(Clone, Default)]
pub struct Schema {
    fields: HashSchema,
    before: Vec<Hook>,
    after: Vec<Hook>,
}

impl Schema {
    pub fn new() -> Schema {
        Schema::default()
    }

    /// Declare a required field. Literal `Value`s are accepted where a
    /// type is expected and become static fields.
    pub fn field(mut self, name: &str, typ: impl Into<Type>) -> Schema {
        self.fields = self.fields.field(Key::required(name), typ);
        self
    }

    /// Declare an optional field: absent input omits it from the output.
    pub fn field_opt(mut self, name: &str, typ: impl Into<Type>) -> Schema {
        self.fields = self.fields.field(Key::opt(name), typ);
        self
    }

    /// Hook over the raw input, ahead of field validation. May reshape
    /// the value or halt.
    pub fn before(mut self, hook: impl Fn(Outcome) -> Outcome + Send + Sync + 'static) -> Schema {
        self.before.push(Arc::new(hook));
        self
    }

    /// Hook over the validated output. May reshape the value or halt.
    pub fn after(mut self, hook: impl Fn(Outcome) -> Outcome + Send + Sync + 'static) -> Schema {
        self.after.push(Arc::new(hook));
        self
    }

    /// Merge another schema's fields into this one (their fields win on
    /// conflicts, required wins on optionality). Hooks are kept from
    /// both, in registration order.
    pub fn merge(mut self, other: Schema) -> Schema {
        self.fields = self.fields.merge(&other.fields);
        self.before.extend(other.before);
        self.after.extend(other.after);
        self
    }

    /// Publish as an immutable core type.
    pub fn build(self) -> Type {
        Type::new(SchemaStep {
            hash: Type::from(self.fields),
            before: self.before,
            after: self.after,
        })
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Schema({} before, {} after)",
            self.before.len(),
            self.after.len()
        )
    }
}

/// The published form: before hooks, then the hash schema, then after
/// hooks, halting at the first failure.
struct SchemaStep {
    hash: Type,
    before: Vec<Hook>,
    after: Vec<Hook>,
}

impl Step for SchemaStep {
    fn apply(&self, input: Outcome) -> Outcome {
        let mut out = input;
        for hook in &self.before {
            if out.is_halt() {
                return out;
            }
            out = hook(out);
        }
        if out.is_halt() {
            return out;
        }
        out = self.hash.apply(out);
        for hook in &self.after {
            if out.is_halt() {
                return out;
            }
            out = hook(out);
        }
        out
    }

    fn ast(&self) -> AstNode {
        self.hash.ast()
    }
}

impl fmt::Debug for SchemaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaStep({:?})", self.hash)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

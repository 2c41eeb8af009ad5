//! sieve-core: a composable data validation and transformation engine.
//!
//! Small steps -- predicates, coercions, transforms, static values --
//! compose through an algebra of sequence, union, negation, and deferral
//! into larger types that validate, coerce, and reshape input data. A
//! run produces an [`Outcome`]: the value so far, plus a structured
//! error tree when validation halted.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`Type`] -- the composable handle; build with the [`types`] module
//! - [`Outcome`] / [`ErrorTree`] -- per-run results
//! - [`Value`] -- the dynamic value model
//! - [`AstNode`] -- the structural tree behind metadata and JSON Schema
//! - [`defer()`] -- lazy references for recursive types
//!
//! ```
//! use sieve_core::{types, Value};
//!
//! let person = types::hash([
//!     ("name", types::string()),
//!     ("age?", types::lax::integer()),
//! ]);
//! let out = sieve_core::Type::from(person).resolve(Value::hash_of([
//!     ("name", Value::Str("Ismael".into())),
//!     ("age", Value::Str("42".into())),
//! ]));
//! assert!(out.is_valid());
//! assert_eq!(out.value().get("age"), &Value::Int(42));
//! ```

pub mod array;
pub mod ast;
pub mod combinators;
pub mod hash;
pub mod hash_map;
pub mod json_schema;
pub mod matcher;
pub mod metadata;
pub mod outcome;
pub mod pipeline;
pub mod primitives;
pub mod rules;
pub mod step;
pub mod stream;
pub mod tagged_hash;
pub mod tuple;
pub mod types;
pub mod value;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{AstNode, AstTag};
pub use hash::{HashSchema, Key};
pub use matcher::Matcher;
pub use outcome::{ErrorTree, Outcome};
pub use step::{defer, CastError, Step, Type};
pub use value::{Value, ValueKind};

// ── Convenience re-exports: extension points ─────────────────────────

pub use pipeline::Pipeline;
pub use rules::{register_rule, RuleDef, UnsupportedRuleError};
pub use tagged_hash::TaggedHashError;

//! The step contract and the composable type handle.
//!
//! Everything in the engine satisfies one contract: take an [`Outcome`],
//! return an [`Outcome`], and describe yourself as an [`AstNode`]. A
//! [`Type`] is a cheap, cloneable, immutable handle around a step; all
//! composition operators are methods on `Type` that return new handles.
//! Published types are frozen by construction -- there is no mutation
//! API, so concurrent readers need no locking.

use crate::ast::{AstNode, AstTag};
use crate::combinators::{
    defer as make_deferred, And, Build, Check, Coerce, Constructor, Halting, MetadataStep, Not, Or,
    Transform, WithAst,
};
use crate::matcher::Matcher;
use crate::outcome::{ErrorTree, Outcome};
use crate::primitives::{MatchStep, Nothing, NullType, Present, Static, ValueEq};
use crate::rules::{self, UnsupportedRuleError};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// ──────────────────────────────────────────────
// Step contract
// ──────────────────────────────────────────────

/// The uniform contract: consume an outcome, produce an outcome, and
/// yield a shallow structural description.
pub trait Step: fmt::Debug + Send + Sync {
    fn apply(&self, input: Outcome) -> Outcome;
    fn ast(&self) -> AstNode;
}

// ──────────────────────────────────────────────
// Domain errors
// ──────────────────────────────────────────────

/// Raised by [`Type::parse`] when validation halts. Carries the full
/// structured error tree and the offending (possibly partially built)
/// value.
#[derive(Debug, thiserror::Error)]
#[error("{errors}")]
pub struct CastError {
    pub errors: ErrorTree,
    pub value: Value,
}

// ──────────────────────────────────────────────
// Type: the composable handle
// ──────────────────────────────────────────────

/// An immutable, shareable validation type. Cloning is cheap (one `Arc`
/// bump). Composition methods never mutate; they return new handles.
#[derive(Clone)]
pub struct Type {
    step: Arc<dyn Step>,
    name: Option<Arc<str>>,
}

impl Type {
    pub fn new(step: impl Step + 'static) -> Type {
        Type {
            step: Arc::new(step),
            name: None,
        }
    }

    // ── Execution surface ────────────────────────────────────────────

    pub fn apply(&self, input: Outcome) -> Outcome {
        self.step.apply(input)
    }

    /// Wrap a raw value and run it through this type. Never fails; the
    /// returned outcome reports validity.
    pub fn resolve(&self, value: impl Into<Value>) -> Outcome {
        self.apply(Outcome::wrap(value))
    }

    /// Run a value through this type, unwrapping the valid result or
    /// surfacing the structured errors as a [`CastError`].
    pub fn parse(&self, value: impl Into<Value>) -> Result<Value, CastError> {
        let (value, errors) = self.resolve(value).into_parts();
        match errors {
            None => Ok(value),
            Some(errors) => Err(CastError { errors, value }),
        }
    }

    pub fn ast(&self) -> AstNode {
        self.step.ast()
    }

    /// Merged metadata computed from the structural tree.
    pub fn metadata(&self) -> BTreeMap<String, Value> {
        crate::metadata::metadata(&self.ast())
    }

    /// Draft-08-compatible JSON Schema, including the `$schema` envelope.
    pub fn json_schema(&self) -> serde_json::Value {
        crate::json_schema::json_schema(self)
    }

    /// Display name: the explicitly assigned one, or a name derived from
    /// the structural tree.
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => self.ast().display_name(),
        }
    }

    /// Assign a stable display name. The first assignment wins; renaming
    /// an already named type is a no-op, so publishing is idempotent.
    pub fn named(self, name: &str) -> Type {
        if self.name.is_some() {
            return self;
        }
        Type {
            step: self.step,
            name: Some(Arc::from(name)),
        }
    }

    // ── Composition operators ────────────────────────────────────────

    /// Sequence: run `self`, and if still valid, feed the result to
    /// `next`. A halt short-circuits.
    pub fn then(self, next: impl Into<Type>) -> Type {
        Type::new(And::new(self, next.into()))
    }

    /// Union: try `self`; on halt, try `other` on the original input.
    /// If both halt, errors aggregate as an ordered list.
    pub fn or(self, other: impl Into<Type>) -> Type {
        Type::new(Or::new(self, other.into()))
    }

    /// Invert: valid becomes halted and vice versa.
    pub fn negate(self) -> Type {
        Type::new(Not::new(self, None))
    }

    /// Invert with a custom halt message.
    pub fn negate_with(self, message: &str) -> Type {
        Type::new(Not::new(self, Some(message.to_string())))
    }

    /// Default for missing input: on `Undefined`, produce `value`;
    /// otherwise delegate to `self` untouched.
    pub fn default(self, value: impl Into<Value>) -> Type {
        let value = value.into();
        let inner_ast = self.ast();
        let fallback = Type::new(Nothing).then(Type::new(Static::new(value.clone())));
        fallback.or(self).with_ast(
            AstNode::leaf(AstTag::Default)
                .with_attr("default", value)
                .with_children(vec![inner_ast]),
        )
    }

    /// Accept null as an alternative.
    pub fn nullable(self) -> Type {
        Type::new(NullType).or(self)
    }

    /// Reject undefined, null, and empty sized values.
    pub fn present(self) -> Type {
        Type::new(Present).then(self)
    }

    /// Unconditional mapping. `target` names the output type for
    /// metadata purposes.
    pub fn transform(
        self,
        target: &str,
        func: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Type {
        self.then(Type::new(Transform::new(target, func)))
    }

    /// Predicate gate: halt with `message` when the predicate rejects.
    pub fn check(
        self,
        message: &str,
        pred: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Type {
        self.then(Type::new(Check::new(message, pred)))
    }

    /// Infallible factory: construct an output value from the input.
    pub fn build(
        self,
        target: &str,
        func: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Type {
        self.then(Type::new(Build::new(target, func)))
    }

    /// Fallible factory: `Err` halts with a coercion-failure message.
    pub fn constructor(
        self,
        target: &str,
        func: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Type {
        self.then(Type::new(Constructor::new(target, func)))
    }

    /// Conditional mapping: when the matcher admits the value, apply the
    /// function; otherwise halt.
    pub fn coerce(
        self,
        matcher: impl Into<Matcher>,
        func: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Type {
        self.then(Type::new(Coerce::new(matcher.into(), func)))
    }

    /// Exact-equality gate against a literal value.
    pub fn value(self, expected: impl Into<Value>) -> Type {
        self.then(Type::new(ValueEq::new(expected.into())))
    }

    /// Gate on an additional matcher (class, range, regex, predicate, or
    /// literal).
    pub fn matching(self, matcher: impl Into<Matcher>) -> Type {
        self.then(Type::new(MatchStep::new(matcher.into())))
    }

    /// Attach metadata attributes via a pass-through step.
    pub fn meta<K, I>(self, attrs: I) -> Type
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let attrs: BTreeMap<String, Value> =
            attrs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.then(Type::new(MetadataStep::new(attrs)))
    }

    /// Turn every valid outcome into a halt with the given message. Used
    /// for branches that exist only to report a failure.
    pub fn halting(self, message: &str) -> Type {
        Type::new(Halting::new(self, message.to_string()))
    }

    /// Attach a named rule. Fails at construction time when the rule is
    /// not applicable to this type's declared base type (every branch of
    /// a union must be compatible).
    pub fn rule(self, name: &str, arg: impl Into<Matcher>) -> Result<Type, UnsupportedRuleError> {
        rules::attach(self, name, arg.into())
    }

    /// Attach several rules in order.
    pub fn rules<I>(self, specs: I) -> Result<Type, UnsupportedRuleError>
    where
        I: IntoIterator<Item = (&'static str, Matcher)>,
    {
        let mut typ = self;
        for (name, arg) in specs {
            typ = typ.rule(name, arg)?;
        }
        Ok(typ)
    }

    /// Restrict to an enumerated set of values (an `included_in` rule;
    /// surfaces as `enum` in JSON Schema).
    pub fn options<I>(self, values: I) -> Result<Type, UnsupportedRuleError>
    where
        I: IntoIterator<Item = Value>,
    {
        let values: Vec<Value> = values.into_iter().collect();
        self.rule("included_in", Matcher::Literal(Value::Array(values)))
    }

    /// Override the emitted structural tree. The runtime behavior is
    /// untouched.
    pub fn with_ast(self, node: AstNode) -> Type {
        Type::new(WithAst::new(self, node))
    }
}

impl Step for Type {
    fn apply(&self, input: Outcome) -> Outcome {
        Type::apply(self, input)
    }

    fn ast(&self) -> AstNode {
        Type::ast(self)
    }
}

/// Literal values used where a type is expected desugar to `Static`.
impl From<Value> for Type {
    fn from(value: Value) -> Type {
        Type::new(Static::new(value))
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.name())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Lazy reference to a type, for recursive definitions. The thunk runs
/// once, on first use; its target must be fully constructed by then.
pub fn defer(thunk: impl Fn() -> Type + Send + Sync + 'static) -> Type {
    make_deferred(thunk)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    #[test]
    fn resolve_wraps_and_applies() {
        let out = types::any().resolve(5);
        assert!(out.is_valid());
        assert_eq!(out.value(), &Value::Int(5));
    }

    #[test]
    fn parse_unwraps_or_raises() {
        assert_eq!(types::integer().parse(7).unwrap(), Value::Int(7));
        let err = types::integer().parse("seven").unwrap_err();
        assert_eq!(err.errors, ErrorTree::message("Must be a Integer"));
        assert_eq!(err.value, Value::Str("seven".into()));
    }

    #[test]
    fn then_associativity_on_valid_path() {
        let a = types::any().transform("Integer", |v| match v {
            Value::Int(i) => Value::Int(i + 1),
            other => other.clone(),
        });
        let b = types::any().transform("Integer", |v| match v {
            Value::Int(i) => Value::Int(i * 2),
            other => other.clone(),
        });
        let c = types::any().transform("Integer", |v| match v {
            Value::Int(i) => Value::Int(i - 3),
            other => other.clone(),
        });

        let left = a.clone().then(b.clone()).then(c.clone());
        let right = a.then(b.then(c));
        assert_eq!(left.resolve(10), right.resolve(10));
        assert_eq!(left.resolve(10).value(), &Value::Int(19));
    }

    #[test]
    fn or_is_left_biased() {
        let t = types::integer().or(types::string());
        assert_eq!(t.resolve(1).value(), &Value::Int(1));
        assert_eq!(t.resolve("x").value(), &Value::Str("x".into()));
    }

    #[test]
    fn halt_is_sticky_in_sequence() {
        let t = types::integer().then(types::string());
        let out = t.resolve("nope");
        assert!(out.is_halt());
        assert_eq!(out.errors(), Some(&ErrorTree::message("Must be a Integer")));
    }

    #[test]
    fn default_fills_undefined_only() {
        let t = types::string().default("Mr");
        assert_eq!(
            t.resolve(Value::Undefined).value(),
            &Value::Str("Mr".into())
        );
        assert_eq!(t.resolve("Ms").value(), &Value::Str("Ms".into()));
        assert!(t.resolve(42).is_halt());
    }

    #[test]
    fn negate_inverts() {
        let t = types::string().negate();
        assert!(t.resolve("hi").is_halt());
        assert!(t.resolve(1).is_valid());
    }

    #[test]
    fn negate_with_custom_message() {
        let t = types::string().negate_with("no strings here");
        assert_eq!(
            t.resolve("hi").errors(),
            Some(&ErrorTree::message("no strings here"))
        );
    }

    #[test]
    fn named_is_idempotent_and_first_wins() {
        let t = types::string().named("Username").named("Other");
        assert_eq!(t.name(), "Username");
        assert_eq!(types::string().name(), "String");
    }

    #[test]
    fn check_gates_on_predicate() {
        let t = types::integer().check("must be even", |v| {
            matches!(v, Value::Int(i) if i % 2 == 0)
        });
        assert!(t.resolve(4).is_valid());
        assert_eq!(
            t.resolve(3).errors(),
            Some(&ErrorTree::message("must be even"))
        );
    }

    #[test]
    fn halting_turns_valid_into_halt() {
        let t = types::string().halting("strings not welcome");
        assert_eq!(
            t.resolve("hi").errors(),
            Some(&ErrorTree::message("strings not welcome"))
        );
        // Already-halted outcomes pass through with their own errors.
        assert_eq!(
            t.resolve(1).errors(),
            Some(&ErrorTree::message("Must be a String"))
        );
    }

    #[test]
    fn value_gate_matches_exactly() {
        let t = types::string().value("ok");
        assert!(t.resolve("ok").is_valid());
        assert!(t.resolve("nope").is_halt());
    }

    #[test]
    fn deferred_recursion_terminates() {
        // A linked list: {value: Any, next: list | Null}
        fn list() -> Type {
            types::hash([
                ("value", types::any()),
                ("next", defer(list).nullable()),
            ])
            .into()
        }
        let input = Value::hash_of([
            ("value", Value::Int(1)),
            (
                "next",
                Value::hash_of([("value", Value::Int(2)), ("next", Value::Null)]),
            ),
        ]);
        let out = list().resolve(input.clone());
        assert!(out.is_valid());
        assert_eq!(out.value(), &input);
    }
}

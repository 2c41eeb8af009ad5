//! Composition steps: sequence, union, negation, deferral, and the
//! value-mapping wrappers.
//!
//! Sequencing short-circuits on the first halt. Union is left-biased and
//! aggregates branch errors in order when every branch fails. Deferral
//! memoizes its thunk on first use so recursive types resolve exactly
//! once.

use crate::ast::{AstNode, AstTag};
use crate::matcher::Matcher;
use crate::outcome::{ErrorTree, Outcome};
use crate::step::{Step, Type};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

// ──────────────────────────────────────────────
// And
// ──────────────────────────────────────────────

/// Sequence: left, then right. A halt on the left is terminal.
#[derive(Debug, Clone)]
pub struct And {
    left: Type,
    right: Type,
}

impl And {
    pub fn new(left: Type, right: Type) -> And {
        And { left, right }
    }
}

impl Step for And {
    fn apply(&self, input: Outcome) -> Outcome {
        let out = self.left.apply(input);
        if out.is_valid() {
            self.right.apply(out)
        } else {
            out
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::And).with_children(vec![self.left.ast(), self.right.ast()])
    }
}

// ──────────────────────────────────────────────
// Or
// ──────────────────────────────────────────────

/// Union: try left; on halt, try right on the original input. When both
/// halt, the errors join into an ordered list.
#[derive(Debug, Clone)]
pub struct Or {
    left: Type,
    right: Type,
}

impl Or {
    pub fn new(left: Type, right: Type) -> Or {
        Or { left, right }
    }
}

impl Step for Or {
    fn apply(&self, input: Outcome) -> Outcome {
        let attempt = self.left.apply(input.clone());
        if attempt.is_valid() {
            return attempt;
        }
        let fallback = self.right.apply(input);
        if fallback.is_valid() {
            return fallback;
        }
        let (_, left_errors) = attempt.into_parts();
        let (value, right_errors) = fallback.into_parts();
        let joined = ErrorTree::join(
            left_errors.unwrap_or_else(|| ErrorTree::message("invalid")),
            right_errors.unwrap_or_else(|| ErrorTree::message("invalid")),
        );
        Outcome::wrap(value).halt(joined)
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Or).with_children(vec![self.left.ast(), self.right.ast()])
    }
}

// ──────────────────────────────────────────────
// Not
// ──────────────────────────────────────────────

/// Inverts the inner step: valid becomes halted, halted becomes valid
/// with the original input value.
#[derive(Debug, Clone)]
pub struct Not {
    inner: Type,
    message: Option<String>,
}

impl Not {
    pub fn new(inner: Type, message: Option<String>) -> Not {
        Not { inner, message }
    }
}

impl Step for Not {
    fn apply(&self, input: Outcome) -> Outcome {
        let original = input.value().clone();
        let out = self.inner.apply(input);
        if out.is_valid() {
            let message = self
                .message
                .clone()
                .unwrap_or_else(|| format!("Must not be {}", self.inner.name()));
            out.halt(message)
        } else {
            out.valid(original)
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Not).with_children(vec![self.inner.ast()])
    }
}

// ──────────────────────────────────────────────
// Deferred
// ──────────────────────────────────────────────

/// Lazy reference to a type. The thunk resolves on first application and
/// is memoized; re-entrant calls after that hit the cached target. The
/// AST is a leaf so traversals of recursive types stay finite.
pub struct Deferred {
    thunk: Box<dyn Fn() -> Type + Send + Sync>,
    target: OnceLock<Type>,
}

impl Deferred {
    fn resolve_target(&self) -> &Type {
        self.target.get_or_init(|| (self.thunk)())
    }
}

impl Step for Deferred {
    fn apply(&self, input: Outcome) -> Outcome {
        self.resolve_target().apply(input)
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Any)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred")
    }
}

pub fn defer(thunk: impl Fn() -> Type + Send + Sync + 'static) -> Type {
    Type::new(Deferred {
        thunk: Box::new(thunk),
        target: OnceLock::new(),
    })
}

// ──────────────────────────────────────────────
// Value-mapping wrappers
// ──────────────────────────────────────────────

type MapFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;
type TryMapFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;
type PredFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Unconditional mapping, recording the output type name for metadata.
#[derive(Clone)]
pub struct Transform {
    target: String,
    func: MapFn,
}

impl Transform {
    pub fn new(target: &str, func: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Transform {
        Transform {
            target: target.to_string(),
            func: Arc::new(func),
        }
    }
}

impl Step for Transform {
    fn apply(&self, input: Outcome) -> Outcome {
        let mapped = (self.func)(input.value());
        input.valid(mapped)
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Transform).with_attr("type", self.target.as_str())
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transform({})", self.target)
    }
}

/// Predicate gate with a fixed halt message.
#[derive(Clone)]
pub struct Check {
    message: String,
    pred: PredFn,
}

impl Check {
    pub fn new(message: &str, pred: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Check {
        Check {
            message: message.to_string(),
            pred: Arc::new(pred),
        }
    }
}

impl Step for Check {
    fn apply(&self, input: Outcome) -> Outcome {
        if (self.pred)(input.value()) {
            input
        } else {
            input.halt(self.message.clone())
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Step).with_attr("step", "check")
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Check({:?})", self.message)
    }
}

/// Conditional mapping: apply the function when the matcher admits the
/// value, halt otherwise.
#[derive(Clone)]
pub struct Coerce {
    matcher: Matcher,
    func: MapFn,
}

impl Coerce {
    pub fn new(matcher: Matcher, func: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Coerce {
        Coerce {
            matcher,
            func: Arc::new(func),
        }
    }
}

impl Step for Coerce {
    fn apply(&self, input: Outcome) -> Outcome {
        if self.matcher.admits(input.value()) {
            let mapped = (self.func)(input.value());
            input.valid(mapped)
        } else {
            let message = format!("{} can't be coerced", input.value().inspect());
            input.halt(message)
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Step)
            .with_attr("step", "coerce")
            .with_attr("match", self.matcher.to_value())
    }
}

impl fmt::Debug for Coerce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coerce({})", self.matcher)
    }
}

/// Infallible factory: build the output value from the input.
#[derive(Clone)]
pub struct Build {
    target: String,
    func: MapFn,
}

impl Build {
    pub fn new(target: &str, func: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Build {
        Build {
            target: target.to_string(),
            func: Arc::new(func),
        }
    }
}

impl Step for Build {
    fn apply(&self, input: Outcome) -> Outcome {
        let built = (self.func)(input.value());
        input.valid(built)
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Build).with_attr("type", self.target.as_str())
    }
}

impl fmt::Debug for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Build({})", self.target)
    }
}

/// Fallible factory. An `Err` halts with a coercion-failure message
/// naming the target type.
#[derive(Clone)]
pub struct Constructor {
    target: String,
    func: TryMapFn,
}

impl Constructor {
    pub fn new(
        target: &str,
        func: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Constructor {
        Constructor {
            target: target.to_string(),
            func: Arc::new(func),
        }
    }
}

impl Step for Constructor {
    fn apply(&self, input: Outcome) -> Outcome {
        match (self.func)(input.value()) {
            Ok(built) => input.valid(built),
            Err(reason) => {
                let message = format!(
                    "{} can't be coerced into {} ({})",
                    input.value().inspect(),
                    self.target,
                    reason
                );
                input.halt(message)
            }
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Constructor).with_attr("type", self.target.as_str())
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constructor({})", self.target)
    }
}

/// Pass-through step that contributes metadata attributes.
#[derive(Debug, Clone)]
pub struct MetadataStep {
    attrs: BTreeMap<String, Value>,
}

impl MetadataStep {
    pub fn new(attrs: BTreeMap<String, Value>) -> MetadataStep {
        MetadataStep { attrs }
    }
}

impl Step for MetadataStep {
    fn apply(&self, input: Outcome) -> Outcome {
        input
    }

    fn ast(&self) -> AstNode {
        AstNode::new(AstTag::Metadata, self.attrs.clone(), Vec::new())
    }
}

/// Turns every valid outcome of the inner step into a halt. The AST is
/// the inner step's; this wrapper is behavioral only.
#[derive(Debug, Clone)]
pub struct Halting {
    inner: Type,
    message: String,
}

impl Halting {
    pub fn new(inner: Type, message: String) -> Halting {
        Halting { inner, message }
    }
}

impl Step for Halting {
    fn apply(&self, input: Outcome) -> Outcome {
        let out = self.inner.apply(input);
        if out.is_valid() {
            out.halt(self.message.clone())
        } else {
            out
        }
    }

    fn ast(&self) -> AstNode {
        self.inner.ast()
    }
}

/// Overrides the structural tree reported by the inner step.
#[derive(Debug, Clone)]
pub struct WithAst {
    inner: Type,
    node: AstNode,
}

impl WithAst {
    pub fn new(inner: Type, node: AstNode) -> WithAst {
        WithAst { inner, node }
    }
}

impl Step for WithAst {
    fn apply(&self, input: Outcome) -> Outcome {
        self.inner.apply(input)
    }

    fn ast(&self) -> AstNode {
        self.node.clone()
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;
    use crate::value::ValueKind;

    #[test]
    fn or_aggregates_both_branch_errors_in_order() {
        let t = types::integer().or(types::string());
        let out = t.resolve(true);
        assert!(out.is_halt());
        assert_eq!(
            out.errors(),
            Some(&ErrorTree::Group(vec![
                ErrorTree::message("Must be a Integer"),
                ErrorTree::message("Must be a String"),
            ]))
        );
    }

    #[test]
    fn nested_or_errors_stay_flat() {
        let t = types::integer().or(types::string()).or(types::boolean());
        let out = t.resolve(Value::Null);
        let Some(ErrorTree::Group(entries)) = out.errors() else {
            panic!("expected group")
        };
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn or_keeps_original_input_value_on_total_failure() {
        let t = types::integer().or(types::string());
        let out = t.resolve(true);
        assert_eq!(out.value(), &Value::Bool(true));
    }

    #[test]
    fn deferred_memoizes_its_target() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let t = defer(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            types::integer()
        });
        assert!(t.resolve(1).is_valid());
        assert!(t.resolve(2).is_valid());
        assert!(t.resolve("x").is_halt());
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deferred_ast_is_a_leaf() {
        let t = defer(types::integer);
        assert_eq!(t.ast(), AstNode::leaf(AstTag::Any));
    }

    #[test]
    fn coerce_maps_matching_values() {
        let t = types::any().coerce(ValueKind::Str, |v| match v {
            Value::Str(s) => Value::Str(s.to_uppercase()),
            other => other.clone(),
        });
        assert_eq!(t.resolve("hi").value(), &Value::Str("HI".into()));
        let out = t.resolve(5);
        assert_eq!(out.errors().unwrap().to_string(), "5 can't be coerced");
    }

    #[test]
    fn constructor_halts_on_err() {
        let t = types::string().constructor("Integer", |v| match v {
            Value::Str(s) => s
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| e.to_string()),
            other => Ok(other.clone()),
        });
        assert_eq!(t.resolve("42").value(), &Value::Int(42));
        let out = t.resolve("nope");
        assert!(out
            .errors()
            .unwrap()
            .to_string()
            .starts_with("\"nope\" can't be coerced into Integer"));
    }

    #[test]
    fn metadata_step_is_identity() {
        let t = types::integer().meta([("foo", Value::Str("bar".into()))]);
        assert_eq!(t.resolve(1).value(), &Value::Int(1));
    }
}

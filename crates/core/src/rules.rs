//! Named validation rules and the process-wide rule registry.
//!
//! A rule is data: a predicate over `(value, argument)`, a message
//! formatter, and the set of base-type tags it applies to. Rules attach
//! to a type as a `policy` step; compatibility is enforced at
//! construction time against the type's declared base type, and a union
//! base must be compatible on every branch.
//!
//! The registry is populated with the built-ins on first touch and is
//! read-mostly afterwards. Custom rules should be registered during
//! startup, before types are published.

use crate::ast::{AstNode, AstTag};
use crate::matcher::Matcher;
use crate::outcome::Outcome;
use crate::step::{Step, Type};
use crate::value::Value;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

// ──────────────────────────────────────────────
// Rule definitions
// ──────────────────────────────────────────────

type RulePredicate = Arc<dyn Fn(&Value, &Matcher) -> bool + Send + Sync>;
type RuleMessage = Arc<dyn Fn(&Matcher) -> String + Send + Sync>;

/// One registered rule.
#[derive(Clone)]
pub struct RuleDef {
    predicate: RulePredicate,
    message: RuleMessage,
    /// Base-type tags this rule applies to. `None` means every type.
    applies_to: Option<Vec<String>>,
}

impl RuleDef {
    pub fn new(
        predicate: impl Fn(&Value, &Matcher) -> bool + Send + Sync + 'static,
        message: impl Fn(&Matcher) -> String + Send + Sync + 'static,
    ) -> RuleDef {
        RuleDef {
            predicate: Arc::new(predicate),
            message: Arc::new(message),
            applies_to: None,
        }
    }

    pub fn applies_to<S, I>(mut self, tags: I) -> RuleDef
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.applies_to = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

impl fmt::Debug for RuleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleDef(applies_to: {:?})", self.applies_to)
    }
}

/// Attaching a rule can fail only at construction time.
#[derive(Debug, thiserror::Error)]
pub enum UnsupportedRuleError {
    #[error("unknown rule '{name}'")]
    Unknown { name: String },
    #[error("rule '{name}' does not apply to type {target}")]
    Incompatible { name: String, target: String },
}

// ──────────────────────────────────────────────
// Registry
// ──────────────────────────────────────────────

static REGISTRY: Lazy<RwLock<BTreeMap<String, RuleDef>>> =
    Lazy::new(|| RwLock::new(builtin_rules()));

/// Register (or replace) a rule. Meant for startup, before any type
/// using it is published.
pub fn register_rule(name: &str, def: RuleDef) {
    REGISTRY
        .write()
        .expect("rule registry poisoned")
        .insert(name.to_string(), def);
}

fn lookup(name: &str) -> Option<RuleDef> {
    REGISTRY
        .read()
        .expect("rule registry poisoned")
        .get(name)
        .cloned()
}

// ──────────────────────────────────────────────
// Attachment
// ──────────────────────────────────────────────

/// The base-type tags a type declares, read from its merged metadata.
/// A union declares one tag per branch.
fn base_tags(typ: &Type) -> Vec<String> {
    match typ.metadata().get("type") {
        Some(Value::Str(tag)) => vec![tag.clone()],
        Some(Value::Array(tags)) => tags
            .iter()
            .map(|tag| match tag {
                Value::Str(s) => s.clone(),
                other => other.inspect(),
            })
            .collect(),
        _ => vec!["Any".to_string()],
    }
}

pub(crate) fn attach(
    typ: Type,
    name: &str,
    arg: Matcher,
) -> Result<Type, UnsupportedRuleError> {
    let def = lookup(name).ok_or_else(|| UnsupportedRuleError::Unknown {
        name: name.to_string(),
    })?;

    if let Some(allowed) = &def.applies_to {
        for tag in base_tags(&typ) {
            if !allowed.iter().any(|t| *t == tag) {
                return Err(UnsupportedRuleError::Incompatible {
                    name: name.to_string(),
                    target: tag,
                });
            }
        }
    }

    Ok(Type::new(RuleStep {
        inner: typ,
        name: name.to_string(),
        arg,
        def,
    }))
}

/// A rule applied after its inner type: validate, then test the
/// predicate.
#[derive(Debug, Clone)]
struct RuleStep {
    inner: Type,
    name: String,
    arg: Matcher,
    def: RuleDef,
}

impl Step for RuleStep {
    fn apply(&self, input: Outcome) -> Outcome {
        let out = self.inner.apply(input);
        if out.is_halt() {
            return out;
        }
        if (self.def.predicate)(out.value(), &self.arg) {
            out
        } else {
            let message = (self.def.message)(&self.arg);
            out.halt(message)
        }
    }

    fn ast(&self) -> AstNode {
        AstNode::leaf(AstTag::Policy)
            .with_attr("policy_name", self.name.as_str())
            .with_attr("arg", self.arg.to_value())
            .with_children(vec![self.inner.ast()])
    }
}

// ──────────────────────────────────────────────
// Built-in rules
// ──────────────────────────────────────────────

const ORDERED_TAGS: [&str; 5] = ["Integer", "Numeric", "Decimal", "Array", "String"];

fn literal<'a>(arg: &'a Matcher) -> Option<&'a Value> {
    match arg {
        Matcher::Literal(v) => Some(v),
        _ => None,
    }
}

fn compare(value: &Value, arg: &Matcher, accept: fn(std::cmp::Ordering) -> bool) -> bool {
    literal(arg)
        .and_then(|expected| value.compare(expected))
        .map(accept)
        .unwrap_or(false)
}

fn builtin_rules() -> BTreeMap<String, RuleDef> {
    let mut rules = BTreeMap::new();

    rules.insert(
        "eq".to_string(),
        RuleDef::new(
            |v, arg| match arg {
                Matcher::Literal(expected) => v == expected,
                other => other.admits(v),
            },
            |arg| format!("must be equal to {}", arg),
        ),
    );
    rules.insert(
        "not_eq".to_string(),
        RuleDef::new(
            |v, arg| match arg {
                Matcher::Literal(expected) => v != expected,
                other => !other.admits(v),
            },
            |arg| format!("must not be equal to {}", arg),
        ),
    );

    rules.insert(
        "gt".to_string(),
        RuleDef::new(
            |v, arg| compare(v, arg, std::cmp::Ordering::is_gt),
            |arg| format!("must be greater than {}", arg),
        )
        .applies_to(ORDERED_TAGS),
    );
    rules.insert(
        "gte".to_string(),
        RuleDef::new(
            |v, arg| compare(v, arg, std::cmp::Ordering::is_ge),
            |arg| format!("must be greater or equal to {}", arg),
        )
        .applies_to(ORDERED_TAGS),
    );
    rules.insert(
        "lt".to_string(),
        RuleDef::new(
            |v, arg| compare(v, arg, std::cmp::Ordering::is_lt),
            |arg| format!("must be less than {}", arg),
        )
        .applies_to(ORDERED_TAGS),
    );
    rules.insert(
        "lte".to_string(),
        RuleDef::new(
            |v, arg| compare(v, arg, std::cmp::Ordering::is_le),
            |arg| format!("must be less or equal to {}", arg),
        )
        .applies_to(ORDERED_TAGS),
    );

    rules.insert(
        "match".to_string(),
        RuleDef::new(
            |v, arg| match (v, arg) {
                // A range over an array constrains its size.
                (Value::Array(items), Matcher::Range { .. }) => {
                    arg.admits(&Value::Int(items.len() as i64))
                }
                _ => arg.admits(v),
            },
            |arg| format!("must match {}", arg),
        )
        .applies_to(["String", "Integer", "Numeric", "Decimal", "Array"]),
    );

    rules.insert(
        "included_in".to_string(),
        RuleDef::new(
            |v, arg| match literal(arg) {
                Some(Value::Array(options)) => options.contains(v),
                _ => false,
            },
            |arg| format!("must be included in {}", arg),
        ),
    );
    rules.insert(
        "excluded_from".to_string(),
        RuleDef::new(
            |v, arg| match literal(arg) {
                Some(Value::Array(options)) => !options.contains(v),
                _ => false,
            },
            |arg| format!("must be excluded from {}", arg),
        ),
    );

    rules.insert(
        "respond_to".to_string(),
        RuleDef::new(
            |v, arg| match literal(arg) {
                Some(Value::Str(method)) => v.responds_to(method),
                Some(Value::Array(methods)) => methods.iter().all(|m| match m {
                    Value::Str(method) => v.responds_to(method),
                    _ => false,
                }),
                _ => false,
            },
            |arg| format!("must respond to {}", arg),
        ),
    );

    rules.insert(
        "size".to_string(),
        RuleDef::new(
            |v, arg| match v.size() {
                Some(size) => {
                    let size = Value::Int(size as i64);
                    match arg {
                        Matcher::Literal(expected) => &size == expected,
                        other => other.admits(&size),
                    }
                }
                None => false,
            },
            |arg| format!("must have size {}", arg),
        )
        .applies_to(["String", "Array", "Hash"]),
    );

    rules
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

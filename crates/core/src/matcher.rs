//! Polymorphic match predicates.
//!
//! A [`Matcher`] is the explicit tagged union behind every "does this
//! value match X" question: class membership for kinds, containment for
//! numeric ranges, regex match for strings, invocation for named
//! predicates, equality for literal values. Dispatch is a single `admits`
//! method -- no trait objects, no downcasting.

use crate::value::{Value, ValueKind};
use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

/// Shared predicate function used by [`Matcher::Predicate`].
pub type PredicateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

// ──────────────────────────────────────────────
// Matcher
// ──────────────────────────────────────────────

#[derive(Clone)]
pub enum Matcher {
    /// Class membership: the value's kind equals the given kind.
    Kind(ValueKind),
    /// Numeric containment. Bounds are independent, so `..=10`, `5..`,
    /// and `5..=10` are all expressible. Admits both ints and decimals.
    Range {
        min: Bound<Decimal>,
        max: Bound<Decimal>,
    },
    /// Regex match against string values.
    Regex(Arc<Regex>),
    /// A named predicate function. The name is display-only.
    Predicate { name: String, func: PredicateFn },
    /// Equality against a literal value.
    Literal(Value),
}

impl Matcher {
    pub fn regex(pattern: &str) -> Result<Matcher, regex::Error> {
        Ok(Matcher::Regex(Arc::new(Regex::new(pattern)?)))
    }

    pub fn int_range(min: Option<i64>, max: Option<i64>) -> Matcher {
        Matcher::Range {
            min: min.map_or(Bound::Unbounded, |n| Bound::Included(Decimal::from(n))),
            max: max.map_or(Bound::Unbounded, |n| Bound::Included(Decimal::from(n))),
        }
    }

    pub fn decimal_range(min: Option<Decimal>, max: Option<Decimal>) -> Matcher {
        Matcher::Range {
            min: min.map_or(Bound::Unbounded, Bound::Included),
            max: max.map_or(Bound::Unbounded, Bound::Included),
        }
    }

    pub fn predicate(
        name: &str,
        func: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Matcher {
        Matcher::Predicate {
            name: name.to_string(),
            func: Arc::new(func),
        }
    }

    /// Case-equality dispatch: does this matcher admit the value?
    pub fn admits(&self, value: &Value) -> bool {
        match self {
            Matcher::Kind(kind) => value.kind() == *kind,
            Matcher::Range { min, max } => {
                let n = match value {
                    Value::Int(i) => Decimal::from(*i),
                    Value::Decimal(d) => *d,
                    _ => return false,
                };
                let above_min = match min {
                    Bound::Included(lo) => n >= *lo,
                    Bound::Excluded(lo) => n > *lo,
                    Bound::Unbounded => true,
                };
                let below_max = match max {
                    Bound::Included(hi) => n <= *hi,
                    Bound::Excluded(hi) => n < *hi,
                    Bound::Unbounded => true,
                };
                above_min && below_max
            }
            Matcher::Regex(re) => match value {
                Value::Str(s) => re.is_match(s),
                _ => false,
            },
            Matcher::Predicate { func, .. } => func(value),
            Matcher::Literal(expected) => value == expected,
        }
    }

    /// The matcher rendered as a value, for AST attributes and rule
    /// metadata. Kinds and literals keep their natural form; ranges,
    /// regexes, and predicates degrade to their display string.
    pub fn to_value(&self) -> Value {
        match self {
            Matcher::Kind(kind) => Value::Str(kind.name().to_string()),
            Matcher::Literal(v) => v.clone(),
            other => Value::Str(other.to_string()),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Kind(kind) => write!(f, "{}", kind.name()),
            Matcher::Range { min, max } => {
                match min {
                    Bound::Included(lo) | Bound::Excluded(lo) => write!(f, "{}", lo)?,
                    Bound::Unbounded => {}
                }
                write!(f, "..")?;
                match max {
                    Bound::Included(hi) => write!(f, "={}", hi),
                    Bound::Excluded(hi) => write!(f, "{}", hi),
                    Bound::Unbounded => Ok(()),
                }
            }
            Matcher::Regex(re) => write!(f, "/{}/", re.as_str()),
            Matcher::Predicate { name, .. } => write!(f, "#{}", name),
            Matcher::Literal(v) => write!(f, "{}", v.inspect()),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({})", self)
    }
}

impl From<Value> for Matcher {
    fn from(v: Value) -> Self {
        Matcher::Literal(v)
    }
}

impl From<ValueKind> for Matcher {
    fn from(kind: ValueKind) -> Self {
        Matcher::Kind(kind)
    }
}

impl From<i64> for Matcher {
    fn from(n: i64) -> Self {
        Matcher::Literal(Value::Int(n))
    }
}

impl From<&str> for Matcher {
    fn from(s: &str) -> Self {
        Matcher::Literal(Value::Str(s.to_string()))
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

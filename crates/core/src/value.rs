//! Runtime value model.
//!
//! Every step in the engine consumes and produces `Value`s. The enum is
//! deliberately small: scalars, exact decimals, ordered arrays, and
//! insertion-ordered hashes. All numeric work goes through
//! `rust_decimal::Decimal` -- never `f64`.
//!
//! `Value::Undefined` is the "no value was provided" sentinel. It is
//! distinct from `Null`: a hash field whose key is absent reads as
//! `Undefined`, while an explicit JSON `null` reads as `Null`.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::cmp::Ordering;
use std::fmt;

// ──────────────────────────────────────────────
// Value
// ──────────────────────────────────────────────

/// A dynamically typed input or output value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value was provided. Never present inside arrays or hashes.
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Str(String),
    Array(Vec<Value>),
    /// Insertion-ordered mapping. Equality ignores entry order.
    Hash(IndexMap<String, Value>),
}

/// The kind of a [`Value`], used for class-membership matching and as the
/// base-type tag rules dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Undefined,
    Null,
    Bool,
    Int,
    Decimal,
    Str,
    Array,
    Hash,
}

impl ValueKind {
    /// Display name, also the base-type tag seen by the rule registry.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Undefined => "Undefined",
            ValueKind::Null => "Null",
            ValueKind::Bool => "Boolean",
            ValueKind::Int => "Integer",
            ValueKind::Decimal => "Decimal",
            ValueKind::Str => "String",
            ValueKind::Array => "Array",
            ValueKind::Hash => "Hash",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Str(_) => ValueKind::Str,
            Value::Array(_) => ValueKind::Array,
            Value::Hash(_) => ValueKind::Hash,
        }
    }

    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Number of characters, elements, or entries. `None` for unsized kinds.
    pub fn size(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            Value::Hash(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// True for sized values with zero elements. Unsized kinds are never
    /// empty.
    pub fn is_empty(&self) -> bool {
        self.size() == Some(0)
    }

    /// Capability check: does this value support the named operation?
    ///
    /// This stands in for duck-typed method probing. The capability table
    /// maps well-known names to the kinds that support them; unknown names
    /// are unsupported by every kind.
    pub fn responds_to(&self, name: &str) -> bool {
        let kind = self.kind();
        match name {
            "size" | "length" | "empty" => {
                matches!(kind, ValueKind::Str | ValueKind::Array | ValueKind::Hash)
            }
            "each" => matches!(kind, ValueKind::Array | ValueKind::Hash),
            "keys" | "values" | "fetch" => matches!(kind, ValueKind::Hash),
            "first" | "last" | "push" => matches!(kind, ValueKind::Array),
            "chars" | "upcase" | "downcase" | "strip" => matches!(kind, ValueKind::Str),
            "abs" | "succ" => matches!(kind, ValueKind::Int | ValueKind::Decimal),
            "round" | "floor" | "ceil" => matches!(kind, ValueKind::Int | ValueKind::Decimal),
            _ => false,
        }
    }

    /// Ordered comparison between values of comparable kinds.
    ///
    /// Integers and decimals compare numerically across kinds. Strings
    /// compare lexicographically, arrays element-wise. Everything else is
    /// unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Decimal(b)) => Some(Decimal::from(*a).cmp(b)),
            (Value::Decimal(a), Value::Int(b)) => Some(a.cmp(&Decimal::from(*b))),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        non_eq => return Some(non_eq),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// Debug-style rendering used inside error messages: strings quoted,
    /// everything else in its literal form.
    pub fn inspect(&self) -> String {
        match self {
            Value::Undefined => "Undefined".to_string(),
            Value::Null => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Str(s) => format!("{:?}", s),
            Value::Array(items) => {
                let inner: Vec<String> = items.iter().map(Value::inspect).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Hash(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.inspect()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
        }
    }

    /// Build a hash value from key/value pairs, preserving order.
    pub fn hash_of<K, I>(pairs: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Hash(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Read a hash entry. Non-hashes and absent keys read as `Undefined`.
    pub fn get(&self, key: &str) -> &Value {
        match self {
            Value::Hash(entries) => entries.get(key).unwrap_or(&Value::Undefined),
            _ => &Value::Undefined,
        }
    }

    // ── JSON conversion ──────────────────────────────────────────────

    /// Convert from JSON. Numbers become `Int` when integral, `Decimal`
    /// otherwise; objects preserve key order.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    // Parse through the decimal's string form to keep the
                    // printed digits exact.
                    n.to_string()
                        .parse::<Decimal>()
                        .map(Value::Decimal)
                        .unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Value::Hash(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON. `Undefined` has no JSON form and degrades to null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::json!(i),
            Value::Decimal(d) => decimal_to_json(d),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Hash(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

// Decimals pass through their exact string form to keep printed digits
// stable in the JSON output.
fn decimal_to_json(d: &Decimal) -> serde_json::Value {
    d.to_string()
        .parse::<serde_json::Number>()
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            other => f.write_str(&other.inspect()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Decimal(d) => Serialize::serialize(d, serializer),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Hash(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

// ── Conversions from common Rust types ───────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Value::Hash(entries)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_is_distinct_from_null() {
        assert_ne!(Value::Undefined, Value::Null);
        assert!(Value::Undefined.is_undefined());
        assert!(!Value::Null.is_undefined());
    }

    #[test]
    fn hash_preserves_insertion_order() {
        let v = Value::hash_of([("b", Value::Int(1)), ("a", Value::Int(2))]);
        let Value::Hash(entries) = &v else {
            panic!("expected hash")
        };
        let keys: Vec<&str> = entries.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn hash_equality_ignores_order() {
        let a = Value::hash_of([("x", Value::Int(1)), ("y", Value::Int(2))]);
        let b = Value::hash_of([("y", Value::Int(2)), ("x", Value::Int(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn emptiness_only_for_sized_kinds() {
        assert!(Value::Str(String::new()).is_empty());
        assert!(Value::Array(vec![]).is_empty());
        assert!(Value::Hash(IndexMap::new()).is_empty());
        assert!(!Value::Int(0).is_empty());
        assert!(!Value::Null.is_empty());
    }

    #[test]
    fn cross_kind_numeric_comparison() {
        let d: Decimal = "2.5".parse().unwrap();
        assert_eq!(
            Value::Int(2).compare(&Value::Decimal(d)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Str("b".into()).compare(&Value::Str("a".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Int(1).compare(&Value::Str("1".into())), None);
    }

    #[test]
    fn responds_to_capability_table() {
        assert!(Value::Str("hi".into()).responds_to("size"));
        assert!(Value::Array(vec![]).responds_to("each"));
        assert!(Value::hash_of([("a", Value::Int(1))]).responds_to("keys"));
        assert!(!Value::Int(1).responds_to("size"));
        assert!(!Value::Str("hi".into()).responds_to("no_such_thing"));
    }

    #[test]
    fn json_round_trip() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"name":"Ada","tags":["x"],"age":36,"score":1.5}"#).unwrap();
        let v = Value::from_json(&json);
        assert_eq!(v.get("name"), &Value::Str("Ada".into()));
        assert_eq!(v.get("age"), &Value::Int(36));
        assert_eq!(
            v.get("score"),
            &Value::Decimal("1.5".parse::<Decimal>().unwrap())
        );
        assert_eq!(v.to_json(), json);
    }

    #[test]
    fn inspect_quotes_strings() {
        assert_eq!(Value::Str("hi".into()).inspect(), "\"hi\"");
        assert_eq!(Value::Int(42).inspect(), "42");
        assert_eq!(
            Value::Array(vec![Value::Int(1), Value::Str("a".into())]).inspect(),
            "[1, \"a\"]"
        );
    }
}

//! Ready-made types: the vocabulary users compose with.
//!
//! Strict types admit exactly their own kind. The `lax` family widens
//! the funnel with coercions (string-to-number parsing, numeric
//! truncation, stringification) while producing the same output kinds
//! as their strict counterparts.

use crate::array::ArrayType;
use crate::hash::{HashSchema, Key};
use crate::hash_map::HashMapType;
use crate::matcher::Matcher;
use crate::primitives::{Any, BooleanType, Interface, MatchStep, Nothing, NullType, Static, ValueEq};
use crate::step::Type;
use crate::stream::StreamType;
use crate::tuple::TupleType;
use crate::value::{Value, ValueKind};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

// ──────────────────────────────────────────────
// Strict types
// ──────────────────────────────────────────────

/// The identity type: admits anything, changes nothing.
pub fn any() -> Type {
    Type::new(Any)
}

/// Admits only the Undefined sentinel.
pub fn undefined() -> Type {
    Type::new(Nothing)
}

pub fn null() -> Type {
    Type::new(NullType)
}

pub fn string() -> Type {
    Type::new(MatchStep::new(ValueKind::Str))
}

pub fn integer() -> Type {
    Type::new(MatchStep::new(ValueKind::Int))
}

pub fn decimal() -> Type {
    Type::new(MatchStep::new(ValueKind::Decimal))
}

/// Integer or decimal.
pub fn numeric() -> Type {
    integer().or(decimal())
}

pub fn boolean() -> Type {
    Type::new(BooleanType)
}

/// Exact-equality gate against one literal.
pub fn value(expected: impl Into<Value>) -> Type {
    Type::new(ValueEq::new(expected))
}

/// Always produces the given value, whatever arrives.
pub fn static_value(fixed: impl Into<Value>) -> Type {
    Type::new(Static::new(fixed))
}

/// Capability check over well-known operation names.
pub fn interface<S, I>(methods: I) -> Type
where
    S: Into<String>,
    I: IntoIterator<Item = S>,
{
    Type::new(Interface::new(methods))
}

pub fn array(element: impl Into<Type>) -> ArrayType {
    ArrayType::new(element)
}

pub fn tuple<T, I>(types: I) -> TupleType
where
    T: Into<Type>,
    I: IntoIterator<Item = T>,
{
    TupleType::new(types)
}

pub fn stream(element: impl Into<Type>) -> StreamType {
    StreamType::new(element)
}

pub fn hash<K, T, I>(fields: I) -> HashSchema
where
    K: Into<Key>,
    T: Into<Type>,
    I: IntoIterator<Item = (K, T)>,
{
    HashSchema::schema(fields)
}

/// A bare hash gate: any hash passes through unprojected.
pub fn any_hash() -> HashSchema {
    HashSchema::new()
}

pub fn hash_map(key_type: impl Into<Type>, value_type: impl Into<Type>) -> HashMapType {
    HashMapType::new(key_type, value_type)
}

// ──────────────────────────────────────────────
// Gated strings
// ──────────────────────────────────────────────

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

static UUID_V4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("uuid pattern compiles")
});

pub fn email() -> Type {
    string().matching(Matcher::Regex(std::sync::Arc::new(EMAIL.clone())))
}

pub fn uuid_v4() -> Type {
    string().matching(Matcher::Regex(std::sync::Arc::new(UUID_V4.clone())))
}

// ──────────────────────────────────────────────
// Lax (coercive) types
// ──────────────────────────────────────────────

pub mod lax {
    use super::*;

    /// Parse a human-formatted number: thousands separators (`,` and
    /// `_`) are stripped before parsing.
    fn parse_decimal(s: &str) -> Result<Decimal, String> {
        let cleaned: String = s.chars().filter(|c| *c != ',' && *c != '_').collect();
        cleaned
            .trim()
            .parse::<Decimal>()
            .map_err(|e| e.to_string())
    }

    /// Integer with a wider funnel: decimals truncate, numeric strings
    /// (including `"113,222.10"`) parse and truncate.
    pub fn integer() -> Type {
        super::integer()
            .or(super::decimal().transform("Integer", |v| match v {
                Value::Decimal(d) => d
                    .trunc()
                    .to_i64()
                    .map(Value::Int)
                    .unwrap_or_else(|| v.clone()),
                other => other.clone(),
            }))
            .or(super::string().constructor("Integer", |v| match v {
                Value::Str(s) => {
                    let d = parse_decimal(s)?;
                    d.trunc()
                        .to_i64()
                        .map(Value::Int)
                        .ok_or_else(|| "out of range".to_string())
                }
                other => Ok(other.clone()),
            }))
    }

    /// Decimal accepting integers and numeric strings.
    pub fn decimal() -> Type {
        super::decimal()
            .or(super::integer().transform("Decimal", |v| match v {
                Value::Int(i) => Value::Decimal(Decimal::from(*i)),
                other => other.clone(),
            }))
            .or(super::string().constructor("Decimal", |v| match v {
                Value::Str(s) => parse_decimal(s).map(Value::Decimal),
                other => Ok(other.clone()),
            }))
    }

    /// String accepting scalar stringification.
    pub fn string() -> Type {
        super::string().or(super::integer()
            .or(super::decimal())
            .or(super::boolean())
            .transform("String", |v| Value::Str(v.to_string())))
    }

    /// Boolean accepting its string spellings.
    pub fn boolean() -> Type {
        super::boolean().or(super::value("true")
            .or(super::value("false"))
            .transform("Boolean", |v| match v {
                Value::Str(s) => Value::Bool(s == "true"),
                other => other.clone(),
            }))
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

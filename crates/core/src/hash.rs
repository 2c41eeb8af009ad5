//! Schema-mode hashes: declared keys, each with its own field type.
//!
//! Application walks the declared fields in order, reading absent keys
//! as `Undefined` so field types (and their defaults) decide what a
//! missing value means. Input keys that were never declared are dropped
//! from the output. A schema with no declared fields is a plain hash
//! gate and passes its input through untouched.

use crate::ast::{AstNode, AstTag};
use crate::outcome::{ErrorTree, Outcome};
use crate::step::{Step, Type};
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};

// ──────────────────────────────────────────────
// Key
// ──────────────────────────────────────────────

/// A declared field: a name plus an optional flag. Equality and hashing
/// ignore the flag, so `age` and `age?` address the same slot when
/// schemas merge.
#[derive(Debug, Clone)]
pub struct Key {
    pub name: String,
    pub optional: bool,
}

impl Key {
    pub fn required(name: &str) -> Key {
        Key {
            name: name.to_string(),
            optional: false,
        }
    }

    pub fn opt(name: &str) -> Key {
        Key {
            name: name.to_string(),
            optional: true,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Key) -> bool {
        self.name == other.name
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "{}?", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// `"age"` declares a required key; a trailing `?` (`"age?"`) declares
/// an optional one.
impl From<&str> for Key {
    fn from(declared: &str) -> Key {
        match declared.strip_suffix('?') {
            Some(name) => Key::opt(name),
            None => Key::required(declared),
        }
    }
}

// ──────────────────────────────────────────────
// HashSchema
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
struct FieldDef {
    key: Key,
    typ: Type,
}

/// A hash with declared, ordered fields.
#[derive(Debug, Clone, Default)]
pub struct HashSchema {
    fields: IndexMap<String, FieldDef>,
}

impl HashSchema {
    /// An empty schema: a bare hash gate.
    pub fn new() -> HashSchema {
        HashSchema::default()
    }

    pub fn schema<K, T, I>(fields: I) -> HashSchema
    where
        K: Into<Key>,
        T: Into<Type>,
        I: IntoIterator<Item = (K, T)>,
    {
        let mut out = HashSchema::new();
        for (key, typ) in fields {
            out = out.field(key, typ);
        }
        out
    }

    /// Declare (or redeclare) one field, preserving first-declared
    /// position.
    pub fn field(mut self, key: impl Into<Key>, typ: impl Into<Type>) -> HashSchema {
        let key = key.into();
        let def = FieldDef {
            key: key.clone(),
            typ: typ.into(),
        };
        self.fields.insert(key.name, def);
        self
    }

    pub fn keys(&self) -> Vec<&Key> {
        self.fields.values().map(|def| &def.key).collect()
    }

    pub fn field_type(&self, name: &str) -> Option<&Type> {
        self.fields.get(name).map(|def| &def.typ)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge: union of keys in left-then-new order. On a shared key the
    /// right type wins, and the field stays optional only when both
    /// sides declared it optional.
    pub fn merge(&self, other: &HashSchema) -> HashSchema {
        let mut fields = self.fields.clone();
        for (name, right) in &other.fields {
            let merged = match fields.get(name) {
                Some(left) => FieldDef {
                    key: Key {
                        name: name.clone(),
                        optional: left.key.optional && right.key.optional,
                    },
                    typ: right.typ.clone(),
                },
                None => right.clone(),
            };
            fields.insert(name.clone(), merged);
        }
        HashSchema { fields }
    }

    /// Intersection: only keys declared on both sides, typed by the
    /// right operand.
    pub fn intersect(&self, other: &HashSchema) -> HashSchema {
        let fields = other
            .fields
            .iter()
            .filter(|(name, _)| self.fields.contains_key(*name))
            .map(|(name, def)| (name.clone(), def.clone()))
            .collect();
        HashSchema { fields }
    }

    /// Union: a value satisfying either schema.
    pub fn union(&self, other: &HashSchema) -> Type {
        Type::from(self.clone()).or(other.clone())
    }

    /// Discriminated union over this hash: dispatch on the literal value
    /// at `key` to one of the variants. See [`crate::tagged_hash`].
    pub fn tagged_by<I>(
        &self,
        key: &str,
        variants: I,
    ) -> Result<Type, crate::tagged_hash::TaggedHashError>
    where
        I: IntoIterator<Item = HashSchema>,
    {
        crate::tagged_hash::TaggedHash::new(self.clone(), key, variants).map(Type::new)
    }
}

impl Step for HashSchema {
    fn apply(&self, input: Outcome) -> Outcome {
        let entries = match input.value() {
            Value::Hash(entries) => entries.clone(),
            _ => return input.halt("Must be a Hash"),
        };
        if self.fields.is_empty() {
            return input;
        }

        let mut output: IndexMap<String, Value> = IndexMap::new();
        let mut errors: IndexMap<String, ErrorTree> = IndexMap::new();

        for (name, def) in &self.fields {
            let provided = entries.contains_key(name);
            let item = entries.get(name).cloned().unwrap_or(Value::Undefined);
            let (value, errs) = def.typ.resolve(item).into_parts();
            match errs {
                None => {
                    // Defaults may materialize values for absent keys;
                    // a valid Undefined (e.g. an optional untyped field)
                    // stays out of the output.
                    if !value.is_undefined() {
                        output.insert(name.clone(), value);
                    }
                }
                Some(errs) => {
                    if def.key.optional && !provided {
                        continue;
                    }
                    errors.insert(name.clone(), errs);
                }
            }
        }

        if errors.is_empty() {
            input.valid(Value::Hash(output))
        } else {
            input.halt_with(ErrorTree::Fields(errors), Value::Hash(output))
        }
    }

    fn ast(&self) -> AstNode {
        let keys: Vec<Value> = self
            .fields
            .values()
            .map(|def| Value::Str(def.key.name.clone()))
            .collect();
        let optional: Vec<Value> = self
            .fields
            .values()
            .filter(|def| def.key.optional)
            .map(|def| Value::Str(def.key.name.clone()))
            .collect();
        let children = self.fields.values().map(|def| def.typ.ast()).collect();
        AstNode::leaf(AstTag::Hash)
            .with_attr("keys", Value::Array(keys))
            .with_attr("optional", Value::Array(optional))
            .with_children(children)
    }
}

impl From<HashSchema> for Type {
    fn from(schema: HashSchema) -> Type {
        Type::new(schema)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

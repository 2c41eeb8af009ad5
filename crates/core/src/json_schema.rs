//! JSON Schema emission.
//!
//! A structural-tree visitor producing draft-08-compatible objects.
//! Sequences deep-merge their children with the right side winning;
//! unions become `anyOf`, except that a union against a defaulted
//! missing value flattens to the concrete branch plus its `default`.
//! Output keys come out sorted, which keeps emission canonical.

use crate::ast::{AstNode, AstTag};
use crate::step::Type;
use crate::value::Value;
use serde_json::{json, Map, Value as Json};

const SCHEMA_DRAFT: &str = "https://json-schema.org/draft-08/schema#";

/// Emit the full schema document for a type, `$schema` envelope
/// included.
pub fn json_schema(typ: &Type) -> Json {
    let mut root = Map::new();
    root.insert("$schema".to_string(), json!(SCHEMA_DRAFT));
    if let Json::Object(body) = visit(&typ.ast()) {
        for (key, value) in body {
            root.insert(key, value);
        }
    }
    Json::Object(root)
}

/// Emit the schema object for one node.
pub fn visit(node: &AstNode) -> Json {
    match node.tag {
        AstTag::And | AstTag::Pipeline => {
            let mut merged = Json::Object(Map::new());
            for child in &node.children {
                merged = deep_merge(merged, visit(child));
            }
            merged
        }

        AstTag::Or => visit_union(node),

        AstTag::Not => json!({ "not": visit_child(node) }),

        AstTag::Boolean => json!({ "type": "boolean" }),

        AstTag::Match => {
            let mut out = Map::new();
            if let Some(Value::Str(type_name)) = node.attr("type") {
                out.insert("type".to_string(), json!(json_type(type_name)));
            }
            if let Some(Value::Str(pattern)) = node.attr("pattern") {
                out.insert("pattern".to_string(), json!(pattern));
            }
            if let Some(matched) = node.attr("match") {
                out.insert("const".to_string(), matched.to_json());
                out.insert("type".to_string(), json!(json_type(matched.type_name())));
            }
            Json::Object(out)
        }

        AstTag::Value => match node.attr("value") {
            Some(v) => json!({ "const": v.to_json(), "type": json_type(v.type_name()) }),
            None => json!({}),
        },

        AstTag::Static => match node.attr("static") {
            Some(v) => json!({
                "const": v.to_json(),
                "default": v.to_json(),
                "type": json_type(v.type_name()),
            }),
            None => json!({}),
        },

        AstTag::Default => {
            let mut out = visit_child(node);
            if let (Json::Object(body), Some(default)) = (&mut out, node.attr("default")) {
                body.insert("default".to_string(), default.to_json());
            }
            out
        }

        AstTag::Policy => visit_policy(node),

        AstTag::Transform | AstTag::Build | AstTag::Constructor => match node.attr("type") {
            Some(Value::Str(type_name)) => json!({ "type": json_type(type_name) }),
            _ => json!({}),
        },

        AstTag::Hash => visit_hash(node),

        AstTag::HashMap => {
            let value_schema = node
                .children
                .get(1)
                .map(visit)
                .unwrap_or_else(|| json!({}));
            json!({ "type": "object", "patternProperties": { ".*": value_schema } })
        }

        AstTag::Array | AstTag::Stream => {
            json!({ "type": "array", "items": visit_child(node) })
        }

        AstTag::Tuple => {
            let items: Vec<Json> = node.children.iter().map(visit).collect();
            json!({ "type": "array", "prefixItems": items })
        }

        AstTag::TaggedHash => visit_tagged_hash(node),

        AstTag::Metadata => match node.attr("description") {
            Some(Value::Str(text)) => json!({ "description": text }),
            _ => json!({}),
        },

        // Identity, sentinels, interfaces, and opaque steps have no
        // schema of their own.
        AstTag::Any | AstTag::Undefined | AstTag::Interface | AstTag::Step => json!({}),
    }
}

fn visit_child(node: &AstNode) -> Json {
    node.children.first().map(visit).unwrap_or_else(|| json!({}))
}

fn visit_union(node: &AstNode) -> Json {
    let branches: Vec<Json> = node.children.iter().map(visit).collect();
    if branches.len() == 2 {
        // A union where exactly one branch is a defaulted missing value
        // flattens to the other branch plus the default.
        let defaults: Vec<usize> = branches
            .iter()
            .enumerate()
            .filter(|(_, b)| b.get("default").is_some())
            .map(|(i, _)| i)
            .collect();
        if let [only] = defaults[..] {
            let default = branches[only]["default"].clone();
            let mut flattened = branches[1 - only].clone();
            if let Json::Object(body) = &mut flattened {
                body.insert("default".to_string(), default);
                return flattened;
            }
        }
    }
    json!({ "anyOf": branches })
}

fn visit_policy(node: &AstNode) -> Json {
    let mut out = visit_child(node);
    let Json::Object(body) = &mut out else {
        return out;
    };
    let arg = node.attr("arg");
    match node.attr("policy_name") {
        Some(Value::Str(name)) => match (name.as_str(), arg) {
            ("included_in", Some(options)) => {
                body.insert("enum".to_string(), options.to_json());
            }
            ("eq", Some(expected)) => {
                body.insert("const".to_string(), expected.to_json());
            }
            ("gt", Some(bound)) => {
                body.insert("exclusiveMinimum".to_string(), bound.to_json());
            }
            ("gte", Some(bound)) => {
                body.insert("minimum".to_string(), bound.to_json());
            }
            ("lt", Some(bound)) => {
                body.insert("exclusiveMaximum".to_string(), bound.to_json());
            }
            ("lte", Some(bound)) => {
                body.insert("maximum".to_string(), bound.to_json());
            }
            _ => {}
        },
        _ => {}
    }
    out
}

fn visit_hash(node: &AstNode) -> Json {
    let keys = string_list(node.attr("keys"));
    let optional = string_list(node.attr("optional"));

    let mut properties = Map::new();
    for (name, child) in keys.iter().zip(&node.children) {
        properties.insert(name.clone(), visit(child));
    }
    let required: Vec<&String> = keys.iter().filter(|k| !optional.contains(k)).collect();

    if keys.is_empty() {
        return json!({ "type": "object" });
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn visit_tagged_hash(node: &AstNode) -> Json {
    let key = match node.attr("key") {
        Some(Value::Str(key)) => key.clone(),
        _ => return json!({ "type": "object" }),
    };
    let tags: Vec<Value> = match node.attr("values") {
        Some(Value::Array(tags)) => tags.clone(),
        _ => Vec::new(),
    };
    let tag_type = tags
        .first()
        .map(|t| json_type(t.type_name()))
        .unwrap_or("string");
    let branches: Vec<Json> = tags
        .iter()
        .zip(&node.children)
        .map(|(tag, variant)| {
            let mut condition = Map::new();
            condition.insert(key.clone(), json!({ "const": tag.to_json() }));
            json!({
                "if": { "properties": condition },
                "then": visit(variant),
            })
        })
        .collect();
    let mut discriminator = Map::new();
    discriminator.insert(
        key.clone(),
        json!({
            "type": tag_type,
            "enum": tags.iter().map(Value::to_json).collect::<Vec<_>>(),
        }),
    );
    json!({
        "type": "object",
        "properties": discriminator,
        "required": [key],
        "allOf": branches,
    })
}

fn string_list(attr: Option<&Value>) -> Vec<String> {
    match attr {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::Str(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn json_type(type_name: &str) -> &'static str {
    match type_name {
        "String" => "string",
        "Integer" => "integer",
        "Decimal" | "Numeric" => "number",
        "Boolean" => "boolean",
        "Null" => "null",
        "Hash" => "object",
        "Array" | "Tuple" => "array",
        _ => "object",
    }
}

/// Right-biased recursive merge of two schema objects.
fn deep_merge(left: Json, right: Json) -> Json {
    match (left, right) {
        (Json::Object(mut a), Json::Object(b)) => {
            for (key, incoming) in b {
                let merged = match a.remove(&key) {
                    Some(existing) => deep_merge(existing, incoming),
                    None => incoming,
                };
                a.insert(key, merged);
            }
            Json::Object(a)
        }
        (_, right) => right,
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Matcher;
    use crate::step::Type;
    use crate::types;
    use crate::value::Value;

    #[test]
    fn primitives_map_to_their_json_types() {
        assert_eq!(visit(&types::string().ast()), json!({"type": "string"}));
        assert_eq!(visit(&types::integer().ast()), json!({"type": "integer"}));
        assert_eq!(visit(&types::decimal().ast()), json!({"type": "number"}));
        assert_eq!(visit(&types::boolean().ast()), json!({"type": "boolean"}));
        assert_eq!(visit(&types::null().ast()), json!({"type": "null"}));
        assert_eq!(visit(&types::any().ast()), json!({}));
    }

    #[test]
    fn top_level_adds_the_schema_envelope() {
        let schema = Type::from(types::hash([("name", types::string())]));
        let doc = schema.json_schema();
        assert_eq!(doc["$schema"], json!(SCHEMA_DRAFT));
        assert_eq!(doc["type"], json!("object"));
    }

    #[test]
    fn hash_schema_emits_properties_and_required() {
        let t: Type = types::hash([
            ("name", types::string()),
            ("age?", types::integer()),
        ])
        .into();
        assert_eq!(
            visit(&t.ast()),
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "age": {"type": "integer"},
                },
                "required": ["name"],
            })
        );
    }

    #[test]
    fn hash_map_emits_pattern_properties() {
        let t: Type = types::hash_map(types::string(), types::integer()).into();
        assert_eq!(
            visit(&t.ast()),
            json!({
                "type": "object",
                "patternProperties": {".*": {"type": "integer"}},
            })
        );
    }

    #[test]
    fn array_and_tuple_shapes() {
        let t: Type = types::array(types::string()).into();
        assert_eq!(
            visit(&t.ast()),
            json!({"type": "array", "items": {"type": "string"}})
        );

        let t: Type = types::tuple([types::string(), types::integer()]).into();
        assert_eq!(
            visit(&t.ast()),
            json!({
                "type": "array",
                "prefixItems": [{"type": "string"}, {"type": "integer"}],
            })
        );
    }

    #[test]
    fn union_emits_any_of() {
        let t = types::string().or(types::integer());
        assert_eq!(
            visit(&t.ast()),
            json!({"anyOf": [{"type": "string"}, {"type": "integer"}]})
        );
    }

    #[test]
    fn defaulted_type_flattens_to_branch_plus_default() {
        let t = types::string().default("Mr");
        assert_eq!(
            visit(&t.ast()),
            json!({"type": "string", "default": "Mr"})
        );
    }

    #[test]
    fn static_emits_const_and_default() {
        let t = types::static_value(42);
        assert_eq!(
            visit(&t.ast()),
            json!({"const": 42, "default": 42, "type": "integer"})
        );
    }

    #[test]
    fn value_gate_emits_const() {
        let t = types::string().value("ok");
        assert_eq!(
            visit(&t.ast()),
            json!({"type": "string", "const": "ok"})
        );
    }

    #[test]
    fn regex_match_emits_pattern() {
        let t = types::string().matching(Matcher::regex("^[a-z]+$").unwrap());
        assert_eq!(
            visit(&t.ast()),
            json!({"type": "string", "pattern": "^[a-z]+$"})
        );
    }

    #[test]
    fn options_policy_emits_enum() {
        let t = types::string()
            .options([Value::Str("a".into()), Value::Str("b".into())])
            .unwrap();
        assert_eq!(
            visit(&t.ast()),
            json!({"type": "string", "enum": ["a", "b"]})
        );
    }

    #[test]
    fn bound_policies_emit_numeric_bounds() {
        let t = types::integer().rule("gte", 1i64).unwrap();
        let t = t.rule("lt", 10i64).unwrap();
        assert_eq!(
            visit(&t.ast()),
            json!({"type": "integer", "minimum": 1, "exclusiveMaximum": 10})
        );
    }

    #[test]
    fn tagged_hash_emits_conditional_branches() {
        let variant = |kind: &str| {
            types::hash([
                ("kind", types::string().value(kind)),
                ("name", types::string()),
            ])
        };
        let t = types::any_hash()
            .tagged_by("kind", [variant("t1"), variant("t2")])
            .unwrap();
        let schema = visit(&t.ast());
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["required"], json!(["kind"]));
        assert_eq!(
            schema["properties"]["kind"],
            json!({"type": "string", "enum": ["t1", "t2"]})
        );
        assert_eq!(schema["allOf"].as_array().unwrap().len(), 2);
        assert_eq!(
            schema["allOf"][0]["if"],
            json!({"properties": {"kind": {"const": "t1"}}})
        );
    }
}

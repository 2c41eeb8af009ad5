//! End-to-end engine scenarios.
//!
//! Each test builds a type the way library users do -- from the `types`
//! vocabulary and the composition operators -- runs realistic input
//! through it, and checks the full outcome: output value, validity, and
//! the structured error tree.

use sieve_core::{defer, types, ErrorTree, Matcher, Type, Value};

fn s(v: &str) -> Value {
    Value::Str(v.into())
}

// ── Schema with defaults and coercion ────────────────────────────────

#[test]
fn schema_with_defaults_and_coercion() {
    let friend = types::hash([("name", types::string())]);
    let person = Type::from(types::hash([
        ("title", types::string().default("Mr")),
        ("name", types::string()),
        ("age?", types::lax::integer()),
        ("friend", Type::from(friend)),
    ]));

    let out = person.resolve(Value::hash_of([
        ("name", s("Ismael")),
        ("age", s("42")),
        ("friend", Value::hash_of([("name", s("Joe"))])),
    ]));

    assert!(out.is_valid());
    assert_eq!(
        out.value(),
        &Value::hash_of([
            ("title", s("Mr")),
            ("name", s("Ismael")),
            ("age", Value::Int(42)),
            ("friend", Value::hash_of([("name", s("Joe"))])),
        ])
    );
}

// ── Array with alternative transforms ────────────────────────────────

#[test]
fn array_with_alternative_transforms() {
    let element = types::integer().or(types::string().constructor("Integer", |v| match v {
        Value::Str(raw) => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| e.to_string()),
        other => Ok(other.clone()),
    }));
    let list = Type::from(types::array(element));

    let out = list.resolve(Value::Array(vec![Value::Int(1), Value::Int(2), s("3")]));
    assert!(out.is_valid());
    assert_eq!(
        out.value(),
        &Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

// ── Tagged hash dispatch ─────────────────────────────────────────────

fn kind_variant(kind: &str) -> sieve_core::HashSchema {
    types::hash([
        ("kind", types::string().value(kind)),
        ("name", types::string()),
    ])
}

#[test]
fn tagged_hash_routes_by_discriminator() {
    let tagged = types::any_hash()
        .tagged_by("kind", [kind_variant("t1"), kind_variant("t2")])
        .unwrap();

    for kind in ["t1", "t2"] {
        let out = tagged.resolve(Value::hash_of([("kind", s(kind)), ("name", s("x"))]));
        assert!(out.is_valid(), "expected {} to route", kind);
    }
}

#[test]
fn tagged_hash_miss_lists_known_tags() {
    let tagged = types::any_hash()
        .tagged_by("kind", [kind_variant("t1"), kind_variant("t2")])
        .unwrap();
    let out = tagged.resolve(Value::hash_of([("kind", s("t3")), ("name", s("x"))]));
    assert!(out.is_halt());
    assert_eq!(
        out.errors().unwrap().to_string(),
        "expected :kind to be one of t1, t2"
    );
}

// ── Tuple ────────────────────────────────────────────────────────────

#[test]
fn tuple_of_status_flag_and_message() {
    let status = Type::from(types::tuple([
        types::value("ok").or(types::value("error")),
        types::boolean(),
        types::string(),
    ]));

    let out = status.resolve(Value::Array(vec![s("ok"), Value::Bool(true), s("Hi")]));
    assert!(out.is_valid());

    let out = status.resolve(Value::Array(vec![s("ok"), s("nope"), s("Hi")]));
    assert!(out.is_halt());
    let Some(ErrorTree::Items(by_index)) = out.errors() else {
        panic!("expected index-keyed errors, got {:?}", out.errors())
    };
    assert_eq!(by_index.keys().copied().collect::<Vec<_>>(), vec![1]);
}

// ── Recursive types ──────────────────────────────────────────────────

fn linked_list() -> Type {
    Type::from(types::hash([
        ("value", types::any()),
        ("next", defer(linked_list).nullable()),
    ]))
}

#[test]
fn recursive_linked_list_round_trips() {
    let input = Value::hash_of([
        ("value", Value::Int(1)),
        (
            "next",
            Value::hash_of([
                ("value", Value::Int(2)),
                (
                    "next",
                    Value::hash_of([("value", Value::Int(3)), ("next", Value::Null)]),
                ),
            ]),
        ),
    ]);

    let out = linked_list().resolve(input.clone());
    assert!(out.is_valid());
    assert_eq!(out.value(), &input);
}

#[test]
fn recursive_type_reports_errors_at_depth() {
    let input = Value::hash_of([
        ("value", Value::Int(1)),
        (
            "next",
            Value::hash_of([("value", Value::Int(2)), ("next", s("not a node"))]),
        ),
    ]);
    let out = linked_list().resolve(input);
    assert!(out.is_halt());
    let rendered = out.errors().unwrap().to_string();
    assert!(rendered.contains("next"), "got: {}", rendered);
}

// ── Union metadata ───────────────────────────────────────────────────

#[test]
fn union_metadata_collects_types_and_attrs() {
    let t = types::string().or(types::integer().meta([("foo", s("bar"))]));
    let meta = t.metadata();
    assert_eq!(
        meta.get("type"),
        Some(&Value::Array(vec![s("String"), s("Integer")]))
    );
    assert_eq!(meta.get("foo"), Some(&s("bar")));
}

// ── Presence ─────────────────────────────────────────────────────────

#[test]
fn present_halts_exactly_for_blank_values() {
    let t = types::any().present();
    for blank in [
        Value::Undefined,
        Value::Null,
        s(""),
        Value::Array(vec![]),
        Value::Hash(Default::default()),
    ] {
        assert!(t.resolve(blank.clone()).is_halt(), "expected blank: {:?}", blank);
    }
    for present in [Value::Int(0), Value::Bool(false), s("x"), Value::Array(vec![s("a")])] {
        assert!(
            t.resolve(present.clone()).is_valid(),
            "expected present: {:?}",
            present
        );
    }
}

// ── Schema algebra ───────────────────────────────────────────────────

#[test]
fn merge_takes_key_union_and_right_types() {
    let s1 = types::hash([("a", types::string()), ("b?", types::string())]);
    let s2 = types::hash([("b?", types::integer()), ("c", types::integer())]);
    let merged = s1.merge(&s2);

    let names: Vec<String> = merged.keys().iter().map(|k| k.name.clone()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);

    let out = Type::from(merged).resolve(Value::hash_of([
        ("a", s("x")),
        ("b", Value::Int(1)),
        ("c", Value::Int(2)),
    ]));
    assert!(out.is_valid());
}

#[test]
fn intersection_keeps_shared_keys_only() {
    let s1 = types::hash([("a", types::string()), ("b", types::string())]);
    let s2 = types::hash([("b", types::integer()), ("c", types::integer())]);
    let both = s1.intersect(&s2);
    let names: Vec<String> = both.keys().iter().map(|k| k.name.clone()).collect();
    assert_eq!(names, vec!["b"]);

    // Output projects to the shared keys and drops the rest.
    let out = Type::from(both).resolve(Value::hash_of([
        ("a", s("dropped")),
        ("b", Value::Int(1)),
    ]));
    assert!(out.is_valid());
    assert_eq!(out.value(), &Value::hash_of([("b", Value::Int(1))]));
}

// ── Defaults interact with unions and hashes ─────────────────────────

#[test]
fn default_only_fires_on_undefined() {
    let t = types::integer().default(7);
    assert_eq!(t.resolve(Value::Undefined).value(), &Value::Int(7));
    assert_eq!(t.resolve(3).value(), &Value::Int(3));
    // Null is a provided value, not a missing one.
    assert!(t.resolve(Value::Null).is_halt());
}

// ── Rules end to end ─────────────────────────────────────────────────

#[test]
fn rules_compose_with_coercions() {
    let price = types::lax::integer()
        .rule("gte", 0i64)
        .unwrap()
        .rule("lt", 10_000i64)
        .unwrap();
    assert_eq!(price.resolve(s("1,250")).value(), &Value::Int(1250));
    assert_eq!(
        price.resolve(s("-4")).errors().unwrap().to_string(),
        "must be greater or equal to 0"
    );
}

#[test]
fn options_restrict_and_emit_enum() {
    let status = types::string().options([s("active"), s("archived")]).unwrap();
    assert!(status.resolve(s("active")).is_valid());
    assert!(status.resolve(s("deleted")).is_halt());
    assert_eq!(
        sieve_core::json_schema::visit(&status.ast()),
        serde_json::json!({"type": "string", "enum": ["active", "archived"]})
    );
}

// ── JSON Schema round trip for a realistic record ────────────────────

#[test]
fn json_schema_for_a_full_record() {
    let record = Type::from(types::hash([
        ("name", types::string()),
        ("age?", types::integer().rule("gte", 0i64).unwrap()),
        ("tags", Type::from(types::array(types::string()))),
        (
            "status",
            types::string().matching(Matcher::regex("^[a-z]+$").unwrap()),
        ),
    ]));
    let doc = record.json_schema();
    assert_eq!(doc["$schema"], serde_json::json!("https://json-schema.org/draft-08/schema#"));
    assert_eq!(doc["required"], serde_json::json!(["name", "tags", "status"]));
    assert_eq!(
        doc["properties"]["age"],
        serde_json::json!({"type": "integer", "minimum": 0})
    );
    assert_eq!(
        doc["properties"]["tags"],
        serde_json::json!({"type": "array", "items": {"type": "string"}})
    );
    assert_eq!(
        doc["properties"]["status"],
        serde_json::json!({"type": "string", "pattern": "^[a-z]+$"})
    );
}

// ── Parse surface ────────────────────────────────────────────────────

#[test]
fn parse_surfaces_structured_errors() {
    let person = Type::from(types::hash([("name", types::string())]));
    let err = person
        .parse(Value::hash_of([("name", Value::Int(5))]))
        .unwrap_err();
    assert_eq!(
        err.errors.to_json(),
        serde_json::json!({"name": "Must be a String"})
    );
}

//! Integration test: compile realistic schemas and evaluate instances
//! through the public API only, checking the full result shape.

use schemata_engine::{validate, EngineConfig, SchemaCompiler, SchemataError};
use serde_json::{json, Value};

fn person_schema() -> Value {
    json!({
        "$id": "https://example.com/person.json",
        "title": "Person",
        "type": "object",
        "required": ["name", "age"],
        "properties": {
            "name": {"type": "string", "minLength": 1},
            "age": {"type": "integer", "minimum": 0},
            "email": {"type": "string", "format": "email"},
            "tags": {"type": "array", "items": {"type": "string"}, "uniqueItems": true}
        },
        "additionalProperties": false
    })
}

#[test]
fn test_type_mismatch_yields_exactly_one_violation() {
    let result = validate(&json!({"type": "string"}), &json!(42)).unwrap();
    assert!(!result.valid);
    assert_eq!(result.violations.len(), 1);
    let violation = &result.violations[0];
    assert_eq!(violation.keyword, "type");
    assert!(violation.instance_location.is_root());
    assert_eq!(violation.keyword_location.to_string(), "/type");
    assert_eq!(violation.absolute_keyword_location.as_deref(), Some("json-schema:///#/type"));

    let result = validate(&json!({"type": "string"}), &json!("x")).unwrap();
    assert!(result.valid);
    assert!(result.violations.is_empty());
}

#[test]
fn test_valid_person() {
    let compiled = SchemaCompiler::new().compile(&person_schema()).unwrap();
    let result = compiled
        .validate(&json!({"name": "Ada", "age": 36, "tags": ["math"]}))
        .unwrap();
    assert!(result.valid, "{result}");
    assert_eq!(
        result.annotations_named("title").next().unwrap().value(),
        &json!("Person")
    );
    let properties = result
        .annotations_named("properties")
        .find(|a| a.instance_location.is_root())
        .unwrap();
    assert_eq!(properties.value(), &json!(["name", "age", "tags"]));
}

#[test]
fn test_invalid_person_reports_every_failure() {
    let compiled = SchemaCompiler::new().compile(&person_schema()).unwrap();
    let result = compiled
        .validate(&json!({"name": "", "age": -1, "tags": ["a", "a"], "nickname": "x"}))
        .unwrap();
    assert!(!result.valid);
    let mut found: Vec<(String, String)> = result
        .violations
        .iter()
        .map(|v| (v.instance_location.to_string(), v.keyword.clone()))
        .collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            ("/age".to_string(), "minimum".to_string()),
            ("/name".to_string(), "minLength".to_string()),
            ("/nickname".to_string(), "false".to_string()),
            ("/tags".to_string(), "uniqueItems".to_string()),
        ]
    );
    let age = result.violations_of("minimum").next().unwrap();
    assert_eq!(age.keyword_location.to_string(), "/properties/age/minimum");
    assert_eq!(
        age.absolute_keyword_location.as_deref(),
        Some("https://example.com/person.json#/properties/age/minimum")
    );
}

#[test]
fn test_missing_required_member() {
    let result = validate(&person_schema(), &json!({"name": "Ada"})).unwrap();
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].keyword, "required");
    assert_eq!(result.violations[0].reason, "\"age\" is a required property");
}

#[test]
fn test_any_of_union_and_annotations() {
    let schema = json!({
        "anyOf": [
            {"type": "string", "title": "text"},
            {"type": "number", "title": "amount"}
        ]
    });
    let text = validate(&schema, &json!("hello")).unwrap();
    assert!(text.valid);
    let titles: Vec<&Value> = text.annotations_named("title").map(|a| a.value()).collect();
    assert_eq!(titles, vec![&json!("text")]);

    let neither = validate(&schema, &json!(true)).unwrap();
    assert_eq!(neither.violations.len(), 2);
    assert!(neither.annotations.is_empty());
}

#[test]
fn test_boolean_schemas() {
    assert!(validate(&json!(true), &json!({"anything": [1, 2]})).unwrap().valid);
    let result = validate(&json!(false), &json!(null)).unwrap();
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].keyword, "false");
}

#[test]
fn test_unknown_keywords_become_annotations() {
    let result = validate(&json!({"x-internal": {"owner": "team"}}), &json!(1)).unwrap();
    assert!(result.valid);
    let record = result.annotations_named("x-internal").next().unwrap();
    assert_eq!(record.value(), &json!({"owner": "team"}));
}

#[test]
fn test_annotations_can_be_disabled() {
    let compiled = SchemaCompiler::new()
        .with_config(EngineConfig {
            collect_annotations: false,
            ..EngineConfig::default()
        })
        .compile(&json!({"title": "t", "properties": {"a": true}, "unevaluatedProperties": false}))
        .unwrap();
    let result = compiled.validate(&json!({"a": 1})).unwrap();
    assert!(result.valid);
    assert!(result.annotations.is_empty());
    assert!(!compiled.is_valid(&json!({"b": 1})));
}

#[test]
fn test_config_from_yaml_drives_formats() {
    let config = EngineConfig::from_yaml_str("assert_formats: true\nmax_depth: 32\n").unwrap();
    let compiled = SchemaCompiler::new()
        .with_config(config)
        .compile(&json!({"format": "date"}))
        .unwrap();
    assert!(compiled.is_valid(&json!("2024-02-29")));
    assert!(!compiled.is_valid(&json!("2023-02-29")));
}

#[test]
fn test_result_serialization_and_display() {
    let result = validate(&json!({"minimum": 10}), &json!(3)).unwrap();
    let value = result.to_json();
    assert_eq!(value["valid"], json!(false));
    assert_eq!(value["violations"][0]["keyword"], json!("minimum"));
    assert_eq!(value["violations"][0]["keyword_location"], json!("/minimum"));
    let text = result.to_string();
    assert!(text.starts_with("invalid (1 violations)"));
}

#[test]
fn test_compile_errors_surface_through_validate() {
    let err = validate(&json!({"minLength": "three"}), &json!("x")).unwrap_err();
    assert!(matches!(err, SchemataError::Compile(_)));
    assert!(err.to_string().contains("minLength"));
}

#[test]
fn test_compiled_schema_is_shared_across_threads() {
    let compiled = SchemaCompiler::new().compile(&person_schema()).unwrap();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let compiled = &compiled;
                scope.spawn(move || compiled.is_valid(&json!({"name": "n", "age": i})))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    });
}

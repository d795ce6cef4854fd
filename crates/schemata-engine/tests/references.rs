//! Integration test: static and dynamic references across resources and
//! documents, cycles, and the recursion ceiling.

use schemata_engine::config::MAX_DEPTH;
use schemata_engine::{CompileError, EngineConfig, EvaluationError, SchemaCompiler};
use serde_json::{json, Value};

fn tree_schema() -> Value {
    json!({
        "$id": "https://example.com/tree",
        "$dynamicAnchor": "node",
        "type": "object",
        "properties": {
            "data": true,
            "children": {"type": "array", "items": {"$dynamicRef": "#node"}}
        }
    })
}

fn strict_tree_schema() -> Value {
    json!({
        "$id": "https://example.com/strict-tree",
        "$dynamicAnchor": "node",
        "$ref": "tree",
        "unevaluatedProperties": false
    })
}

#[test]
fn test_cross_document_ref() {
    let compiled = SchemaCompiler::new()
        .with_document(
            "https://example.com/address.json",
            json!({"type": "object", "required": ["city"]}),
        )
        .compile(&json!({"properties": {"home": {"$ref": "https://example.com/address.json"}}}))
        .unwrap();
    assert!(compiled.is_valid(&json!({"home": {"city": "Lagos"}})));
    let result = compiled.validate(&json!({"home": {}})).unwrap();
    let violation = &result.violations[0];
    assert_eq!(violation.instance_location.to_string(), "/home");
    assert_eq!(violation.keyword_location.to_string(), "/properties/home/$ref/required");
    assert_eq!(
        violation.absolute_keyword_location.as_deref(),
        Some("https://example.com/address.json#/required")
    );
}

#[test]
fn test_relative_ref_against_embedded_id() {
    let compiled = SchemaCompiler::new()
        .compile(&json!({
            "$id": "https://example.com/root.json",
            "$defs": {
                "money": {
                    "$id": "money.json",
                    "type": "object",
                    "properties": {"amount": {"$ref": "#/$defs/amount"}},
                    "$defs": {"amount": {"type": "number"}}
                }
            },
            "properties": {"price": {"$ref": "money.json"}}
        }))
        .unwrap();
    assert!(compiled.is_valid(&json!({"price": {"amount": 9.5}})));
    assert!(!compiled.is_valid(&json!({"price": {"amount": "9.5"}})));
}

#[test]
fn test_anchor_in_other_document() {
    let compiled = SchemaCompiler::new()
        .with_document(
            "https://example.com/defs.json",
            json!({"$defs": {"p": {"$anchor": "positive", "exclusiveMinimum": 0}}}),
        )
        .compile(&json!({"items": {"$ref": "https://example.com/defs.json#positive"}}))
        .unwrap();
    assert!(compiled.is_valid(&json!([1, 2])));
    assert!(!compiled.is_valid(&json!([1, 0])));
}

#[test]
fn test_escaped_pointer_fragments() {
    let compiled = SchemaCompiler::new()
        .compile(&json!({
            "$defs": {"a/b": {"type": "integer"}, "c d": {"type": "string"}, "t~x": {"const": 1}},
            "properties": {
                "slash": {"$ref": "#/$defs/a~1b"},
                "space": {"$ref": "#/$defs/c%20d"},
                "tilde": {"$ref": "#/$defs/t~0x"}
            }
        }))
        .unwrap();
    assert!(compiled.is_valid(&json!({"slash": 1, "space": "s", "tilde": 1})));
    assert!(!compiled.is_valid(&json!({"slash": "1"})));
    assert!(!compiled.is_valid(&json!({"space": 1})));
    assert!(!compiled.is_valid(&json!({"tilde": 2})));
}

#[test]
fn test_recursive_schema_over_finite_instance() {
    let compiled = SchemaCompiler::new()
        .compile(&json!({
            "type": "object",
            "properties": {"next": {"$ref": "#"}, "value": {"type": "integer"}}
        }))
        .unwrap();
    assert!(compiled.is_valid(&json!({"value": 1, "next": {"value": 2, "next": {}}})));
    let result = compiled
        .validate(&json!({"next": {"next": {"value": "deep"}}}))
        .unwrap();
    assert_eq!(result.violations[0].instance_location.to_string(), "/next/next/value");
    assert_eq!(
        result.violations[0].keyword_location.to_string(),
        "/properties/next/$ref/properties/next/$ref/properties/value/type"
    );
}

#[test]
fn test_unbounded_recursion_hits_depth_ceiling() {
    let compiled = SchemaCompiler::new()
        .with_config(EngineConfig {
            max_depth: 64,
            ..EngineConfig::default()
        })
        .compile(&json!({"$ref": "#"}))
        .unwrap();
    let err = compiled.validate(&json!(1)).unwrap_err();
    assert!(matches!(err, EvaluationError::DepthExceeded { max_depth: 64, .. }));
    assert!(err.to_string().contains("maximum depth 64"));
    assert!(!compiled.is_valid(&json!(1)));
}

#[test]
fn test_depth_ceiling_is_configurable() {
    let schema = json!({
        "$defs": {"node": {"properties": {"next": {"$ref": "#/$defs/node"}}}},
        "$ref": "#/$defs/node"
    });
    let shallow = SchemaCompiler::new()
        .with_config(EngineConfig {
            max_depth: 5,
            ..EngineConfig::default()
        })
        .compile(&schema)
        .unwrap();
    let mut instance = json!({});
    for _ in 0..10 {
        instance = json!({"next": instance});
    }
    match shallow.validate(&instance).unwrap_err() {
        EvaluationError::DepthExceeded {
            max_depth,
            instance_location,
            ..
        } => {
            assert_eq!(max_depth, 5);
            assert!(instance_location.to_string().starts_with("/next"));
        }
        other => panic!("unexpected {other:?}"),
    }
    let deep = SchemaCompiler::new().compile(&schema).unwrap();
    assert!(deep.is_valid(&instance));
}

fn nested(levels: usize) -> Value {
    let mut instance = json!({});
    for _ in 0..levels {
        instance = json!({"n": instance});
    }
    instance
}

#[test]
fn test_highest_ceiling_reports_instead_of_overflowing() {
    let compiled = SchemaCompiler::new()
        .with_config(EngineConfig {
            max_depth: MAX_DEPTH,
            ..EngineConfig::default()
        })
        .compile(&json!({"properties": {"n": {"$ref": "#"}}}))
        .unwrap();
    // Each level enters two subschemas: the property and the `$ref` target.
    assert!(compiled.is_valid(&nested(MAX_DEPTH / 2 - 1)));

    let err = compiled.validate(&nested(MAX_DEPTH / 2 + 50)).unwrap_err();
    assert!(matches!(err, EvaluationError::DepthExceeded { max_depth: MAX_DEPTH, .. }));
}

#[test]
fn test_dynamic_ref_follows_outermost_anchor() {
    let tree = SchemaCompiler::new().compile(&tree_schema()).unwrap();
    let misspelled = json!({"children": [{"daat": 1}]});
    assert!(tree.is_valid(&misspelled));

    let strict = SchemaCompiler::new()
        .with_document("https://example.com/tree", tree_schema())
        .compile(&strict_tree_schema())
        .unwrap();
    assert!(strict.is_valid(&json!({"children": [{"data": 1}]})));
    let result = strict.validate(&misspelled).unwrap();
    assert!(!result.valid);
    let locations: Vec<String> = result
        .violations
        .iter()
        .map(|v| v.instance_location.to_string())
        .collect();
    // The failing `$ref` also leaves `children` unevaluated at the root.
    assert_eq!(locations, vec!["/children", "/children/0/daat"]);
}

#[test]
fn test_reference_errors() {
    let compiler = SchemaCompiler::new();
    assert!(matches!(
        compiler.compile(&json!({"$ref": "https://example.com/missing.json"})),
        Err(CompileError::UnresolvableReference { .. })
    ));
    assert!(matches!(
        compiler.compile(&json!({"$ref": "#nowhere"})),
        Err(CompileError::UnresolvableReference { .. })
    ));
    assert!(matches!(
        compiler.compile(&json!({"$ref": "#/$defs/a", "$defs": {"a": 7}})),
        Err(CompileError::InvalidSchema { found: "integer", .. })
    ));
}

//! Unevaluated vocabulary: `unevaluatedItems` and `unevaluatedProperties`.
//!
//! Both run after their siblings and decide what was already evaluated from
//! the annotations those siblings (and every successful in-place subschema,
//! including `$ref` targets) left at the current instance location.

use std::collections::BTreeSet;

use schemata_core::{JsonPointer, Verdict};
use serde_json::Value;

use super::annotation;
use crate::compiler::{CompileContext, SchemaId};
use crate::error::CompileError;
use crate::evaluator::{AnnotationContext, Frame, Outcome};
use crate::keyword::{Applicator, Category, CategorySet, FnKeywordType, Keyword};
use crate::vocabulary::{uri, Vocabulary};

/// Annotations naming the object members already evaluated.
const PROPERTY_ANNOTATIONS: [&str; 4] = [
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
];

/// The unevaluated vocabulary.
pub fn vocabulary() -> Vocabulary {
    Vocabulary::builder(uri::UNEVALUATED)
        .keyword_type(FnKeywordType::new("unevaluatedItems", |_, ctx| {
            let schema = ctx.compile_value()?;
            Ok(Box::new(UnevaluatedItems { schema }) as Box<dyn Keyword>)
        }))
        .keyword_type(FnKeywordType::new("unevaluatedProperties", unevaluated_properties_keyword))
        .build()
}

fn unevaluated_properties_keyword(
    _: &Value,
    ctx: &mut CompileContext<'_>,
) -> Result<Box<dyn Keyword>, CompileError> {
    let schema = ctx.compile_value()?;
    Ok(Box::new(UnevaluatedProperties { schema }))
}

/// `unevaluatedProperties`.
#[derive(Debug)]
pub struct UnevaluatedProperties {
    schema: SchemaId,
}

impl UnevaluatedProperties {
    fn evaluated_names(annotations: &AnnotationContext) -> BTreeSet<&str> {
        let root = JsonPointer::root();
        PROPERTY_ANNOTATIONS
            .iter()
            .flat_map(|name| annotations.values(&root, name))
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_str)
            .collect()
    }
}

impl Keyword for UnevaluatedProperties {
    fn name(&self) -> &str {
        "unevaluatedProperties"
    }

    fn categories(&self) -> CategorySet {
        CategorySet::of(&[Category::Applicator])
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for UnevaluatedProperties {
    fn apply(&self, frame: &Frame<'_>, annotations: &AnnotationContext) -> Outcome {
        let Value::Object(object) = frame.instance() else {
            return Outcome::default();
        };
        let evaluated = Self::evaluated_names(annotations);
        let location = JsonPointer::from_tokens(["unevaluatedProperties"]);
        let mut outcome = Outcome::default();
        let mut applied = Vec::new();
        for (name, member) in object.iter().filter(|(name, _)| !evaluated.contains(name.as_str())) {
            outcome.merge(
                frame
                    .evaluate(self.schema, member)
                    .relocate(&location, &JsonPointer::from_tokens([name.as_str()])),
            );
            applied.push(Value::String(name.clone()));
        }
        outcome.push_annotation(annotation("unevaluatedProperties", Value::Array(applied)));
        outcome
    }

    fn reads_annotations(&self) -> bool {
        true
    }
}

/// Array positions already evaluated by sibling and in-place keywords.
#[derive(Debug, Default)]
struct ItemCoverage {
    all: bool,
    prefix: usize,
    indices: BTreeSet<usize>,
}

impl ItemCoverage {
    fn from_annotations(annotations: &AnnotationContext) -> Self {
        let root = JsonPointer::root();
        let mut coverage = Self::default();
        for value in annotations.values(&root, "prefixItems") {
            match value {
                Value::Bool(true) => coverage.all = true,
                Value::Number(n) => {
                    if let Some(last) = n.as_u64().and_then(|n| usize::try_from(n).ok()) {
                        coverage.prefix = coverage.prefix.max(last + 1);
                    }
                }
                _ => {}
            }
        }
        let flagged = |name| {
            annotations
                .values(&root, name)
                .any(|v| v == &Value::Bool(true))
        };
        if flagged("items") || flagged("unevaluatedItems") {
            coverage.all = true;
        }
        coverage.indices = annotations
            .values(&root, "contains")
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_u64)
            .filter_map(|i| usize::try_from(i).ok())
            .collect();
        coverage
    }

    fn covers(&self, index: usize) -> bool {
        self.all || index < self.prefix || self.indices.contains(&index)
    }
}

/// `unevaluatedItems`.
#[derive(Debug)]
pub struct UnevaluatedItems {
    schema: SchemaId,
}

impl Keyword for UnevaluatedItems {
    fn name(&self) -> &str {
        "unevaluatedItems"
    }

    fn categories(&self) -> CategorySet {
        CategorySet::of(&[Category::Applicator])
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for UnevaluatedItems {
    fn apply(&self, frame: &Frame<'_>, annotations: &AnnotationContext) -> Outcome {
        let Value::Array(items) = frame.instance() else {
            return Outcome::default();
        };
        let coverage = ItemCoverage::from_annotations(annotations);
        let location = JsonPointer::from_tokens(["unevaluatedItems"]);
        let mut outcome = Outcome::default();
        let mut applied = false;
        for (i, item) in items.iter().enumerate().filter(|(i, _)| !coverage.covers(*i)) {
            outcome.merge(
                frame
                    .evaluate(self.schema, item)
                    .relocate(&location, &JsonPointer::root().index(i)),
            );
            applied = true;
        }
        if applied {
            outcome.push_annotation(annotation("unevaluatedItems", Value::Bool(true)));
        }
        outcome
    }

    fn reads_annotations(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::SchemaCompiler;
    use serde_json::json;

    fn valid(schema: serde_json::Value, instance: serde_json::Value) -> bool {
        SchemaCompiler::new().compile(&schema).unwrap().is_valid(&instance)
    }

    #[test]
    fn test_unevaluated_properties_sees_siblings() {
        let schema = json!({
            "properties": {"a": true},
            "patternProperties": {"^x-": true},
            "unevaluatedProperties": false
        });
        assert!(valid(schema.clone(), json!({"a": 1, "x-b": 2})));
        assert!(!valid(schema, json!({"a": 1, "c": 2})));
    }

    #[test]
    fn test_unevaluated_properties_sees_through_all_of_and_ref() {
        let schema = json!({
            "$defs": {"named": {"properties": {"name": {"type": "string"}}}},
            "allOf": [{"properties": {"id": true}}],
            "$ref": "#/$defs/named",
            "unevaluatedProperties": false
        });
        assert!(valid(schema.clone(), json!({"id": 1, "name": "n"})));
        let result = SchemaCompiler::new()
            .compile(&schema)
            .unwrap()
            .validate(&json!({"id": 1, "name": "n", "other": 0}))
            .unwrap();
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].instance_location.to_string(), "/other");
        assert_eq!(result.violations[0].keyword_location.to_string(), "/unevaluatedProperties");
    }

    #[test]
    fn test_failed_branch_does_not_evaluate() {
        let schema = json!({
            "anyOf": [
                {"properties": {"a": {"type": "string"}}, "required": ["a"]},
                {"properties": {"b": true}, "required": ["b"]}
            ],
            "unevaluatedProperties": false
        });
        assert!(valid(schema.clone(), json!({"b": 1})));
        // `a` is only evaluated by the failing first branch.
        assert!(!valid(schema, json!({"a": 1, "b": 1})));
    }

    #[test]
    fn test_unevaluated_items() {
        let schema = json!({"prefixItems": [{"type": "string"}], "unevaluatedItems": {"type": "integer"}});
        assert!(valid(schema.clone(), json!(["a", 1, 2])));
        assert!(!valid(schema, json!(["a", "b"])));
    }

    #[test]
    fn test_unevaluated_items_with_contains() {
        let schema = json!({"contains": {"type": "string"}, "unevaluatedItems": {"type": "integer"}});
        assert!(valid(schema.clone(), json!(["a", 1, "b"])));
        assert!(!valid(schema, json!(["a", 1.5])));
    }

    #[test]
    fn test_items_covers_everything() {
        assert!(valid(json!({"items": true, "unevaluatedItems": false}), json!([1, 2, 3])));
        assert!(!valid(json!({"unevaluatedItems": false}), json!([1])));
        assert!(valid(json!({"unevaluatedItems": false}), json!([])));
    }
}

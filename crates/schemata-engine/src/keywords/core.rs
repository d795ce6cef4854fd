//! Core vocabulary: identifiers, references, definitions and comments.
//!
//! Only `$ref` and `$dynamicRef` do anything at evaluation time. The other
//! members are shape-checked and compiled to [`Reserved`] keywords; the
//! compiler's resource index has already consumed `$id`, `$anchor` and
//! `$dynamicAnchor` by the time they get here.

use schemata_core::JsonPointer;
use serde_json::Value;
use url::Url;

use super::{schema_map, string};
use crate::compiler::{CompileContext, SchemaId};
use crate::error::CompileError;
use crate::evaluator::{AnnotationContext, Frame, Outcome};
use crate::keyword::{Applicator, Category, CategorySet, FnKeywordType, Keyword, Reserved};
use crate::vocabulary::{uri, Vocabulary};

/// The core vocabulary.
pub fn vocabulary() -> Vocabulary {
    Vocabulary::builder(uri::CORE)
        .keyword_type(FnKeywordType::new("$schema", schema_keyword))
        .keyword_type(FnKeywordType::new("$vocabulary", vocabulary_keyword))
        .keyword_type(FnKeywordType::new("$id", id_keyword))
        .keyword_type(FnKeywordType::new("$anchor", anchor_keyword))
        .keyword_type(FnKeywordType::new("$dynamicAnchor", anchor_keyword))
        .keyword_type(FnKeywordType::new("$ref", reference_keyword))
        .keyword_type(FnKeywordType::new("$dynamicRef", dynamic_reference_keyword))
        .keyword_type(FnKeywordType::new("$defs", defs_keyword))
        .keyword_type(FnKeywordType::new("$comment", comment_keyword))
        .build()
}

fn reserved(ctx: &CompileContext<'_>) -> Box<dyn Keyword> {
    Box::new(Reserved::new(ctx.keyword()))
}

fn schema_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let text = string(value, ctx)?;
    Url::parse(text).map_err(|e| ctx.malformed(format!("'{text}' is not an absolute URI: {e}")))?;
    Ok(reserved(ctx))
}

fn vocabulary_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let map = value
        .as_object()
        .ok_or_else(|| ctx.malformed("expected an object of booleans"))?;
    if let Some((uri, _)) = map.iter().find(|(_, required)| !required.is_boolean()) {
        return Err(ctx.malformed(format!("entry '{uri}' must be a boolean")));
    }
    Ok(reserved(ctx))
}

fn id_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let text = string(value, ctx)?;
    if let Some((_, fragment)) = text.split_once('#') {
        if !fragment.is_empty() {
            return Err(ctx.malformed("$id must not carry a non-empty fragment"));
        }
    }
    Ok(reserved(ctx))
}

/// Plain-name fragment syntax shared by `$anchor` and `$dynamicAnchor`.
fn is_anchor_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

fn anchor_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let name = string(value, ctx)?;
    if !is_anchor_name(name) {
        return Err(ctx.malformed(format!("'{name}' is not a valid anchor name")));
    }
    Ok(reserved(ctx))
}

fn defs_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    schema_map(value, ctx)?;
    Ok(reserved(ctx))
}

fn comment_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    string(value, ctx)?;
    Ok(reserved(ctx))
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

fn reference_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let reference = string(value, ctx)?;
    let target = ctx.compile_reference(reference)?;
    Ok(Box::new(Reference { target }))
}

fn dynamic_reference_keyword(
    value: &Value,
    ctx: &mut CompileContext<'_>,
) -> Result<Box<dyn Keyword>, CompileError> {
    let reference = string(value, ctx)?;
    let (target, anchor) = ctx.compile_dynamic_reference(reference)?;
    Ok(Box::new(DynamicReference { target, anchor }))
}

/// `$ref`: evaluate the resolved schema in place.
#[derive(Debug)]
pub struct Reference {
    target: SchemaId,
}

impl Keyword for Reference {
    fn name(&self) -> &str {
        "$ref"
    }

    fn categories(&self) -> CategorySet {
        CategorySet::of(&[Category::Applicator])
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for Reference {
    fn apply(&self, frame: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        frame
            .evaluate_in_place(self.target)
            .relocate(&JsonPointer::from_tokens(["$ref"]), &JsonPointer::root())
    }
}

/// `$dynamicRef`: like `$ref`, except that a target declaring a
/// `$dynamicAnchor` is replaced by the outermost schema in the dynamic
/// scope declaring the same anchor.
#[derive(Debug)]
pub struct DynamicReference {
    target: SchemaId,
    anchor: Option<String>,
}

impl Keyword for DynamicReference {
    fn name(&self) -> &str {
        "$dynamicRef"
    }

    fn categories(&self) -> CategorySet {
        CategorySet::of(&[Category::Applicator])
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for DynamicReference {
    fn apply(&self, frame: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        let target = self
            .anchor
            .as_deref()
            .and_then(|name| frame.dynamic_anchor(name))
            .unwrap_or(self.target);
        frame
            .evaluate_in_place(target)
            .relocate(&JsonPointer::from_tokens(["$dynamicRef"]), &JsonPointer::root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::SchemaCompiler;
    use serde_json::json;

    #[test]
    fn test_anchor_names() {
        assert!(is_anchor_name("node"));
        assert!(is_anchor_name("_x-1.2"));
        assert!(!is_anchor_name("1abc"));
        assert!(!is_anchor_name(""));
        assert!(!is_anchor_name("a b"));
        assert!(!is_anchor_name("a/b"));
    }

    #[test]
    fn test_malformed_core_members_rejected() {
        let compiler = SchemaCompiler::new();
        for schema in [
            json!({"$anchor": "9lives"}),
            json!({"$id": "https://example.com/s#frag"}),
            json!({"$comment": 3}),
            json!({"$defs": []}),
            json!({"$ref": 1}),
            json!({"$vocabulary": {"https://example.com/v": "yes"}}),
        ] {
            assert!(
                matches!(compiler.compile(&schema), Err(CompileError::MalformedKeyword { .. })),
                "{schema} should be rejected"
            );
        }
    }

    #[test]
    fn test_ref_into_defs() {
        let compiled = SchemaCompiler::new()
            .compile(&json!({
                "$defs": {"positive": {"type": "integer", "minimum": 1}},
                "$ref": "#/$defs/positive"
            }))
            .unwrap();
        assert!(compiled.is_valid(&json!(3)));
        let result = compiled.validate(&json!(0)).unwrap();
        let violation = result.violations_of("minimum").next().unwrap();
        assert_eq!(violation.keyword_location.to_string(), "/$ref/minimum");
        assert_eq!(
            violation.absolute_keyword_location.as_deref(),
            Some("json-schema:///#/$defs/positive/minimum")
        );
    }

    #[test]
    fn test_ref_by_anchor() {
        let compiled = SchemaCompiler::new()
            .compile(&json!({
                "$defs": {"s": {"$anchor": "str", "type": "string"}},
                "properties": {"name": {"$ref": "#str"}}
            }))
            .unwrap();
        assert!(compiled.is_valid(&json!({"name": "x"})));
        assert!(!compiled.is_valid(&json!({"name": 1})));
    }

    #[test]
    fn test_unresolvable_ref() {
        let err = SchemaCompiler::new()
            .compile(&json!({"$ref": "#/$defs/missing"}))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnresolvableReference { .. }));
    }

    #[test]
    fn test_dynamic_ref_without_anchor_behaves_like_ref() {
        let compiled = SchemaCompiler::new()
            .compile(&json!({
                "$defs": {"n": {"type": "number"}},
                "$dynamicRef": "#/$defs/n"
            }))
            .unwrap();
        assert!(compiled.is_valid(&json!(1.5)));
        assert!(!compiled.is_valid(&json!("1.5")));
    }
}

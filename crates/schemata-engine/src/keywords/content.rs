//! Content vocabulary: annotations describing string-encoded data. Nothing
//! here decodes or asserts.

use schemata_core::{Annotation, UnsupportedOperation};
use serde_json::Value;

use super::string;
use crate::compiler::CompileContext;
use crate::error::CompileError;
use crate::keyword::{Category, CategorySet, DefaultAnnotation, FnKeywordType, Keyword};
use crate::vocabulary::{uri, Vocabulary};

/// The content vocabulary.
pub fn vocabulary() -> Vocabulary {
    Vocabulary::builder(uri::CONTENT)
        .keyword_type(FnKeywordType::new("contentEncoding", string_annotation))
        .keyword_type(FnKeywordType::new("contentMediaType", string_annotation))
        .keyword_type(FnKeywordType::new("contentSchema", content_schema_keyword))
        .build()
}

fn string_annotation(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    string(value, ctx)?;
    Ok(Box::new(DefaultAnnotation::new(ctx.keyword(), Some(value.clone()))))
}

fn content_schema_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    ctx.compile_value()?;
    let annotates = ctx.sibling("contentMediaType").is_some();
    Ok(Box::new(ContentSchema {
        schema: value.clone(),
        annotates,
    }))
}

/// `contentSchema`. Annotates with the raw schema, and only alongside
/// `contentMediaType`.
#[derive(Debug)]
pub struct ContentSchema {
    schema: Value,
    annotates: bool,
}

impl Keyword for ContentSchema {
    fn name(&self) -> &str {
        "contentSchema"
    }

    fn categories(&self) -> CategorySet {
        if self.annotates {
            CategorySet::of(&[Category::Annotation])
        } else {
            CategorySet::of(&[Category::ReservedLocation])
        }
    }

    fn as_annotation(&self) -> Result<Annotation, UnsupportedOperation> {
        if !self.annotates {
            return Err(UnsupportedOperation {
                keyword: self.name().to_string(),
                operation: "as_annotation",
            });
        }
        Ok(Annotation::new("contentSchema", Some(self.schema.clone())))
    }
}

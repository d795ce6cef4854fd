//! Meta-data vocabulary. Every keyword is a plain annotation carrying its
//! own value; the factories only check the value's shape.

use serde_json::Value;

use crate::compiler::CompileContext;
use crate::error::CompileError;
use crate::keyword::{DefaultAnnotation, FnKeywordType, Keyword};
use crate::vocabulary::{uri, Vocabulary};

/// Required JSON shape of a meta-data keyword value.
#[derive(Debug, Clone, Copy)]
enum Shape {
    String,
    Boolean,
    Array,
    Any,
}

impl Shape {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Shape::String => value.is_string(),
            Shape::Boolean => value.is_boolean(),
            Shape::Array => value.is_array(),
            Shape::Any => true,
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Shape::String => "expected a string",
            Shape::Boolean => "expected a boolean",
            Shape::Array => "expected an array",
            Shape::Any => "",
        }
    }
}

const KEYWORDS: [(&str, Shape); 7] = [
    ("title", Shape::String),
    ("description", Shape::String),
    ("default", Shape::Any),
    ("deprecated", Shape::Boolean),
    ("readOnly", Shape::Boolean),
    ("writeOnly", Shape::Boolean),
    ("examples", Shape::Array),
];

fn annotation_keyword(
    shape: Shape,
    value: &Value,
    ctx: &CompileContext<'_>,
) -> Result<Box<dyn Keyword>, CompileError> {
    if !shape.accepts(value) {
        return Err(ctx.malformed(shape.expected()));
    }
    Ok(Box::new(DefaultAnnotation::new(ctx.keyword(), Some(value.clone()))))
}

/// The meta-data vocabulary.
pub fn vocabulary() -> Vocabulary {
    KEYWORDS
        .into_iter()
        .fold(Vocabulary::builder(uri::META_DATA), |builder, (name, shape)| {
            builder.keyword_type(FnKeywordType::new(name, move |value, ctx| {
                annotation_keyword(shape, value, ctx)
            }))
        })
        .build()
}

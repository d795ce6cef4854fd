//! Format-annotation vocabulary: the `format` keyword.
//!
//! `format` always annotates the instance with its format name. When
//! `EngineConfig::assert_formats` is on and the format catalog knows the
//! name, it also asserts: a string instance that fails the catalog's
//! condition is a violation. Non-strings and unknown formats always pass.

use std::fmt;
use std::sync::Arc;

use schemata_core::{Annotation, Condition, Constraint, UnsupportedOperation, Violation, Violations};
use serde_json::Value;

use super::string;
use crate::compiler::CompileContext;
use crate::error::CompileError;
use crate::keyword::{Category, CategorySet, FnKeywordType, Keyword};
use crate::vocabulary::{uri, Vocabulary};

/// The format-annotation vocabulary.
pub fn vocabulary() -> Vocabulary {
    Vocabulary::builder(uri::FORMAT_ANNOTATION)
        .keyword_type(FnKeywordType::new("format", format_keyword))
        .build()
}

fn format_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let format = string(value, ctx)?.to_string();
    let condition = if ctx.config().assert_formats {
        let found = ctx.format_catalog().for_format(&format);
        if found.is_none() {
            tracing::debug!(format = %format, "unknown format, annotating only");
        }
        found
    } else {
        None
    };
    Ok(Box::new(FormatKeyword { format, condition }))
}

/// `format`.
pub struct FormatKeyword {
    format: String,
    condition: Option<Arc<dyn Condition<str>>>,
}

impl FormatKeyword {
    /// The format name.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Whether this keyword asserts as well as annotates.
    pub fn asserts(&self) -> bool {
        self.condition.is_some()
    }
}

impl fmt::Debug for FormatKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatKeyword")
            .field("format", &self.format)
            .field("asserts", &self.asserts())
            .finish()
    }
}

impl Keyword for FormatKeyword {
    fn name(&self) -> &str {
        "format"
    }

    fn categories(&self) -> CategorySet {
        let set = CategorySet::of(&[Category::Annotation]);
        if self.asserts() {
            set.with(Category::Assertion)
        } else {
            set
        }
    }

    fn as_assertion(&self) -> Option<&dyn Constraint<Value>> {
        self.condition.as_ref().map(|_| self as &dyn Constraint<Value>)
    }

    fn as_annotation(&self) -> Result<Annotation, UnsupportedOperation> {
        Ok(Annotation::new("format", Some(Value::String(self.format.clone()))))
    }
}

impl Constraint<Value> for FormatKeyword {
    fn violations_by(&self, value: &Value) -> Violations {
        let mut violations = Violations::new();
        if let (Some(condition), Some(text)) = (&self.condition, value.as_str()) {
            if !condition.is_fulfilled_by(text) {
                violations.insert(Violation::new(
                    "format",
                    format!("\"{text}\" is not a valid {}", self.format),
                ));
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::SchemaCompiler;
    use crate::config::EngineConfig;
    use crate::error::CompileError;
    use serde_json::json;

    fn asserting() -> SchemaCompiler {
        SchemaCompiler::new().with_config(EngineConfig {
            assert_formats: true,
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_format_annotates_by_default() {
        let compiled = SchemaCompiler::new().compile(&json!({"format": "email"})).unwrap();
        let result = compiled.validate(&json!("not an email")).unwrap();
        assert!(result.valid);
        assert_eq!(result.annotations_named("format").next().unwrap().value(), &json!("email"));
    }

    #[test]
    fn test_format_asserts_when_enabled() {
        let compiled = asserting().compile(&json!({"format": "ipv4"})).unwrap();
        assert!(compiled.is_valid(&json!("192.168.0.1")));
        let result = compiled.validate(&json!("300.1.1.1")).unwrap();
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].keyword_location.to_string(), "/format");
        assert!(compiled.is_valid(&json!(42)));
    }

    #[test]
    fn test_unknown_format_only_annotates() {
        let compiled = asserting().compile(&json!({"format": "x-custom"})).unwrap();
        assert!(compiled.is_valid(&json!("anything")));
    }

    #[test]
    fn test_format_must_be_string() {
        assert!(matches!(
            SchemaCompiler::new().compile(&json!({"format": 1})),
            Err(CompileError::MalformedKeyword { .. })
        ));
    }
}

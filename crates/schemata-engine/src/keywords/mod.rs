//! # Standard Keywords
//!
//! Keyword types of the seven official 2020-12 vocabularies, one module per
//! vocabulary, plus the shape-checking helpers they share.
//!
//! Every factory validates the raw value completely before building the
//! keyword. A schema that compiles never fails at evaluation time because
//! of its own shape.

pub mod applicator;
pub mod content;
pub mod core;
pub mod format;
pub mod metadata;
pub mod unevaluated;
pub mod validation;

use schemata_core::{predicate, Annotation, AnnotationRecord, Condition, Constraint, ForAll, JsonPointer};
use serde_json::{Number, Value};

use crate::compiler::{CompileContext, SchemaId};
use crate::error::CompileError;
use crate::keyword::{Category, CategorySet, Keyword};
use crate::vocabulary::Vocabulary;

/// All seven official vocabularies.
pub(crate) fn official_vocabularies() -> Vec<Vocabulary> {
    vec![
        self::core::vocabulary(),
        applicator::vocabulary(),
        unevaluated::vocabulary(),
        validation::vocabulary(),
        metadata::vocabulary(),
        format::vocabulary(),
        content::vocabulary(),
    ]
}

// ---------------------------------------------------------------------------
// Generic keyword shapes
// ---------------------------------------------------------------------------

/// A keyword that is nothing but an instance constraint.
pub struct AssertionKeyword {
    name: String,
    constraint: Box<dyn Constraint<Value>>,
}

impl AssertionKeyword {
    /// Wrap `constraint` as keyword `name`.
    pub fn new(name: impl Into<String>, constraint: impl Constraint<Value> + 'static) -> Self {
        Self {
            name: name.into(),
            constraint: Box::new(constraint),
        }
    }
}

impl std::fmt::Debug for AssertionKeyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionKeyword")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Keyword for AssertionKeyword {
    fn name(&self) -> &str {
        &self.name
    }

    fn categories(&self) -> CategorySet {
        CategorySet::of(&[Category::Assertion])
    }

    fn as_assertion(&self) -> Option<&dyn Constraint<Value>> {
        Some(self.constraint.as_ref())
    }
}

/// An annotation produced by `keyword` at the current instance location.
pub(crate) fn annotation(keyword: &str, value: Value) -> AnnotationRecord {
    AnnotationRecord::new(Annotation::new(keyword, Some(value)))
        .at_keyword(JsonPointer::from_tokens([keyword]))
}

// ---------------------------------------------------------------------------
// Shape helpers
// ---------------------------------------------------------------------------

/// A non-negative integer (`2.0` counts as an integer).
pub(crate) fn non_negative_integer(value: &Value, ctx: &CompileContext<'_>) -> Result<usize, CompileError> {
    let n = match value {
        Value::Number(n) => n,
        _ => return Err(ctx.malformed("expected a non-negative integer")),
    };
    if let Some(u) = n.as_u64() {
        return usize::try_from(u).map_err(|_| ctx.malformed("integer out of range"));
    }
    match n.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 => Ok(f as usize),
        _ => Err(ctx.malformed("expected a non-negative integer")),
    }
}

/// Any JSON number, as `f64`.
pub(crate) fn number(value: &Value, ctx: &CompileContext<'_>) -> Result<f64, CompileError> {
    value
        .as_f64()
        .ok_or_else(|| ctx.malformed("expected a number"))
}

/// A JSON string.
pub(crate) fn string<'v>(value: &'v Value, ctx: &CompileContext<'_>) -> Result<&'v str, CompileError> {
    value
        .as_str()
        .ok_or_else(|| ctx.malformed("expected a string"))
}

/// An array of strings, without duplicates.
pub(crate) fn unique_strings(value: &Value, ctx: &CompileContext<'_>) -> Result<Vec<String>, CompileError> {
    let items = value
        .as_array()
        .ok_or_else(|| ctx.malformed("expected an array of strings"))?;
    let all_strings = ForAll::new(predicate(|v: &Value| v.is_string()));
    if !Condition::<[Value]>::is_fulfilled_by(&all_strings, items.as_slice()) {
        return Err(ctx.malformed("expected an array of strings"));
    }
    let mut names: Vec<String> = Vec::with_capacity(items.len());
    for name in items.iter().filter_map(Value::as_str) {
        if names.iter().any(|n| n == name) {
            return Err(ctx.malformed(format!("duplicate entry \"{name}\"")));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

/// An object whose members are all subschemas, compiled in member order.
pub(crate) fn schema_map(
    value: &Value,
    ctx: &mut CompileContext<'_>,
) -> Result<Vec<(String, SchemaId)>, CompileError> {
    let members = value
        .as_object()
        .ok_or_else(|| ctx.malformed("expected an object of schemas"))?;
    let mut schemas = Vec::with_capacity(members.len());
    for name in members.keys() {
        let id = ctx.compile_subschema(&JsonPointer::from_tokens([name.as_str()]))?;
        schemas.push((name.clone(), id));
    }
    Ok(schemas)
}

/// An array of subschemas, compiled in order.
pub(crate) fn schema_array(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Vec<SchemaId>, CompileError> {
    let items = value
        .as_array()
        .ok_or_else(|| ctx.malformed("expected an array of schemas"))?;
    (0..items.len())
        .map(|i| ctx.compile_subschema(&JsonPointer::root().index(i)))
        .collect()
}

// ---------------------------------------------------------------------------
// JSON equality
// ---------------------------------------------------------------------------

/// JSON equality where numbers compare by value, so `1` equals `1.0`.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => number_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| json_equal(v, w)))
        }
        _ => a == b,
    }
}

fn number_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

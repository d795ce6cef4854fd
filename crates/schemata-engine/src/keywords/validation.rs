//! Validation vocabulary: structural assertions on the instance.
//!
//! Almost every keyword here is a single [`Check`] over a condition built
//! from the core combinators: a [`Bound`] mapped over a size measure, a
//! [`Limit`] mapped over the numeric value, or a plain predicate. Values of
//! a type the keyword does not constrain always pass.
//!
//! `minContains` and `maxContains` are the exception: they need the
//! matching indices recorded by the sibling `contains`, so they run after
//! their siblings through the applicator view.

use regex::Regex;
use schemata_core::{
    predicate, AllOf, Check, Condition, ConditionExt, Constraint, JsonPointer, Violation, Violations,
};
use serde_json::{Map, Value};

use super::applicator::compile_pattern;
use super::{json_equal, non_negative_integer, number, unique_strings, AssertionKeyword};
use crate::compiler::CompileContext;
use crate::error::CompileError;
use crate::evaluator::{AnnotationContext, Frame, Outcome};
use crate::keyword::{Applicator, Category, CategorySet, FnKeywordType, Keyword};
use crate::vocabulary::{uri, Vocabulary};

/// The validation vocabulary.
pub fn vocabulary() -> Vocabulary {
    Vocabulary::builder(uri::VALIDATION)
        .keyword_type(FnKeywordType::new("type", type_keyword))
        .keyword_type(FnKeywordType::new("enum", enum_keyword))
        .keyword_type(FnKeywordType::new("const", const_keyword))
        .keyword_type(FnKeywordType::new("multipleOf", multiple_of_keyword))
        .keyword_type(FnKeywordType::new("maximum", |v, ctx| limit_keyword(v, ctx, Limit::Maximum)))
        .keyword_type(FnKeywordType::new("exclusiveMaximum", |v, ctx| {
            limit_keyword(v, ctx, Limit::ExclusiveMaximum)
        }))
        .keyword_type(FnKeywordType::new("minimum", |v, ctx| limit_keyword(v, ctx, Limit::Minimum)))
        .keyword_type(FnKeywordType::new("exclusiveMinimum", |v, ctx| {
            limit_keyword(v, ctx, Limit::ExclusiveMinimum)
        }))
        .keyword_type(FnKeywordType::new("maxLength", |v, ctx| {
            size_keyword(v, ctx, Bound::AtMost, string_length, "characters")
        }))
        .keyword_type(FnKeywordType::new("minLength", |v, ctx| {
            size_keyword(v, ctx, Bound::AtLeast, string_length, "characters")
        }))
        .keyword_type(FnKeywordType::new("pattern", pattern_keyword))
        .keyword_type(FnKeywordType::new("maxItems", |v, ctx| {
            size_keyword(v, ctx, Bound::AtMost, item_count, "items")
        }))
        .keyword_type(FnKeywordType::new("minItems", |v, ctx| {
            size_keyword(v, ctx, Bound::AtLeast, item_count, "items")
        }))
        .keyword_type(FnKeywordType::new("uniqueItems", unique_items_keyword))
        .keyword_type(FnKeywordType::new("maxContains", |v, ctx| {
            contains_bound_keyword(v, ctx, Bound::AtMost)
        }))
        .keyword_type(FnKeywordType::new("minContains", |v, ctx| {
            contains_bound_keyword(v, ctx, Bound::AtLeast)
        }))
        .keyword_type(FnKeywordType::new("maxProperties", |v, ctx| {
            size_keyword(v, ctx, Bound::AtMost, property_count, "properties")
        }))
        .keyword_type(FnKeywordType::new("minProperties", |v, ctx| {
            size_keyword(v, ctx, Bound::AtLeast, property_count, "properties")
        }))
        .keyword_type(FnKeywordType::new("required", required_keyword))
        .keyword_type(FnKeywordType::new("dependentRequired", dependent_required_keyword))
        .build()
}

/// Satisfied by every instance. Stands in for an empty `required` list.
struct Unconstrained;

impl Constraint<Value> for Unconstrained {
    fn violations_by(&self, _: &Value) -> Violations {
        Violations::new()
    }
}

/// `AllOf` over `checks`, or [`Unconstrained`] when there are none.
fn every(checks: Vec<Box<dyn Constraint<Value>>>) -> Box<dyn Constraint<Value>> {
    match AllOf::new(checks) {
        Ok(all) => Box::new(all),
        Err(_) => Box::new(Unconstrained),
    }
}

// ---------------------------------------------------------------------------
// type, enum, const
// ---------------------------------------------------------------------------

/// The seven JSON Schema type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    /// `null`.
    Null,
    /// `true` or `false`.
    Boolean,
    /// An object.
    Object,
    /// An array.
    Array,
    /// Any number.
    Number,
    /// A string.
    String,
    /// A number with a zero fractional part, including `1.0`.
    Integer,
}

impl JsonType {
    /// Parse a type name.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "object" => Self::Object,
            "array" => Self::Array,
            "number" => Self::Number,
            "string" => Self::String,
            "integer" => Self::Integer,
            _ => return None,
        })
    }

    /// The type name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Number => "number",
            Self::String => "string",
            Self::Integer => "integer",
        }
    }

    /// Whether `value` is of this type.
    pub fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (Self::Null, Value::Null)
            | (Self::Boolean, Value::Bool(_))
            | (Self::Object, Value::Object(_))
            | (Self::Array, Value::Array(_))
            | (Self::Number, Value::Number(_))
            | (Self::String, Value::String(_)) => true,
            (Self::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        }
    }
}

fn type_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let names: Vec<&str> = match value {
        Value::String(name) => vec![name.as_str()],
        Value::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| item.as_str().ok_or_else(|| ctx.malformed("type names must be strings")))
            .collect::<Result<_, _>>()?,
        _ => return Err(ctx.malformed("expected a type name or a non-empty array of type names")),
    };
    let mut types = Vec::with_capacity(names.len());
    for name in &names {
        let parsed = JsonType::parse(name).ok_or_else(|| ctx.malformed(format!("unknown type '{name}'")))?;
        if types.contains(&parsed) {
            return Err(ctx.malformed(format!("type '{name}' listed twice")));
        }
        types.push(parsed);
    }
    let expected = names.join(" or ");
    let check = Check::new(
        predicate(move |v: &Value| types.iter().any(|t| t.matches(v))),
        Violation::new("type", format!("expected {expected}")),
    );
    Ok(Box::new(AssertionKeyword::new("type", check)))
}

fn enum_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let allowed = value
        .as_array()
        .cloned()
        .ok_or_else(|| ctx.malformed("expected an array"))?;
    let check = Check::new(
        predicate(move |v: &Value| allowed.iter().any(|a| json_equal(a, v))),
        Violation::new("enum", "value is not one of the enumerated values"),
    );
    Ok(Box::new(AssertionKeyword::new("enum", check)))
}

fn const_keyword(value: &Value, _: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let expected = value.clone();
    let reason = format!("expected {expected}");
    let check = Check::new(
        predicate(move |v: &Value| json_equal(&expected, v)),
        Violation::new("const", reason),
    );
    Ok(Box::new(AssertionKeyword::new("const", check)))
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// Whether `value` is an integer multiple of `divisor`.
fn is_multiple_of(value: &Value, divisor: &Value) -> bool {
    if let (Some(n), Some(d)) = (value.as_i64(), divisor.as_i64()) {
        return d != 0 && n % d == 0;
    }
    if let (Some(n), Some(d)) = (value.as_u64(), divisor.as_u64()) {
        return d != 0 && n % d == 0;
    }
    match (value.as_f64(), divisor.as_f64()) {
        (Some(n), Some(d)) if d != 0.0 => {
            let quotient = n / d;
            if !quotient.is_finite() {
                // The quotient overflowed; `%` is exact in IEEE 754.
                return n.is_finite() && n % d == 0.0;
            }
            (quotient - quotient.round()).abs() <= 4.0 * f64::EPSILON * quotient.abs().max(1.0)
        }
        _ => false,
    }
}

fn multiple_of_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    if number(value, ctx)? <= 0.0 {
        return Err(ctx.malformed("expected a number greater than 0"));
    }
    let divisor = value.clone();
    let check = Check::new(
        predicate(move |v: &Value| !v.is_number() || is_multiple_of(v, &divisor)),
        Violation::new("multipleOf", format!("expected a multiple of {value}")),
    );
    Ok(Box::new(AssertionKeyword::new("multipleOf", check)))
}

/// A numeric limit. `None` (a non-number) is outside its domain.
#[derive(Debug, Clone, Copy)]
pub enum Limit {
    /// The value must be at least this.
    Minimum(f64),
    /// The value must be greater than this.
    ExclusiveMinimum(f64),
    /// The value must be at most this.
    Maximum(f64),
    /// The value must be less than this.
    ExclusiveMaximum(f64),
}

impl Limit {
    fn keyword(self) -> &'static str {
        match self {
            Self::Minimum(_) => "minimum",
            Self::ExclusiveMinimum(_) => "exclusiveMinimum",
            Self::Maximum(_) => "maximum",
            Self::ExclusiveMaximum(_) => "exclusiveMaximum",
        }
    }

    fn reason(self) -> String {
        match self {
            Self::Minimum(l) => format!("expected a value >= {l}"),
            Self::ExclusiveMinimum(l) => format!("expected a value > {l}"),
            Self::Maximum(l) => format!("expected a value <= {l}"),
            Self::ExclusiveMaximum(l) => format!("expected a value < {l}"),
        }
    }
}

impl Condition<Option<f64>> for Limit {
    fn is_fulfilled_by(&self, value: &Option<f64>) -> bool {
        let Some(n) = *value else {
            return true;
        };
        match *self {
            Self::Minimum(l) => n >= l,
            Self::ExclusiveMinimum(l) => n > l,
            Self::Maximum(l) => n <= l,
            Self::ExclusiveMaximum(l) => n < l,
        }
    }
}

fn limit_keyword(
    value: &Value,
    ctx: &mut CompileContext<'_>,
    limit: fn(f64) -> Limit,
) -> Result<Box<dyn Keyword>, CompileError> {
    let limit = limit(number(value, ctx)?);
    let check = Check::new(
        limit.map_from(Value::as_f64),
        Violation::new(limit.keyword(), limit.reason()),
    );
    Ok(Box::new(AssertionKeyword::new(limit.keyword(), check)))
}

// ---------------------------------------------------------------------------
// Sizes
// ---------------------------------------------------------------------------

/// An inclusive size bound. `None` (a value that has no such size) is
/// outside its domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Size must be at least this.
    AtLeast(usize),
    /// Size must be at most this.
    AtMost(usize),
}

impl Bound {
    fn describe(self, unit: &str) -> String {
        match self {
            Self::AtLeast(n) => format!("expected at least {n} {unit}"),
            Self::AtMost(n) => format!("expected at most {n} {unit}"),
        }
    }
}

impl Condition<Option<usize>> for Bound {
    fn is_fulfilled_by(&self, value: &Option<usize>) -> bool {
        match (*self, *value) {
            (_, None) => true,
            (Self::AtLeast(limit), Some(n)) => n >= limit,
            (Self::AtMost(limit), Some(n)) => n <= limit,
        }
    }
}

/// Length in Unicode scalar values.
fn string_length(value: &Value) -> Option<usize> {
    value.as_str().map(|s| s.chars().count())
}

fn item_count(value: &Value) -> Option<usize> {
    value.as_array().map(Vec::len)
}

fn property_count(value: &Value) -> Option<usize> {
    value.as_object().map(Map::len)
}

fn size_keyword(
    value: &Value,
    ctx: &mut CompileContext<'_>,
    bound: fn(usize) -> Bound,
    measure: fn(&Value) -> Option<usize>,
    unit: &str,
) -> Result<Box<dyn Keyword>, CompileError> {
    let bound = bound(non_negative_integer(value, ctx)?);
    let check = Check::new(
        bound.map_from(measure),
        Violation::new(ctx.keyword(), bound.describe(unit)),
    );
    Ok(Box::new(AssertionKeyword::new(ctx.keyword(), check)))
}

// ---------------------------------------------------------------------------
// Strings and arrays
// ---------------------------------------------------------------------------

fn pattern_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let source = value
        .as_str()
        .ok_or_else(|| ctx.malformed("expected a regular expression string"))?;
    let regex: Regex = compile_pattern(source, ctx)?;
    let check = Check::new(
        predicate(move |v: &Value| v.as_str().map_or(true, |s| regex.is_match(s))),
        Violation::new("pattern", format!("does not match pattern '{source}'")),
    );
    Ok(Box::new(AssertionKeyword::new("pattern", check)))
}

fn all_unique(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(i, a)| items[i + 1..].iter().all(|b| !json_equal(a, b)))
}

fn unique_items_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let enabled = value
        .as_bool()
        .ok_or_else(|| ctx.malformed("expected a boolean"))?;
    let check = Check::new(
        predicate(move |v: &Value| !enabled || v.as_array().map_or(true, |items| all_unique(items))),
        Violation::new("uniqueItems", "array items are not unique"),
    );
    Ok(Box::new(AssertionKeyword::new("uniqueItems", check)))
}

fn contains_bound_keyword(
    value: &Value,
    ctx: &mut CompileContext<'_>,
    bound: fn(usize) -> Bound,
) -> Result<Box<dyn Keyword>, CompileError> {
    let bound = bound(non_negative_integer(value, ctx)?);
    let name = if matches!(bound, Bound::AtLeast(_)) {
        "minContains"
    } else {
        "maxContains"
    };
    Ok(Box::new(ContainsBound { name, bound }))
}

/// `minContains` / `maxContains`: bound the number of items the sibling
/// `contains` matched. Without a sibling `contains` they do nothing.
#[derive(Debug)]
pub struct ContainsBound {
    name: &'static str,
    bound: Bound,
}

impl Keyword for ContainsBound {
    fn name(&self) -> &str {
        self.name
    }

    fn categories(&self) -> CategorySet {
        CategorySet::of(&[Category::Assertion])
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for ContainsBound {
    fn apply(&self, frame: &Frame<'_>, annotations: &AnnotationContext) -> Outcome {
        if !frame.instance().is_array() {
            return Outcome::default();
        }
        let sibling = JsonPointer::from_tokens(["contains"]);
        let matched = annotations
            .at(&JsonPointer::root())
            .iter()
            .find(|r| r.name() == "contains" && r.keyword_location == sibling)
            .and_then(|r| r.value().as_array())
            .map(Vec::len);
        let mut outcome = Outcome::default();
        if matched.is_some() && !self.bound.is_fulfilled_by(&matched) {
            outcome.push_violation(
                Violation::new(self.name, self.bound.describe("matching items"))
                    .at_keyword(JsonPointer::from_tokens([self.name])),
            );
        }
        outcome
    }

    fn reads_annotations(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

fn has_member(value: &Value, name: &str) -> bool {
    value.as_object().map_or(true, |o| o.contains_key(name))
}

fn required_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let checks: Vec<Box<dyn Constraint<Value>>> = unique_strings(value, ctx)?
        .into_iter()
        .map(|name| {
            let reason = format!("\"{name}\" is a required property");
            Box::new(Check::new(
                predicate(move |v: &Value| has_member(v, &name)),
                Violation::new("required", reason),
            )) as Box<dyn Constraint<Value>>
        })
        .collect();
    Ok(Box::new(AssertionKeyword::new("required", every(checks))))
}

fn dependent_required_keyword(
    value: &Value,
    ctx: &mut CompileContext<'_>,
) -> Result<Box<dyn Keyword>, CompileError> {
    let members = value
        .as_object()
        .ok_or_else(|| ctx.malformed("expected an object of string arrays"))?;
    let mut checks: Vec<Box<dyn Constraint<Value>>> = Vec::new();
    for (trigger, dependencies) in members {
        for dependency in unique_strings(dependencies, ctx)? {
            let reason = format!("\"{dependency}\" is required when \"{trigger}\" is present");
            let trigger = trigger.clone();
            checks.push(Box::new(Check::new(
                predicate(move |v: &Value| !matches!(v, Value::Object(o) if o.contains_key(&trigger)) || has_member(v, &dependency)),
                Violation::new("dependentRequired", reason),
            )));
        }
    }
    Ok(Box::new(AssertionKeyword::new("dependentRequired", every(checks))))
}

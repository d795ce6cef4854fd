//! Applicator vocabulary: keywords that apply subschemas to the instance or
//! to parts of it.
//!
//! The in-place combinators (`allOf`, `anyOf`, `oneOf`, `not`) reuse the
//! core constraint combinators with [`Outcome`] as the verdict. Each operand
//! is a [`Subschema`], a constraint over evaluation frames.
//!
//! Child applicators (`properties`, `items`, ...) annotate what they
//! evaluated so that `unevaluated*` can see it:
//!
//! | Keyword | Annotation |
//! |---------|------------|
//! | `prefixItems` | largest index applied, or `true` when every item was |
//! | `items` | `true` if applied to any item |
//! | `contains` | indices of matching items |
//! | `properties`, `patternProperties`, `additionalProperties` | names applied |

use regex::Regex;
use schemata_core::{AllOf, AnyOf, Constraint, JsonPointer, Not, OneOf, Verdict, Violation};
use serde_json::{json, Value};

use super::{annotation, schema_array, schema_map};
use crate::compiler::{CompileContext, SchemaId};
use crate::error::CompileError;
use crate::evaluator::{AnnotationContext, Frame, Outcome};
use crate::keyword::{Applicator, Category, CategorySet, FnKeywordType, Keyword};
use crate::vocabulary::{uri, Vocabulary};

/// The applicator vocabulary.
pub fn vocabulary() -> Vocabulary {
    Vocabulary::builder(uri::APPLICATOR)
        .keyword_type(FnKeywordType::new("allOf", all_of_keyword))
        .keyword_type(FnKeywordType::new("anyOf", any_of_keyword))
        .keyword_type(FnKeywordType::new("oneOf", one_of_keyword))
        .keyword_type(FnKeywordType::new("not", not_keyword))
        .keyword_type(FnKeywordType::new("if", if_keyword))
        .keyword_type(FnKeywordType::new("then", branch_keyword))
        .keyword_type(FnKeywordType::new("else", branch_keyword))
        .keyword_type(FnKeywordType::new("dependentSchemas", dependent_schemas_keyword))
        .keyword_type(FnKeywordType::new("prefixItems", prefix_items_keyword))
        .keyword_type(FnKeywordType::new("items", items_keyword))
        .keyword_type(FnKeywordType::new("contains", contains_keyword))
        .keyword_type(FnKeywordType::new("properties", properties_keyword))
        .keyword_type(FnKeywordType::new("patternProperties", pattern_properties_keyword))
        .keyword_type(FnKeywordType::new("additionalProperties", additional_properties_keyword))
        .keyword_type(FnKeywordType::new("propertyNames", property_names_keyword))
        .build()
}

fn applicator_categories() -> CategorySet {
    CategorySet::of(&[Category::Applicator])
}

fn at_keyword(tokens: &[&str]) -> JsonPointer {
    JsonPointer::from_tokens(tokens.iter().copied())
}

/// Compile a regular expression found in a schema.
pub(crate) fn compile_pattern(pattern: &str, ctx: &CompileContext<'_>) -> Result<Regex, CompileError> {
    Regex::new(pattern).map_err(|e| ctx.malformed(format!("invalid regular expression '{pattern}': {e}")))
}

// ---------------------------------------------------------------------------
// In-place composition
// ---------------------------------------------------------------------------

/// One operand of an in-place combinator: a compiled subschema plus the
/// keyword path it is reported under.
#[derive(Debug, Clone)]
pub struct Subschema {
    id: SchemaId,
    location: JsonPointer,
}

impl Subschema {
    /// Operand `id`, reported under `location`.
    pub fn new(id: SchemaId, location: JsonPointer) -> Self {
        Self { id, location }
    }
}

impl<'a> Constraint<Frame<'a>, Outcome> for Subschema {
    fn violations_by(&self, frame: &Frame<'a>) -> Outcome {
        frame
            .evaluate_in_place(self.id)
            .relocate(&self.location, &JsonPointer::root())
    }
}

/// An in-place combinator keyword.
pub struct Composition<C> {
    name: &'static str,
    operator: C,
}

impl<C> std::fmt::Debug for Composition<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composition").field("name", &self.name).finish()
    }
}

impl<C> Keyword for Composition<C>
where
    C: for<'a> Constraint<Frame<'a>, Outcome> + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn categories(&self) -> CategorySet {
        applicator_categories()
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl<C> Applicator for Composition<C>
where
    C: for<'a> Constraint<Frame<'a>, Outcome>,
{
    fn apply(&self, frame: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        self.operator.violations_by(frame)
    }
}

fn operands(
    name: &'static str,
    value: &Value,
    ctx: &mut CompileContext<'_>,
) -> Result<Vec<Subschema>, CompileError> {
    let ids = schema_array(value, ctx)?;
    Ok(ids
        .into_iter()
        .enumerate()
        .map(|(i, id)| Subschema::new(id, JsonPointer::from_tokens([name]).index(i)))
        .collect())
}

fn all_of_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let operator = AllOf::new(operands("allOf", value, ctx)?)
        .map_err(|e| CompileError::from_constraint(e, "allOf", ctx.location()))?;
    Ok(Box::new(Composition {
        name: "allOf",
        operator,
    }))
}

fn any_of_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let operator = AnyOf::new(operands("anyOf", value, ctx)?)
        .map_err(|e| CompileError::from_constraint(e, "anyOf", ctx.location()))?;
    Ok(Box::new(Composition {
        name: "anyOf",
        operator,
    }))
}

fn one_of_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let ambiguity =
        Violation::new("oneOf", "more than one subschema matched").at_keyword(at_keyword(&["oneOf"]));
    let operator = OneOf::new(operands("oneOf", value, ctx)?, ambiguity)
        .map_err(|e| CompileError::from_constraint(e, "oneOf", ctx.location()))?;
    Ok(Box::new(Composition {
        name: "oneOf",
        operator,
    }))
}

fn not_keyword(_: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let id = ctx.compile_value()?;
    let operator = Not::new(
        Subschema::new(id, at_keyword(&["not"])),
        Violation::new("not", "the instance must not match the schema").at_keyword(at_keyword(&["not"])),
    );
    Ok(Box::new(Composition {
        name: "not",
        operator,
    }))
}

// ---------------------------------------------------------------------------
// Conditionals
// ---------------------------------------------------------------------------

fn if_keyword(_: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let condition = ctx.compile_value()?;
    let then = ctx.compile_sibling("then")?;
    let otherwise = ctx.compile_sibling("else")?;
    Ok(Box::new(Conditional {
        condition,
        then,
        otherwise,
    }))
}

fn branch_keyword(_: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    ctx.compile_value()?;
    let name = if ctx.keyword() == "then" { "then" } else { "else" };
    Ok(Box::new(Branch { name }))
}

/// `if`, carrying its `then` and `else` siblings.
#[derive(Debug)]
pub struct Conditional {
    condition: SchemaId,
    then: Option<SchemaId>,
    otherwise: Option<SchemaId>,
}

impl Keyword for Conditional {
    fn name(&self) -> &str {
        "if"
    }

    fn categories(&self) -> CategorySet {
        applicator_categories()
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for Conditional {
    fn apply(&self, frame: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        let root = JsonPointer::root();
        let tested = frame.evaluate_in_place(self.condition);
        if tested.is_fatal() {
            return tested.relocate(&at_keyword(&["if"]), &root);
        }
        if tested.is_valid() {
            let mut outcome = tested.relocate(&at_keyword(&["if"]), &root);
            if let Some(then) = self.then {
                outcome.merge(frame.evaluate_in_place(then).relocate(&at_keyword(&["then"]), &root));
            }
            outcome
        } else {
            match self.otherwise {
                Some(otherwise) => frame
                    .evaluate_in_place(otherwise)
                    .relocate(&at_keyword(&["else"]), &root),
                None => Outcome::default(),
            }
        }
    }
}

/// `then` or `else`. Evaluated by the sibling `if`; alone it does nothing.
#[derive(Debug)]
pub struct Branch {
    name: &'static str,
}

impl Keyword for Branch {
    fn name(&self) -> &str {
        self.name
    }

    fn categories(&self) -> CategorySet {
        applicator_categories()
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for Branch {
    fn apply(&self, _: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        Outcome::default()
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

fn properties_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let schemas = schema_map(value, ctx)?;
    Ok(Box::new(Properties { schemas }))
}

/// `properties`.
#[derive(Debug)]
pub struct Properties {
    schemas: Vec<(String, SchemaId)>,
}

impl Keyword for Properties {
    fn name(&self) -> &str {
        "properties"
    }

    fn categories(&self) -> CategorySet {
        applicator_categories()
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for Properties {
    fn apply(&self, frame: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        let Value::Object(object) = frame.instance() else {
            return Outcome::default();
        };
        let mut outcome = Outcome::default();
        let mut applied = Vec::new();
        for (name, id) in &self.schemas {
            let Some(member) = object.get(name) else {
                continue;
            };
            outcome.merge(frame.evaluate(*id, member).relocate(
                &at_keyword(&["properties", name.as_str()]),
                &JsonPointer::from_tokens([name.as_str()]),
            ));
            applied.push(Value::String(name.clone()));
        }
        outcome.push_annotation(annotation("properties", Value::Array(applied)));
        outcome
    }
}

fn pattern_properties_keyword(
    value: &Value,
    ctx: &mut CompileContext<'_>,
) -> Result<Box<dyn Keyword>, CompileError> {
    let schemas = schema_map(value, ctx)?;
    let mut patterns = Vec::with_capacity(schemas.len());
    for (pattern, id) in schemas {
        let regex = compile_pattern(&pattern, ctx)?;
        patterns.push((pattern, regex, id));
    }
    Ok(Box::new(PatternProperties { patterns }))
}

/// `patternProperties`.
#[derive(Debug)]
pub struct PatternProperties {
    patterns: Vec<(String, Regex, SchemaId)>,
}

impl Keyword for PatternProperties {
    fn name(&self) -> &str {
        "patternProperties"
    }

    fn categories(&self) -> CategorySet {
        applicator_categories()
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for PatternProperties {
    fn apply(&self, frame: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        let Value::Object(object) = frame.instance() else {
            return Outcome::default();
        };
        let mut outcome = Outcome::default();
        let mut applied = Vec::new();
        for (name, member) in object {
            let mut matched = false;
            for (pattern, regex, id) in &self.patterns {
                if !regex.is_match(name) {
                    continue;
                }
                matched = true;
                outcome.merge(frame.evaluate(*id, member).relocate(
                    &at_keyword(&["patternProperties", pattern.as_str()]),
                    &JsonPointer::from_tokens([name.as_str()]),
                ));
            }
            if matched {
                applied.push(Value::String(name.clone()));
            }
        }
        outcome.push_annotation(annotation("patternProperties", Value::Array(applied)));
        outcome
    }
}

fn additional_properties_keyword(
    _: &Value,
    ctx: &mut CompileContext<'_>,
) -> Result<Box<dyn Keyword>, CompileError> {
    let schema = ctx.compile_value()?;
    let known: Vec<String> = ctx
        .sibling("properties")
        .and_then(Value::as_object)
        .map(|p| p.keys().cloned().collect())
        .unwrap_or_default();
    let pattern_sources: Vec<String> = ctx
        .sibling("patternProperties")
        .and_then(Value::as_object)
        .map(|p| p.keys().cloned().collect())
        .unwrap_or_default();
    let patterns = pattern_sources
        .iter()
        .map(|p| compile_pattern(p, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Box::new(AdditionalProperties {
        schema,
        known,
        patterns,
    }))
}

/// `additionalProperties`: applies to members that neither sibling
/// `properties` names nor sibling `patternProperties` matches.
#[derive(Debug)]
pub struct AdditionalProperties {
    schema: SchemaId,
    known: Vec<String>,
    patterns: Vec<Regex>,
}

impl AdditionalProperties {
    fn is_additional(&self, name: &str) -> bool {
        !self.known.iter().any(|k| k == name) && !self.patterns.iter().any(|p| p.is_match(name))
    }
}

impl Keyword for AdditionalProperties {
    fn name(&self) -> &str {
        "additionalProperties"
    }

    fn categories(&self) -> CategorySet {
        applicator_categories()
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for AdditionalProperties {
    fn apply(&self, frame: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        let Value::Object(object) = frame.instance() else {
            return Outcome::default();
        };
        let mut outcome = Outcome::default();
        let mut applied = Vec::new();
        for (name, member) in object.iter().filter(|(name, _)| self.is_additional(name)) {
            outcome.merge(frame.evaluate(self.schema, member).relocate(
                &at_keyword(&["additionalProperties"]),
                &JsonPointer::from_tokens([name.as_str()]),
            ));
            applied.push(Value::String(name.clone()));
        }
        outcome.push_annotation(annotation("additionalProperties", Value::Array(applied)));
        outcome
    }
}

fn property_names_keyword(_: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let schema = ctx.compile_value()?;
    Ok(Box::new(PropertyNames { schema }))
}

/// `propertyNames`: applies its subschema to every member name as a string.
#[derive(Debug)]
pub struct PropertyNames {
    schema: SchemaId,
}

impl Keyword for PropertyNames {
    fn name(&self) -> &str {
        "propertyNames"
    }

    fn categories(&self) -> CategorySet {
        applicator_categories()
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for PropertyNames {
    fn apply(&self, frame: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        let Value::Object(object) = frame.instance() else {
            return Outcome::default();
        };
        let mut outcome = Outcome::default();
        for name in object.keys() {
            let mut checked = frame
                .evaluate(self.schema, &Value::String(name.clone()))
                .relocate(&at_keyword(&["propertyNames"]), &JsonPointer::from_tokens([name.as_str()]));
            // Annotations about a name are not annotations about the member.
            checked.annotations.clear();
            outcome.merge(checked);
        }
        outcome
    }
}

fn dependent_schemas_keyword(
    value: &Value,
    ctx: &mut CompileContext<'_>,
) -> Result<Box<dyn Keyword>, CompileError> {
    let schemas = schema_map(value, ctx)?;
    Ok(Box::new(DependentSchemas { schemas }))
}

/// `dependentSchemas`: applies a subschema in place when its property is present.
#[derive(Debug)]
pub struct DependentSchemas {
    schemas: Vec<(String, SchemaId)>,
}

impl Keyword for DependentSchemas {
    fn name(&self) -> &str {
        "dependentSchemas"
    }

    fn categories(&self) -> CategorySet {
        applicator_categories()
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for DependentSchemas {
    fn apply(&self, frame: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        let Value::Object(object) = frame.instance() else {
            return Outcome::default();
        };
        let mut outcome = Outcome::default();
        for (name, id) in self.schemas.iter().filter(|(name, _)| object.contains_key(name)) {
            outcome.merge(
                frame
                    .evaluate_in_place(*id)
                    .relocate(&at_keyword(&["dependentSchemas", name.as_str()]), &JsonPointer::root()),
            );
        }
        outcome
    }
}

// ---------------------------------------------------------------------------
// Arrays
// ---------------------------------------------------------------------------

fn prefix_items_keyword(value: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let schemas = schema_array(value, ctx)?;
    if schemas.is_empty() {
        return Err(ctx.malformed("expected a non-empty array of schemas"));
    }
    Ok(Box::new(PrefixItems { schemas }))
}

/// `prefixItems`: one subschema per leading array position.
#[derive(Debug)]
pub struct PrefixItems {
    schemas: Vec<SchemaId>,
}

impl Keyword for PrefixItems {
    fn name(&self) -> &str {
        "prefixItems"
    }

    fn categories(&self) -> CategorySet {
        applicator_categories()
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for PrefixItems {
    fn apply(&self, frame: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        let Value::Array(items) = frame.instance() else {
            return Outcome::default();
        };
        let mut outcome = Outcome::default();
        for (i, (item, id)) in items.iter().zip(&self.schemas).enumerate() {
            outcome.merge(frame.evaluate(*id, item).relocate(
                &at_keyword(&["prefixItems"]).index(i),
                &JsonPointer::root().index(i),
            ));
        }
        let applied = items.len().min(self.schemas.len());
        if applied > 0 {
            let value = if applied == items.len() {
                Value::Bool(true)
            } else {
                json!(applied - 1)
            };
            outcome.push_annotation(annotation("prefixItems", value));
        }
        outcome
    }
}

fn items_keyword(_: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let schema = ctx.compile_value()?;
    let start = ctx
        .sibling("prefixItems")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    Ok(Box::new(Items { schema, start }))
}

/// `items`: applies to every position after the sibling `prefixItems`.
#[derive(Debug)]
pub struct Items {
    schema: SchemaId,
    start: usize,
}

impl Keyword for Items {
    fn name(&self) -> &str {
        "items"
    }

    fn categories(&self) -> CategorySet {
        applicator_categories()
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for Items {
    fn apply(&self, frame: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        let Value::Array(items) = frame.instance() else {
            return Outcome::default();
        };
        let mut outcome = Outcome::default();
        for (i, item) in items.iter().enumerate().skip(self.start) {
            outcome.merge(
                frame
                    .evaluate(self.schema, item)
                    .relocate(&at_keyword(&["items"]), &JsonPointer::root().index(i)),
            );
        }
        if items.len() > self.start {
            outcome.push_annotation(annotation("items", Value::Bool(true)));
        }
        outcome
    }
}

fn contains_keyword(_: &Value, ctx: &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> {
    let schema = ctx.compile_value()?;
    let bounded = ctx.sibling("minContains").is_some() && ctx.recognizes("minContains");
    Ok(Box::new(Contains { schema, bounded }))
}

/// `contains`. With a sibling `minContains` the match count is left to that
/// keyword; otherwise at least one item must match.
#[derive(Debug)]
pub struct Contains {
    schema: SchemaId,
    bounded: bool,
}

impl Keyword for Contains {
    fn name(&self) -> &str {
        "contains"
    }

    fn categories(&self) -> CategorySet {
        applicator_categories()
    }

    fn as_applicator(&self) -> Option<&dyn Applicator> {
        Some(self)
    }
}

impl Applicator for Contains {
    fn apply(&self, frame: &Frame<'_>, _: &AnnotationContext) -> Outcome {
        let Value::Array(items) = frame.instance() else {
            return Outcome::default();
        };
        let mut outcome = Outcome::default();
        let mut matched = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let checked = frame
                .evaluate(self.schema, item)
                .relocate(&at_keyword(&["contains"]), &JsonPointer::root().index(i));
            if checked.is_fatal() {
                return checked;
            }
            if checked.is_valid() {
                outcome.annotations.extend(checked.annotations);
                matched.push(json!(i));
            }
        }
        if matched.is_empty() && !self.bounded {
            outcome.push_violation(
                Violation::new("contains", "no array item matches the contains schema")
                    .at_keyword(at_keyword(&["contains"])),
            );
        }
        outcome.push_annotation(annotation("contains", Value::Array(matched)));
        outcome
    }
}

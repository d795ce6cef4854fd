//! # Evaluator
//!
//! Walks a [`CompiledSchema`] against an instance and returns an
//! [`Outcome`]: the violations found and the annotations collected. Nothing
//! is shared between calls. Each call builds its own frames, dynamic scope
//! and annotation contexts on the stack, so a compiled schema can be
//! evaluated from many threads at once.
//!
//! ## Evaluation Order
//!
//! Within one schema object, keywords run in two phases:
//!
//! 1. every keyword that does not read sibling annotations, in member order;
//! 2. an [`AnnotationContext`] is built from phase 1's annotations, then the
//!    keywords that do read it (`unevaluated*`, `minContains`, `maxContains`).
//!
//! No keyword short-circuits the others. The full violation set is part of
//! the result.
//!
//! ## Locations
//!
//! A node reports locations relative to itself. Applicators prefix their
//! own path segments on the way back up, so the root outcome is located
//! relative to the evaluation root. Each violation's absolute keyword
//! location is filled in by the node that produced it.
//!
//! ## Depth
//!
//! Every subschema entered increases the depth by one. Beyond
//! `EngineConfig::max_depth` the node yields a fatal outcome that every
//! combinator propagates unchanged, and [`CompiledSchema::validate`] turns
//! it into [`EvaluationError::DepthExceeded`].
//!
//! Ceilings up to the default evaluate on the caller's stack. Higher ones
//! run on a scoped thread whose stack grows with the ceiling, so reaching
//! the ceiling reports an error instead of overflowing.

use std::collections::BTreeMap;
use std::mem;
use std::thread;

use schemata_core::{AnnotationRecord, JsonPointer, Verdict, Violation, Violations};
use serde_json::Value;

use crate::compiler::{CompiledSchema, NodeKind, ResourceId, SchemaId};
use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::EvaluationError;
use crate::keyword::{Category, Keyword};
use crate::output::ValidationResult;

/// Highest ceiling evaluated on the caller's stack.
const INLINE_DEPTH: usize = DEFAULT_MAX_DEPTH;
/// Fixed stack for the evaluation thread.
const STACK_BASE: usize = 1024 * 1024;
/// Stack reserved per level of nesting on the evaluation thread.
const STACK_PER_LEVEL: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Violations plus annotations from evaluating one schema or keyword.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    /// Failed assertions.
    pub violations: Violations,
    /// Annotations, in production order.
    pub annotations: Vec<AnnotationRecord>,
    fatal: Option<EvaluationError>,
}

impl Outcome {
    /// An outcome that aborts evaluation.
    pub fn fatal(error: EvaluationError) -> Self {
        Self {
            fatal: Some(error),
            ..Self::default()
        }
    }

    /// An outcome holding one annotation.
    pub fn annotated(record: AnnotationRecord) -> Self {
        Self {
            annotations: vec![record],
            ..Self::default()
        }
    }

    /// No violations and not fatal.
    pub fn is_valid(&self) -> bool {
        self.is_satisfied()
    }

    /// The abort reason, if any.
    pub fn fatal_error(&self) -> Option<&EvaluationError> {
        self.fatal.as_ref()
    }

    /// Add one violation.
    pub fn push_violation(&mut self, violation: Violation) {
        self.violations.insert(violation);
    }

    /// Add one annotation.
    pub fn push_annotation(&mut self, record: AnnotationRecord) {
        self.annotations.push(record);
    }

    /// Prefix every location, as an applicator does for a subschema result.
    pub fn relocate(mut self, keyword_prefix: &JsonPointer, instance_prefix: &JsonPointer) -> Self {
        self.violations = mem::take(&mut self.violations)
            .into_iter()
            .map(|mut v| {
                v.relocate(keyword_prefix, instance_prefix);
                v
            })
            .collect();
        for record in &mut self.annotations {
            record.relocate(keyword_prefix, instance_prefix);
        }
        if let Some(EvaluationError::DepthExceeded {
            instance_location, ..
        }) = self.fatal.as_mut()
        {
            *instance_location = instance_prefix.concat(instance_location);
        }
        self
    }

    /// Fill missing absolute keyword locations from `base`, the absolute
    /// location of the schema object that produced them.
    fn anchor(&mut self, base: &str) {
        self.violations = mem::take(&mut self.violations)
            .into_iter()
            .map(|mut v| {
                if v.absolute_keyword_location.is_none() {
                    v.absolute_keyword_location = Some(format!("{base}{}", v.keyword_location));
                }
                v
            })
            .collect();
        for record in &mut self.annotations {
            if record.absolute_keyword_location.is_none() {
                record.absolute_keyword_location =
                    Some(format!("{base}{}", record.keyword_location));
            }
        }
    }

    /// Split into violations, annotations and the abort reason.
    pub fn into_parts(self) -> (Violations, Vec<AnnotationRecord>, Option<EvaluationError>) {
        (self.violations, self.annotations, self.fatal)
    }
}

impl Verdict for Outcome {
    fn violations(&self) -> &Violations {
        &self.violations
    }

    fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    fn merge(&mut self, mut other: Self) {
        self.violations.append(&mut other.violations);
        self.annotations.append(&mut other.annotations);
        if self.fatal.is_none() {
            self.fatal = other.fatal;
        }
    }

    fn from_violation(violation: Violation) -> Self {
        let mut outcome = Self::default();
        outcome.violations.insert(violation);
        outcome
    }
}

// ---------------------------------------------------------------------------
// Annotation context
// ---------------------------------------------------------------------------

/// Annotations produced so far within one schema object, keyed by instance
/// location relative to that object's instance.
#[derive(Debug, Default)]
pub struct AnnotationContext {
    by_location: BTreeMap<JsonPointer, Vec<AnnotationRecord>>,
}

impl AnnotationContext {
    /// Index `records` by instance location.
    pub fn from_records(records: &[AnnotationRecord]) -> Self {
        let mut by_location: BTreeMap<JsonPointer, Vec<AnnotationRecord>> = BTreeMap::new();
        for record in records {
            by_location
                .entry(record.instance_location.clone())
                .or_default()
                .push(record.clone());
        }
        Self { by_location }
    }

    /// Every annotation at `location`.
    pub fn at(&self, location: &JsonPointer) -> &[AnnotationRecord] {
        self.by_location
            .get(location)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Values of the annotations named `name` at `location`, from any
    /// keyword location.
    pub fn values<'c>(
        &'c self,
        location: &JsonPointer,
        name: &'c str,
    ) -> impl Iterator<Item = &'c Value> + 'c {
        self.at(location)
            .iter()
            .filter(move |r| r.name() == name)
            .map(AnnotationRecord::value)
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// One entry of the dynamic scope: a resource entered on the way to the
/// current schema. Entries link outward to the resource entered before.
#[derive(Debug, Clone, Copy)]
pub struct DynamicScope<'a> {
    resource: ResourceId,
    parent: Option<&'a DynamicScope<'a>>,
}

impl<'a> DynamicScope<'a> {
    /// Resources from the outermost inward.
    fn outermost_first(&self) -> Vec<ResourceId> {
        let mut chain = vec![self.resource];
        let mut current = self.parent;
        while let Some(scope) = current {
            chain.push(scope.resource);
            current = scope.parent;
        }
        chain.reverse();
        chain
    }
}

/// The evaluation state an [`Applicator`](crate::Applicator) sees.
pub struct Frame<'a> {
    schema: &'a CompiledSchema,
    instance: &'a Value,
    scope: &'a DynamicScope<'a>,
    depth: usize,
}

impl<'a> Frame<'a> {
    /// The instance at this frame.
    pub fn instance(&self) -> &'a Value {
        self.instance
    }

    /// Number of subschemas entered to reach this frame.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Evaluate subschema `node` against `instance` (this frame's instance
    /// or a part of it). Locations in the result are relative to `node`.
    /// A failing subschema's annotations are dropped.
    pub fn evaluate(&self, node: SchemaId, instance: &Value) -> Outcome {
        let mut outcome = evaluate_node(self.schema, node, instance, Some(self.scope), self.depth + 1);
        if !outcome.is_valid() {
            outcome.annotations.clear();
        }
        outcome
    }

    /// [`Frame::evaluate`] against this frame's own instance.
    pub fn evaluate_in_place(&self, node: SchemaId) -> Outcome {
        self.evaluate(node, self.instance)
    }

    /// The outermost schema in the dynamic scope declaring
    /// `$dynamicAnchor: name`.
    pub fn dynamic_anchor(&self, name: &str) -> Option<SchemaId> {
        self.scope
            .outermost_first()
            .into_iter()
            .find_map(|resource| self.schema.dynamic_anchor(resource, name))
    }
}

fn reads_annotations(keyword: &dyn Keyword) -> bool {
    keyword
        .as_applicator()
        .is_some_and(|applicator| applicator.reads_annotations())
}

fn run_keyword(keyword: &dyn Keyword, frame: &Frame<'_>, context: &AnnotationContext) -> Outcome {
    let mut outcome = Outcome::default();
    let location = JsonPointer::from_tokens([keyword.name()]);

    if keyword.has_category(Category::Assertion) || keyword.has_category(Category::Applicator) {
        if let Some(applicator) = keyword.as_applicator() {
            outcome.merge(applicator.apply(frame, context));
        } else if let Some(assertion) = keyword.as_assertion() {
            let root = JsonPointer::root();
            outcome.violations = assertion
                .violations_by(frame.instance())
                .into_iter()
                .map(|mut v| {
                    v.relocate(&location, &root);
                    v
                })
                .collect();
        }
    }

    if keyword.has_category(Category::Annotation) {
        match keyword.as_annotation() {
            Ok(annotation) => outcome.push_annotation(AnnotationRecord::new(annotation).at_keyword(location)),
            Err(e) => tracing::trace!(error = %e, "annotation view unavailable"),
        }
    }
    outcome
}

pub(crate) fn evaluate_node(
    schema: &CompiledSchema,
    id: SchemaId,
    instance: &Value,
    parent: Option<&DynamicScope<'_>>,
    depth: usize,
) -> Outcome {
    let node = schema.node(id);
    if depth > schema.config.max_depth {
        return Outcome::fatal(EvaluationError::DepthExceeded {
            max_depth: schema.config.max_depth,
            schema_location: node.absolute.clone(),
            instance_location: JsonPointer::root(),
        });
    }

    let keywords = match &node.kind {
        NodeKind::Boolean(true) => return Outcome::default(),
        NodeKind::Boolean(false) => {
            let mut outcome = Outcome::from_violation(Violation::new(
                "false",
                "the false schema rejects every instance",
            ));
            outcome.anchor(&node.absolute);
            return outcome;
        }
        NodeKind::Keywords(keywords) => keywords,
    };

    let pushed;
    let scope = match parent {
        Some(scope) if scope.resource == node.resource => scope,
        _ => {
            pushed = DynamicScope {
                resource: node.resource,
                parent,
            };
            &pushed
        }
    };
    let frame = Frame {
        schema,
        instance,
        scope,
        depth,
    };

    let (dependents, independents): (Vec<&dyn Keyword>, Vec<&dyn Keyword>) = keywords
        .iter()
        .map(|k| &**k)
        .partition(|k| reads_annotations(*k));

    let mut outcome = Outcome::default();
    let empty = AnnotationContext::default();
    for keyword in independents {
        outcome.merge(run_keyword(keyword, &frame, &empty));
        if outcome.is_fatal() {
            return outcome;
        }
    }

    if !dependents.is_empty() {
        let context = AnnotationContext::from_records(&outcome.annotations);
        for keyword in dependents {
            outcome.merge(run_keyword(keyword, &frame, &context));
            if outcome.is_fatal() {
                return outcome;
            }
        }
    }

    outcome.anchor(&node.absolute);
    outcome
}

impl CompiledSchema {
    /// Evaluate `instance` and return the full structured result.
    ///
    /// # Errors
    ///
    /// `EvaluationError::DepthExceeded` when evaluation nests deeper than
    /// the configured ceiling. `EvaluationError::StackUnavailable` when a
    /// ceiling above the default cannot get its evaluation thread.
    pub fn validate(&self, instance: &Value) -> Result<ValidationResult, EvaluationError> {
        if self.config.max_depth <= INLINE_DEPTH {
            return self.validate_inline(instance);
        }
        let stack_size = STACK_BASE.saturating_add(self.config.max_depth.saturating_mul(STACK_PER_LEVEL));
        thread::scope(|scope| {
            let handle = thread::Builder::new()
                .name("schemata-evaluate".to_string())
                .stack_size(stack_size)
                .spawn_scoped(scope, || self.validate_inline(instance))
                .map_err(|e| EvaluationError::StackUnavailable {
                    stack_size,
                    reason: e.to_string(),
                })?;
            handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        })
    }

    fn validate_inline(&self, instance: &Value) -> Result<ValidationResult, EvaluationError> {
        let (violations, annotations, fatal) =
            evaluate_node(self, self.root, instance, None, 0).into_parts();
        if let Some(error) = fatal {
            tracing::warn!(error = %error, "evaluation aborted");
            return Err(error);
        }
        let annotations = if self.config.collect_annotations {
            annotations
        } else {
            Vec::new()
        };
        Ok(ValidationResult::new(violations, annotations))
    }

    /// Whether `instance` is valid. An aborted evaluation counts as invalid.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_ok_and(|result| result.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemata_core::Annotation;
    use serde_json::json;

    fn record(name: &str, value: Value, instance: &[&str]) -> AnnotationRecord {
        let mut r = AnnotationRecord::new(Annotation::new(name, Some(value)));
        r.instance_location = JsonPointer::from_tokens(instance.iter().copied());
        r
    }

    #[test]
    fn test_outcome_merge_keeps_first_fatal() {
        let mut a = Outcome::from_violation(Violation::new("type", "x"));
        let first = EvaluationError::DepthExceeded {
            max_depth: 1,
            schema_location: "first".into(),
            instance_location: JsonPointer::root(),
        };
        let second = EvaluationError::DepthExceeded {
            max_depth: 1,
            schema_location: "second".into(),
            instance_location: JsonPointer::root(),
        };
        a.merge(Outcome::fatal(first.clone()));
        a.merge(Outcome::fatal(second));
        assert!(a.is_fatal());
        assert_eq!(a.fatal_error(), Some(&first));
        assert_eq!(a.violations.len(), 1);
    }

    #[test]
    fn test_outcome_relocate() {
        let mut outcome = Outcome::from_violation(
            Violation::new("minimum", "too small").at_keyword(JsonPointer::from_tokens(["minimum"])),
        );
        outcome.push_annotation(record("title", json!("t"), &[]));
        let outcome = outcome.relocate(
            &JsonPointer::from_tokens(["properties", "age"]),
            &JsonPointer::from_tokens(["age"]),
        );
        let v = outcome.violations.iter().next().unwrap();
        assert_eq!(v.keyword_location.to_string(), "/properties/age/minimum");
        assert_eq!(v.instance_location.to_string(), "/age");
        assert_eq!(outcome.annotations[0].instance_location.to_string(), "/age");
    }

    #[test]
    fn test_outcome_anchor_fills_only_missing() {
        let mut outcome = Outcome::default();
        outcome.push_violation(Violation::new("type", "x").at_keyword(JsonPointer::from_tokens(["type"])));
        let mut inner = Violation::new("minimum", "y");
        inner.absolute_keyword_location = Some("https://example.com/s#/minimum".into());
        outcome.push_violation(inner);
        outcome.anchor("json-schema:///#/properties/a");
        let absolutes: Vec<_> = outcome
            .violations
            .iter()
            .filter_map(|v| v.absolute_keyword_location.clone())
            .collect();
        assert!(absolutes.contains(&"json-schema:///#/properties/a/type".to_string()));
        assert!(absolutes.contains(&"https://example.com/s#/minimum".to_string()));
    }

    #[test]
    fn test_annotation_context_keyed_by_location() {
        let context = AnnotationContext::from_records(&[
            record("properties", json!(["a"]), &[]),
            record("properties", json!(["b"]), &[]),
            record("title", json!("nested"), &["a"]),
        ]);
        let names: Vec<&Value> = context.values(&JsonPointer::root(), "properties").collect();
        assert_eq!(names, vec![&json!(["a"]), &json!(["b"])]);
        assert_eq!(context.at(&JsonPointer::from_tokens(["a"])).len(), 1);
        assert!(context.at(&JsonPointer::from_tokens(["zzz"])).is_empty());
        assert!(AnnotationContext::default().is_empty());
    }

    #[test]
    fn test_dynamic_scope_order() {
        let outer = DynamicScope {
            resource: ResourceId(0),
            parent: None,
        };
        let middle = DynamicScope {
            resource: ResourceId(3),
            parent: Some(&outer),
        };
        let inner = DynamicScope {
            resource: ResourceId(1),
            parent: Some(&middle),
        };
        assert_eq!(
            inner.outermost_first(),
            vec![ResourceId(0), ResourceId(3), ResourceId(1)]
        );
    }
}

//! # Validation Output
//!
//! [`ValidationResult`] is what callers get back: the verdict, every
//! violation, and the annotations collected along the way. It serializes
//! to JSON with `serde` and renders as a readable list with `Display`.

use std::fmt;

use schemata_core::{AnnotationRecord, Violation, Violations};
use serde::Serialize;
use serde_json::Value;

/// The complete result of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// True iff `violations` is empty.
    pub valid: bool,
    /// Every failed assertion, sorted by instance location and deduplicated.
    pub violations: Vec<Violation>,
    /// Annotations, present whether or not the instance is valid.
    pub annotations: Vec<AnnotationRecord>,
}

impl ValidationResult {
    /// Build a result. Validity is derived from `violations`.
    pub fn new(violations: Violations, annotations: Vec<AnnotationRecord>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations: violations.into_iter().collect(),
            annotations,
        }
    }

    /// True iff there are no violations.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Violations raised by keyword `name`.
    pub fn violations_of<'r>(&'r self, name: &'r str) -> impl Iterator<Item = &'r Violation> + 'r {
        self.violations.iter().filter(move |v| v.keyword == name)
    }

    /// Annotations named `name`.
    pub fn annotations_named<'r>(
        &'r self,
        name: &'r str,
    ) -> impl Iterator<Item = &'r AnnotationRecord> + 'r {
        self.annotations.iter().filter(move |a| a.name() == name)
    }

    /// The result as a JSON value.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return write!(f, "valid ({} annotations)", self.annotations.len());
        }
        write!(f, "invalid ({} violations)", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "\n{violation}")?;
        }
        Ok(())
    }
}

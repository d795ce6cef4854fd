//! # Annotations
//!
//! An [`Annotation`] is the non-failing counterpart of a violation: a named
//! JSON value a keyword contributes to the evaluation result. An
//! [`AnnotationRecord`] is an annotation placed in the output, with the
//! locations of the keyword that produced it and the instance it describes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pointer::JsonPointer;

/// A `(name, value)` pair.
///
/// The value is never missing: constructing an annotation without a value
/// stores JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    name: String,
    value: Value,
}

impl Annotation {
    /// Create an annotation. `None` is normalized to JSON `null`.
    pub fn new(name: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.unwrap_or(Value::Null),
        }
    }

    /// The annotation name (the producing keyword's name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The annotation value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Exact name match.
    pub fn has_name(&self, name: &str) -> bool {
        self.name == name
    }

    /// Split into name and value.
    pub fn into_parts(self) -> (String, Value) {
        (self.name, self.value)
    }
}

/// An annotation as it appears in an evaluation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Location in the instance the annotation describes.
    pub instance_location: JsonPointer,
    /// Evaluation path of the producing keyword.
    pub keyword_location: JsonPointer,
    /// Canonical URI of the producing keyword.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_keyword_location: Option<String>,
    /// The annotation itself.
    #[serde(flatten)]
    pub annotation: Annotation,
}

impl AnnotationRecord {
    /// A record located at the root of both schema and instance.
    pub fn new(annotation: Annotation) -> Self {
        Self {
            instance_location: JsonPointer::root(),
            keyword_location: JsonPointer::root(),
            absolute_keyword_location: None,
            annotation,
        }
    }

    /// Set the keyword location.
    pub fn at_keyword(mut self, keyword_location: JsonPointer) -> Self {
        self.keyword_location = keyword_location;
        self
    }

    /// Name of the producing keyword.
    pub fn name(&self) -> &str {
        self.annotation.name()
    }

    /// The annotation value.
    pub fn value(&self) -> &Value {
        self.annotation.value()
    }

    /// Prefix both locations. See [`Violation::relocate`](crate::Violation::relocate).
    pub fn relocate(&mut self, keyword_prefix: &JsonPointer, instance_prefix: &JsonPointer) {
        if !keyword_prefix.is_empty() {
            self.keyword_location = keyword_prefix.concat(&self.keyword_location);
        }
        if !instance_prefix.is_empty() {
            self.instance_location = instance_prefix.concat(&self.instance_location);
        }
    }

    /// Fill in the absolute keyword location unless an inner schema already did.
    pub fn anchor_absolute(&mut self, absolute: impl FnOnce() -> String) {
        if self.absolute_keyword_location.is_none() {
            self.absolute_keyword_location = Some(absolute());
        }
    }
}

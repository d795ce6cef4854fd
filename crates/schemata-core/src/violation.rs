//! # Violations
//!
//! A [`Violation`] is the structured record of one failed assertion. It
//! names the failing keyword, where in the schema the keyword sits, where in
//! the instance the failure happened, and why.
//!
//! ## Relative Locations
//!
//! Leaf constraints do not know where they are. They emit violations with
//! root locations, and every applicator on the way back up prefixes its own
//! path segment via [`Violation::relocate`]. By the time a violation leaves
//! the engine its locations are relative to the evaluation root.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pointer::JsonPointer;

/// A deduplicated, ordered set of violations. Empty means satisfied.
pub type Violations = BTreeSet<Violation>;

/// One failed assertion.
///
/// Field order matters: violations sort by instance location first, so a
/// rendered list reads top-down through the instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Violation {
    /// Location of the offending value in the instance.
    pub instance_location: JsonPointer,
    /// Evaluation path of the failing keyword, through any `$ref`s.
    pub keyword_location: JsonPointer,
    /// Canonical URI of the failing keyword in its schema resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_keyword_location: Option<String>,
    /// Name of the failing keyword.
    pub keyword: String,
    /// Human-readable reason.
    pub reason: String,
}

impl Violation {
    /// A violation located at the root of both schema and instance.
    pub fn new(keyword: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            instance_location: JsonPointer::root(),
            keyword_location: JsonPointer::root(),
            absolute_keyword_location: None,
            keyword: keyword.into(),
            reason: reason.into(),
        }
    }

    /// Set the keyword location.
    pub fn at_keyword(mut self, keyword_location: JsonPointer) -> Self {
        self.keyword_location = keyword_location;
        self
    }

    /// Set the instance location.
    pub fn at_instance(mut self, instance_location: JsonPointer) -> Self {
        self.instance_location = instance_location;
        self
    }

    /// Prefix both locations, as an applicator does when a subschema result
    /// passes back through it.
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

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_location.is_root() {
            write!(f, "  (root): {}", self.reason)?;
        } else {
            write!(f, "  {}: {}", self.instance_location, self.reason)?;
        }
        write!(f, " [{} at '{}']", self.keyword, self.keyword_location)
    }
}

//! # Format Capability
//!
//! The engine does not know what a valid email or URI looks like. It asks a
//! [`FormatCatalog`] for a `Condition<str>` by format name and treats the
//! answer as opaque. The standard catalog lives in `schemata-format`; any
//! other implementation can be plugged in.

use std::fmt;
use std::sync::Arc;

use crate::condition::Condition;

/// A provider of string-format predicates.
pub trait FormatCatalog: Send + Sync + fmt::Debug {
    /// The condition for `name`, or `None` if the format is unknown.
    ///
    /// Unknown formats are not errors: the `format` keyword then stays a
    /// pure annotation.
    fn for_format(&self, name: &str) -> Option<Arc<dyn Condition<str>>>;
}

#![deny(missing_docs)]

//! # schemata-core — Foundational Types for the Schemata Engine
//!
//! This crate is the leaf of the schemata workspace. It defines the value
//! types and pure algebras every other crate builds on; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Locations are JSON Pointers.** Instance locations, keyword locations
//!    and `$ref` fragments all flow through [`JsonPointer`]. No bare strings
//!    for paths.
//!
//! 2. **Two algebras, two result shapes.** A [`Condition`] answers yes/no.
//!    A [`Constraint`] answers with a set of [`Violation`]s, so the reason
//!    for every failure survives composition.
//!
//! 3. **Combinators are generic over the verdict.** [`AnyOf`], [`AllOf`],
//!    [`OneOf`] and [`Not`] work on any [`Verdict`], not only on plain
//!    violation sets. The engine plugs its richer per-subschema outcome into
//!    the same combinators instead of re-implementing `anyOf` and friends.
//!
//! 4. **Purity.** Every condition and constraint call is side-effect free
//!    and total for well-typed input.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `schemata-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod annotation;
pub mod condition;
pub mod constraint;
pub mod error;
pub mod format;
pub mod pointer;
pub mod violation;

// Re-export primary types for ergonomic imports.
pub use annotation::{Annotation, AnnotationRecord};
pub use condition::{
    predicate, Both, Condition, ConditionExt, Either, ForAll, Mapped, Negated, Predicate,
    PropertyPath,
};
pub use constraint::{AllOf, AnyOf, Check, Constraint, Not, OneOf, Verdict};
pub use error::{ConstraintError, PointerError, UnsupportedOperation};
pub use format::FormatCatalog;
pub use pointer::JsonPointer;
pub use violation::{Violation, Violations};

#![deny(missing_docs)]

//! # schemata-format — String Format Predicates
//!
//! The grammar-interpretation side of the `format` keyword. The engine asks
//! a [`FormatCatalog`](schemata_core::FormatCatalog) for a `Condition<str>`
//! by name; [`StandardFormats`] answers for the formats JSON Schema 2020-12
//! defines, built on `chrono`, `url`, `uuid`, `regex` and `std::net`.
//!
//! ## Crate Policy
//!
//! - Depends only on `schemata-core` internally.
//! - Every check is a pure function of the input string.
//! - Unknown format names are `None`, never an error.

pub mod catalog;
pub mod grammar;

pub use catalog::StandardFormats;

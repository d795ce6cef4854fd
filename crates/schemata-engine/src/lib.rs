#![deny(missing_docs)]

//! # schemata-engine — JSON Schema 2020-12 Evaluation
//!
//! Compiles JSON Schema 2020-12 documents into an immutable arena and
//! evaluates instances against it, producing violations and annotations.
//!
//! ## Compilation (`compiler`)
//!
//! [`SchemaCompiler`] indexes every registered document (`$id`, `$anchor`,
//! `$dynamicAnchor`), resolves each resource's [`Dialect`] from `$schema`,
//! and asks the dialect's vocabularies for a [`KeywordType`] per member.
//! The result is a [`CompiledSchema`]: `Send + Sync`, reusable, and free of
//! interior mutability.
//!
//! ## Evaluation (`evaluator`)
//!
//! [`CompiledSchema::validate`] walks the arena against an instance and
//! returns a [`ValidationResult`]. Assertion failures are data, never
//! errors. The only evaluation error is the recursion ceiling.
//!
//! ## Extension
//!
//! Vocabularies are plain values. Build one with [`Vocabulary::builder`],
//! publish it through a [`CustomVocabularies`] loader, and declare it in a
//! dialect document's `$vocabulary`:
//!
//! ```
//! use schemata_engine::{
//!     CustomVocabularies, DefaultAnnotation, FnKeywordType, Keyword, SchemaCompiler, Vocabulary,
//!     VocabularyRegistry,
//! };
//! use serde_json::json;
//!
//! let tags = Vocabulary::builder("https://example.com/vocab/tags")
//!     .keyword_type(FnKeywordType::new("x-tag", |value, _| {
//!         Ok(Box::new(DefaultAnnotation::new("x-tag", Some(value.clone()))) as Box<dyn Keyword>)
//!     }))
//!     .build();
//! let compiler = SchemaCompiler::new()
//!     .with_registry(VocabularyRegistry::official().with_loader(CustomVocabularies::new().with(tags)))
//!     .with_document(
//!         "https://example.com/dialect",
//!         json!({"$vocabulary": {
//!             "https://json-schema.org/draft/2020-12/vocab/core": true,
//!             "https://example.com/vocab/tags": true
//!         }}),
//!     );
//! let schema = compiler
//!     .compile(&json!({"$schema": "https://example.com/dialect", "x-tag": "internal"}))
//!     .unwrap();
//! assert!(schema.is_valid(&json!(1)));
//! ```
//!
//! ## Crate Policy
//!
//! - Depends on `schemata-core` and `schemata-format` internally.
//! - No I/O during compilation or evaluation; every referenced document is
//!   registered up front.
//! - No global state. Registries, catalogs and configuration are values.

pub mod compiler;
pub mod config;
pub mod dialect;
pub mod error;
pub mod evaluator;
pub mod keyword;
pub mod keywords;
pub mod output;
pub mod vocabulary;

pub use compiler::{CompileContext, CompiledSchema, SchemaCompiler, SchemaId, DEFAULT_BASE_URI};
pub use config::EngineConfig;
pub use dialect::{Dialect, VocabularyDeclaration, METASCHEMA_2020_12};
pub use error::{CompileError, ConfigError, EvaluationError, SchemataError, VocabularyError};
pub use evaluator::{AnnotationContext, DynamicScope, Frame, Outcome};
pub use keyword::{
    Applicator, Category, CategorySet, DefaultAnnotation, FnKeywordType, Keyword, KeywordType, Reserved,
};
pub use output::ValidationResult;
pub use vocabulary::{
    uri, CustomVocabularies, OfficialVocabularies, Vocabulary, VocabularyLoader, VocabularyRegistry,
};

use serde_json::Value;

/// Compile `schema` with the default compiler and evaluate `instance`.
///
/// # Errors
///
/// [`SchemataError::Compile`] if the schema is rejected,
/// [`SchemataError::Evaluation`] if evaluation hits the depth ceiling.
pub fn validate(schema: &Value, instance: &Value) -> Result<ValidationResult, SchemataError> {
    let compiled = SchemaCompiler::new().compile(schema)?;
    Ok(compiled.validate(instance)?)
}

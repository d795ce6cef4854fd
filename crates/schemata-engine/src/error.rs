//! # Engine Error Types
//!
//! Two disjoint classes. Compile-time failures ([`CompileError`],
//! [`VocabularyError`]) reject a schema outright and carry enough context
//! (keyword, schema location, vocabulary URI) to fix it. Evaluation never
//! fails for an ordinary assertion; the only evaluation-time error is the
//! recursion ceiling ([`EvaluationError`]).

use schemata_core::{ConstraintError, JsonPointer};
use thiserror::Error;

/// A schema could not be compiled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A keyword value has the wrong shape for that keyword.
    #[error("malformed keyword '{keyword}' at '{location}': {reason}")]
    MalformedKeyword {
        /// Keyword name.
        keyword: String,
        /// Schema location of the keyword (URI with JSON Pointer fragment).
        location: String,
        /// What was wrong.
        reason: String,
    },

    /// A subschema position holds something other than an object or boolean.
    #[error("schema at '{location}' must be an object or a boolean, found {found}")]
    InvalidSchema {
        /// Schema location.
        location: String,
        /// JSON type actually found.
        found: &'static str,
    },

    /// A `$ref`, `$dynamicRef` or dialect URI did not resolve to a known location.
    #[error("unresolvable reference '{reference}' at '{location}'")]
    UnresolvableReference {
        /// The reference as written.
        reference: String,
        /// Schema location of the referencing keyword.
        location: String,
    },

    /// An `$id` or reference is not a valid URI reference.
    #[error("invalid URI '{uri}' at '{location}': {reason}")]
    InvalidUri {
        /// The offending URI text.
        uri: String,
        /// Schema location.
        location: String,
        /// Parser message.
        reason: String,
    },

    /// Two different schema locations claim the same resource URI.
    #[error("resource URI '{uri}' is declared more than once")]
    DuplicateResource {
        /// The contested URI.
        uri: String,
    },

    /// `$schema` names neither the 2020-12 metaschema nor a registered document.
    #[error("unknown dialect '{uri}'")]
    UnknownDialect {
        /// The `$schema` URI.
        uri: String,
    },

    /// A dialect document is unusable.
    #[error("invalid dialect '{uri}': {reason}")]
    InvalidDialect {
        /// The dialect URI.
        uri: String,
        /// What was wrong.
        reason: String,
    },

    /// A required vocabulary could not be resolved.
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
}

impl CompileError {
    /// Convenience constructor for [`CompileError::MalformedKeyword`].
    pub fn malformed(
        keyword: impl Into<String>,
        location: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedKeyword {
            keyword: keyword.into(),
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Attach keyword context to a combinator construction failure.
    pub fn from_constraint(
        error: ConstraintError,
        keyword: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::malformed(keyword, location, error.to_string())
    }
}

/// A vocabulary declaration could not be satisfied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VocabularyError {
    /// No registered catalog knows a vocabulary the dialect requires.
    #[error("required vocabulary '{uri}' is not available from any registered catalog (dialect '{dialect}')")]
    RequiredUnavailable {
        /// The vocabulary URI.
        uri: String,
        /// The dialect that declared it.
        dialect: String,
    },

    /// A dialect omits the core vocabulary.
    #[error("dialect '{dialect}' does not declare the core vocabulary")]
    MissingCore {
        /// The dialect URI.
        dialect: String,
    },
}

/// Evaluation was aborted before producing a complete result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// The recursion ceiling was reached, typically through a cyclic
    /// reference applied to deep instance data.
    #[error("evaluation exceeded maximum depth {max_depth} at schema '{schema_location}', instance location '{instance_location}'")]
    DepthExceeded {
        /// The configured ceiling.
        max_depth: usize,
        /// Absolute location of the schema that would have been entered.
        schema_location: String,
        /// Instance location, relative to the evaluation root.
        instance_location: JsonPointer,
    },

    /// The thread that evaluates under a raised ceiling could not start.
    #[error("could not start evaluation thread with a {stack_size} byte stack: {reason}")]
    StackUnavailable {
        /// Requested stack size in bytes.
        stack_size: usize,
        /// OS error message.
        reason: String,
    },
}

/// Engine configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration text did not parse.
    #[error("config parse error ({format}): {reason}")]
    Parse {
        /// `"yaml"` or `"json"`.
        format: &'static str,
        /// Parser message.
        reason: String,
    },

    /// IO error reading a configuration file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for callers that compile and evaluate in one step.
#[derive(Error, Debug)]
pub enum SchemataError {
    /// Schema compilation failed.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// Evaluation was aborted.
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_keyword_display() {
        let err = CompileError::malformed("minLength", "json-schema:///#/minLength", "expected a non-negative integer");
        let msg = format!("{err}");
        assert!(msg.contains("minLength"));
        assert!(msg.contains("json-schema:///#/minLength"));
    }

    #[test]
    fn test_constraint_error_carries_keyword() {
        let err = CompileError::from_constraint(
            ConstraintError::NoOperands { combinator: "anyOf" },
            "anyOf",
            "json-schema:///#/anyOf",
        );
        match err {
            CompileError::MalformedKeyword { keyword, .. } => assert_eq!(keyword, "anyOf"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_vocabulary_error_converts() {
        let err: CompileError = VocabularyError::RequiredUnavailable {
            uri: "https://example.com/vocab/x".into(),
            dialect: "https://example.com/dialect".into(),
        }
        .into();
        assert!(format!("{err}").contains("https://example.com/vocab/x"));
        let top: SchemataError = err.into();
        assert!(format!("{top}").starts_with("compile error"));
    }

    #[test]
    fn test_depth_exceeded_display() {
        let err = EvaluationError::DepthExceeded {
            max_depth: 8,
            schema_location: "json-schema:///#".into(),
            instance_location: JsonPointer::from_tokens(["a", "a"]),
        };
        assert!(format!("{err}").contains("maximum depth 8"));
        assert!(format!("{err}").contains("/a/a"));
    }
}

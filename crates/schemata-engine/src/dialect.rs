//! # Dialects
//!
//! A [`Dialect`] is the ordered list of vocabularies a schema resource
//! declares through `$schema`. Keyword lookup scans the vocabularies in
//! declaration order and the first one that recognizes a member name
//! supplies its keyword type.
//!
//! The official 2020-12 metaschema is built in. Any other `$schema` must
//! name a registered document whose `$vocabulary` object lists the
//! declarations.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{CompileError, VocabularyError};
use crate::keyword::KeywordType;
use crate::vocabulary::{uri, Vocabulary, VocabularyRegistry};

/// The 2020-12 metaschema URI.
pub const METASCHEMA_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

/// One `(uri, required)` entry of a dialect's `$vocabulary` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyDeclaration {
    /// Vocabulary URI.
    pub uri: String,
    /// Whether the dialect is unusable without it.
    pub required: bool,
}

impl VocabularyDeclaration {
    /// Declare `uri`.
    pub fn new(uri: impl Into<String>, required: bool) -> Self {
        Self {
            uri: uri.into(),
            required,
        }
    }

    /// Read declarations from a `$vocabulary` object, in document order.
    ///
    /// # Errors
    ///
    /// `CompileError::InvalidDialect` unless `value` is an object of booleans.
    pub fn parse_all(dialect: &str, value: &Value) -> Result<Vec<Self>, CompileError> {
        let invalid = |reason: String| CompileError::InvalidDialect {
            uri: dialect.to_string(),
            reason,
        };
        let map = value
            .as_object()
            .ok_or_else(|| invalid("$vocabulary must be an object".to_string()))?;
        map.iter()
            .map(|(uri, required)| {
                required
                    .as_bool()
                    .map(|required| Self::new(uri.clone(), required))
                    .ok_or_else(|| invalid(format!("$vocabulary entry '{uri}' must be a boolean")))
            })
            .collect()
    }
}

/// The declarations of the 2020-12 metaschema.
pub fn official_declarations() -> Vec<VocabularyDeclaration> {
    uri::OFFICIAL
        .iter()
        .map(|id| VocabularyDeclaration::new(*id, *id != uri::FORMAT_ANNOTATION))
        .collect()
}

/// A resolved dialect.
#[derive(Debug)]
pub struct Dialect {
    uri: String,
    vocabularies: Vec<Arc<Vocabulary>>,
}

impl Dialect {
    /// Resolve every declaration against `registry`.
    ///
    /// # Errors
    ///
    /// - `VocabularyError::RequiredUnavailable` for a missing required vocabulary.
    /// - `VocabularyError::MissingCore` when the core vocabulary is not declared.
    pub fn resolve(
        uri: impl Into<String>,
        declarations: &[VocabularyDeclaration],
        registry: &VocabularyRegistry,
    ) -> Result<Self, VocabularyError> {
        let uri = uri.into();
        if !declarations.iter().any(|d| d.uri == uri::CORE) {
            return Err(VocabularyError::MissingCore { dialect: uri });
        }
        let mut vocabularies = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            if let Some(vocabulary) = registry.resolve(declaration, &uri)? {
                vocabularies.push(vocabulary);
            }
        }
        tracing::debug!(dialect = %uri, vocabularies = vocabularies.len(), "dialect resolved");
        Ok(Self { uri, vocabularies })
    }

    /// The built-in 2020-12 dialect.
    pub fn official(registry: &VocabularyRegistry) -> Result<Self, VocabularyError> {
        Self::resolve(METASCHEMA_2020_12, &official_declarations(), registry)
    }

    /// The `$schema` URI this dialect was resolved for.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Resolved vocabularies in declaration order.
    pub fn vocabularies(&self) -> &[Arc<Vocabulary>] {
        &self.vocabularies
    }

    /// Whether the vocabulary `id` was resolved.
    pub fn has_vocabulary(&self, id: &str) -> bool {
        self.vocabularies.iter().any(|v| v.id() == id)
    }

    /// The keyword type for `name` from the first vocabulary recognizing it.
    pub fn keyword_type(&self, name: &str) -> Option<&dyn KeywordType> {
        self.vocabularies.iter().find_map(|v| v.keyword_type(name))
    }
}

//! # Vocabularies and Catalogs
//!
//! A [`Vocabulary`] is an immutable, URI-identified map from keyword name to
//! [`KeywordType`]. Vocabularies are published by [`VocabularyLoader`]s; the
//! [`VocabularyRegistry`] asks its loaders in registration order and takes
//! the first answer. Two loaders claiming the same URI are never merged.
//!
//! The registry is an explicit value handed to the compiler. There is no
//! process-wide catalog.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::dialect::VocabularyDeclaration;
use crate::error::VocabularyError;
use crate::keyword::KeywordType;
use crate::keywords;

/// URIs of the seven official 2020-12 vocabularies.
pub mod uri {
    /// Identifiers, references, definitions.
    pub const CORE: &str = "https://json-schema.org/draft/2020-12/vocab/core";
    /// Subschema application and composition.
    pub const APPLICATOR: &str = "https://json-schema.org/draft/2020-12/vocab/applicator";
    /// Structural assertions.
    pub const VALIDATION: &str = "https://json-schema.org/draft/2020-12/vocab/validation";
    /// Titles, descriptions, defaults.
    pub const META_DATA: &str = "https://json-schema.org/draft/2020-12/vocab/meta-data";
    /// `format` as an annotation.
    pub const FORMAT_ANNOTATION: &str =
        "https://json-schema.org/draft/2020-12/vocab/format-annotation";
    /// `unevaluatedItems` and `unevaluatedProperties`.
    pub const UNEVALUATED: &str = "https://json-schema.org/draft/2020-12/vocab/unevaluated";
    /// String-encoded content.
    pub const CONTENT: &str = "https://json-schema.org/draft/2020-12/vocab/content";

    /// All seven, in the order the 2020-12 metaschema declares them.
    pub const OFFICIAL: [&str; 7] = [
        CORE,
        APPLICATOR,
        UNEVALUATED,
        VALIDATION,
        META_DATA,
        FORMAT_ANNOTATION,
        CONTENT,
    ];
}

/// An immutable catalog of keyword types.
pub struct Vocabulary {
    id: String,
    keyword_types: BTreeMap<String, Arc<dyn KeywordType>>,
}

impl Vocabulary {
    /// Start building a vocabulary identified by `id`.
    pub fn builder(id: impl Into<String>) -> VocabularyBuilder {
        VocabularyBuilder {
            id: id.into(),
            keyword_types: BTreeMap::new(),
        }
    }

    /// The vocabulary URI.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The keyword type registered under `name`.
    pub fn keyword_type(&self, name: &str) -> Option<&dyn KeywordType> {
        self.keyword_types.get(name).map(|kt| kt.as_ref())
    }

    /// Whether `name` is one of this vocabulary's keywords.
    pub fn recognizes(&self, name: &str) -> bool {
        self.keyword_types.contains_key(name)
    }

    /// Keyword names, sorted.
    pub fn keyword_names(&self) -> impl Iterator<Item = &str> {
        self.keyword_types.keys().map(String::as_str)
    }
}

impl fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vocabulary")
            .field("id", &self.id)
            .field("keywords", &self.keyword_types.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`Vocabulary`]. The only way to add keyword types.
pub struct VocabularyBuilder {
    id: String,
    keyword_types: BTreeMap<String, Arc<dyn KeywordType>>,
}

impl VocabularyBuilder {
    /// Register a keyword type under its own name. A later registration of
    /// the same name replaces the earlier one.
    pub fn keyword_type(mut self, keyword_type: impl KeywordType + 'static) -> Self {
        let name = keyword_type.name().to_string();
        if self
            .keyword_types
            .insert(name.clone(), Arc::new(keyword_type))
            .is_some()
        {
            tracing::warn!(vocabulary = %self.id, keyword = %name, "keyword type registered twice, keeping the last");
        }
        self
    }

    /// Freeze the vocabulary.
    pub fn build(self) -> Vocabulary {
        Vocabulary {
            id: self.id,
            keyword_types: self.keyword_types,
        }
    }
}

/// A provider of vocabularies by URI.
pub trait VocabularyLoader: Send + Sync + fmt::Debug {
    /// The vocabulary identified by `uri`, if this loader has it.
    fn load_vocabulary_with_id(&self, uri: &str) -> Option<Arc<Vocabulary>>;
}

/// The seven official 2020-12 vocabularies.
#[derive(Debug)]
pub struct OfficialVocabularies {
    vocabularies: HashMap<String, Arc<Vocabulary>>,
}

impl OfficialVocabularies {
    /// Build all seven vocabularies with their standard keyword types.
    pub fn new() -> Self {
        let vocabularies = keywords::official_vocabularies()
            .into_iter()
            .map(|v| (v.id().to_string(), Arc::new(v)))
            .collect();
        Self { vocabularies }
    }
}

impl Default for OfficialVocabularies {
    fn default() -> Self {
        Self::new()
    }
}

impl VocabularyLoader for OfficialVocabularies {
    fn load_vocabulary_with_id(&self, uri: &str) -> Option<Arc<Vocabulary>> {
        self.vocabularies.get(uri).cloned()
    }
}

/// A loader for caller-defined vocabularies.
#[derive(Debug, Default)]
pub struct CustomVocabularies {
    vocabularies: HashMap<String, Arc<Vocabulary>>,
}

impl CustomVocabularies {
    /// An empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `vocabulary`, replacing any earlier one with the same id.
    pub fn with(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabularies
            .insert(vocabulary.id().to_string(), Arc::new(vocabulary));
        self
    }
}

impl VocabularyLoader for CustomVocabularies {
    fn load_vocabulary_with_id(&self, uri: &str) -> Option<Arc<Vocabulary>> {
        self.vocabularies.get(uri).cloned()
    }
}

/// Ordered set of loaders consulted during dialect resolution.
#[derive(Debug, Clone, Default)]
pub struct VocabularyRegistry {
    loaders: Vec<Arc<dyn VocabularyLoader>>,
}

impl VocabularyRegistry {
    /// A registry with no loaders.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding only the official vocabularies.
    pub fn official() -> Self {
        Self::empty().with_loader(OfficialVocabularies::new())
    }

    /// Append a loader. Earlier loaders win on conflicting URIs.
    pub fn with_loader(mut self, loader: impl VocabularyLoader + 'static) -> Self {
        self.loaders.push(Arc::new(loader));
        self
    }

    /// First match across all loaders.
    pub fn load_vocabulary_with_id(&self, uri: &str) -> Option<Arc<Vocabulary>> {
        self.loaders
            .iter()
            .find_map(|loader| loader.load_vocabulary_with_id(uri))
    }

    /// Resolve a declaration made by `dialect`.
    ///
    /// A missing optional vocabulary is `Ok(None)`; a missing required one
    /// is fatal.
    pub fn resolve(
        &self,
        declaration: &VocabularyDeclaration,
        dialect: &str,
    ) -> Result<Option<Arc<Vocabulary>>, VocabularyError> {
        match self.load_vocabulary_with_id(&declaration.uri) {
            Some(vocabulary) => {
                tracing::trace!(vocabulary = %declaration.uri, dialect, "vocabulary resolved");
                Ok(Some(vocabulary))
            }
            None if declaration.required => Err(VocabularyError::RequiredUnavailable {
                uri: declaration.uri.clone(),
                dialect: dialect.to_string(),
            }),
            None => {
                tracing::warn!(vocabulary = %declaration.uri, dialect, "optional vocabulary unavailable, its keywords become annotations");
                Ok(None)
            }
        }
    }
}

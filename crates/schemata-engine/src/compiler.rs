//! # Schema Compiler
//!
//! Turns a schema document (plus any documents registered up front) into a
//! [`CompiledSchema`]: an arena of nodes addressed by [`SchemaId`].
//!
//! ## Pipeline
//!
//! 1. **Index.** Every document is walked once. `$id`, `$anchor` and
//!    `$dynamicAnchor` inside known subschema positions are recorded against
//!    their resolved URIs. Each resource remembers its dialect (`$schema`,
//!    inherited from the enclosing resource, or the configured default).
//! 2. **Compile.** Starting at the root, each schema object is compiled
//!    member by member. The resource's dialect picks the keyword type; an
//!    unrecognized member becomes a [`DefaultAnnotation`]. Keyword types
//!    compile their subschemas through [`CompileContext`].
//! 3. **Dynamic anchors.** Every resource that was entered has its
//!    `$dynamicAnchor` subschemas compiled, so `$dynamicRef` can jump to them
//!    during evaluation.
//!
//! A node's slot in the arena is reserved before its members are compiled,
//! so a `$ref` cycle resolves to an existing handle instead of recursing.
//!
//! ## No I/O
//!
//! Nothing is fetched. A reference to a document that was not registered
//! with [`SchemaCompiler::with_document`] is a compile error.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use schemata_core::{FormatCatalog, JsonPointer};
use schemata_format::StandardFormats;
use serde_json::{Map, Value};
use url::Url;

use crate::config::EngineConfig;
use crate::dialect::{Dialect, VocabularyDeclaration, METASCHEMA_2020_12};
use crate::error::CompileError;
use crate::keyword::{DefaultAnnotation, Keyword};
use crate::vocabulary::VocabularyRegistry;

/// Base URI of a root schema without `$id`.
pub const DEFAULT_BASE_URI: &str = "json-schema:///";

/// Handle of a compiled schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(usize);

impl SchemaId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle of a schema resource (a document root or an embedded `$id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DocId(usize);

// ---------------------------------------------------------------------------
// Compiled form
// ---------------------------------------------------------------------------

pub(crate) enum NodeKind {
    Boolean(bool),
    Keywords(Vec<Box<dyn Keyword>>),
}

pub(crate) struct SchemaNode {
    pub(crate) kind: NodeKind,
    pub(crate) resource: ResourceId,
    /// `resource-uri#pointer`.
    pub(crate) absolute: String,
}

pub(crate) struct CompiledResource {
    pub(crate) uri: String,
    pub(crate) dynamic_anchors: BTreeMap<String, SchemaId>,
}

/// An immutable, thread-shareable compiled schema.
pub struct CompiledSchema {
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) resources: Vec<CompiledResource>,
    pub(crate) root: SchemaId,
    pub(crate) config: EngineConfig,
}

impl CompiledSchema {
    /// The root node.
    pub fn root(&self) -> SchemaId {
        self.root
    }

    /// Number of compiled nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Configuration this schema was compiled with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Keywords of `id`, empty for a boolean schema.
    pub fn keywords(&self, id: SchemaId) -> &[Box<dyn Keyword>] {
        match self.nodes.get(id.0).map(|n| &n.kind) {
            Some(NodeKind::Keywords(keywords)) => keywords,
            _ => &[],
        }
    }

    /// Absolute location of `id`.
    pub fn location(&self, id: SchemaId) -> Option<&str> {
        self.nodes.get(id.0).map(|n| n.absolute.as_str())
    }

    /// URI of the resource `id` belongs to.
    pub fn resource_uri(&self, id: SchemaId) -> Option<&str> {
        let node = self.nodes.get(id.0)?;
        self.resources.get(node.resource.0).map(|r| r.uri.as_str())
    }

    pub(crate) fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub(crate) fn dynamic_anchor(&self, resource: ResourceId, name: &str) -> Option<SchemaId> {
        self.resources
            .get(resource.0)
            .and_then(|r| r.dynamic_anchors.get(name))
            .copied()
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("root", &self.location(self.root))
            .field("nodes", &self.nodes.len())
            .field("resources", &self.resources.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// Compiles schemas against a vocabulary registry, a format catalog and a
/// set of pre-registered documents.
#[derive(Clone)]
pub struct SchemaCompiler {
    config: EngineConfig,
    registry: VocabularyRegistry,
    formats: Arc<dyn FormatCatalog>,
    documents: Vec<(String, Value)>,
}

impl SchemaCompiler {
    /// Default configuration, the official vocabularies and the standard
    /// format catalog.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            registry: VocabularyRegistry::official(),
            formats: Arc::new(StandardFormats::new()),
            documents: Vec::new(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config.normalized();
        self
    }

    /// Replace the vocabulary registry.
    pub fn with_registry(mut self, registry: VocabularyRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the format catalog.
    pub fn with_format_catalog(mut self, catalog: impl FormatCatalog + 'static) -> Self {
        self.formats = Arc::new(catalog);
        self
    }

    /// Make `document` available under `uri` for `$ref`, `$dynamicRef` and
    /// `$schema`.
    pub fn with_document(mut self, uri: impl Into<String>, document: Value) -> Self {
        self.documents.push((uri.into(), document));
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compile `schema`.
    ///
    /// # Errors
    ///
    /// Any [`CompileError`]: malformed keywords, unresolvable references,
    /// unusable dialects, missing required vocabularies.
    pub fn compile(&self, schema: &Value) -> Result<CompiledSchema, CompileError> {
        let mut compilation = Compilation::new(self);
        compilation.add_document(DEFAULT_BASE_URI, schema.clone())?;
        for (uri, document) in &self.documents {
            compilation.add_document(uri, document.clone())?;
        }
        let root = compilation.compile_at(DocId(0), JsonPointer::root())?;
        compilation.compile_dynamic_anchors()?;
        Ok(compilation.finish(root))
    }
}

impl Default for SchemaCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SchemaCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCompiler")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("formats", &self.formats)
            .field(
                "documents",
                &self.documents.iter().map(|(uri, _)| uri).collect::<Vec<_>>(),
            )
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Resource index
// ---------------------------------------------------------------------------

/// Subschema-holding keywords the indexer descends into.
const SINGLE_SUBSCHEMA: &[&str] = &[
    "additionalProperties",
    "contains",
    "contentSchema",
    "else",
    "if",
    "items",
    "not",
    "propertyNames",
    "then",
    "unevaluatedItems",
    "unevaluatedProperties",
];
const SUBSCHEMA_ARRAY: &[&str] = &["allOf", "anyOf", "oneOf", "prefixItems"];
const SUBSCHEMA_MAP: &[&str] = &[
    "$defs",
    "definitions",
    "dependentSchemas",
    "patternProperties",
    "properties",
];

struct IndexedResource {
    uri: Url,
    doc: DocId,
    pointer: JsonPointer,
    dialect: String,
    dynamic_anchors: BTreeMap<String, JsonPointer>,
}

#[derive(Default)]
struct ResourceIndex {
    resources: Vec<IndexedResource>,
    by_uri: HashMap<String, ResourceId>,
    anchors: HashMap<String, (DocId, JsonPointer)>,
}

impl ResourceIndex {
    fn register(
        &mut self,
        uri: Url,
        doc: DocId,
        pointer: JsonPointer,
        dialect: String,
    ) -> Result<ResourceId, CompileError> {
        if let Some(existing) = self.by_uri.get(uri.as_str()) {
            let resource = &self.resources[existing.0];
            if resource.doc == doc && resource.pointer == pointer {
                return Ok(*existing);
            }
            return Err(CompileError::DuplicateResource {
                uri: uri.to_string(),
            });
        }
        let id = ResourceId(self.resources.len());
        self.by_uri.insert(uri.to_string(), id);
        self.resources.push(IndexedResource {
            uri,
            doc,
            pointer,
            dialect,
            dynamic_anchors: BTreeMap::new(),
        });
        Ok(id)
    }

    fn walk(
        &mut self,
        doc: DocId,
        value: &Value,
        pointer: JsonPointer,
        resource: ResourceId,
    ) -> Result<(), CompileError> {
        let Value::Object(map) = value else {
            return Ok(());
        };

        let mut resource = resource;
        if let Some(Value::String(id)) = map.get("$id") {
            let current = &self.resources[resource.0];
            let location = self.absolute(resource, &pointer);
            let uri = join(&current.uri, id, &location)?;
            let dialect = map
                .get("$schema")
                .and_then(Value::as_str)
                .map_or_else(|| current.dialect.clone(), str::to_string);
            resource = self.register(uri, doc, pointer.clone(), dialect)?;
        }

        let base = self.resources[resource.0].uri.to_string();
        if let Some(Value::String(name)) = map.get("$anchor") {
            self.anchors
                .insert(format!("{base}#{name}"), (doc, pointer.clone()));
        }
        if let Some(Value::String(name)) = map.get("$dynamicAnchor") {
            self.anchors
                .insert(format!("{base}#{name}"), (doc, pointer.clone()));
            self.resources[resource.0]
                .dynamic_anchors
                .insert(name.clone(), pointer.clone());
        }

        for (key, child) in map {
            let key_str = key.as_str();
            if SINGLE_SUBSCHEMA.contains(&key_str) {
                self.walk(doc, child, pointer.child(key_str), resource)?;
            } else if SUBSCHEMA_ARRAY.contains(&key_str) {
                if let Value::Array(items) = child {
                    for (i, item) in items.iter().enumerate() {
                        self.walk(doc, item, pointer.child(key_str).index(i), resource)?;
                    }
                }
            } else if SUBSCHEMA_MAP.contains(&key_str) {
                if let Value::Object(members) = child {
                    for (name, item) in members {
                        self.walk(doc, item, pointer.child(key_str).child(name.as_str()), resource)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// The innermost resource containing `pointer` in `doc`.
    fn enclosing(&self, doc: DocId, pointer: &JsonPointer) -> Option<ResourceId> {
        self.resources
            .iter()
            .enumerate()
            .filter(|(_, r)| r.doc == doc && pointer.starts_with(&r.pointer))
            .max_by_key(|(i, r)| (r.pointer.len(), *i))
            .map(|(i, _)| ResourceId(i))
    }

    fn absolute(&self, resource: ResourceId, pointer: &JsonPointer) -> String {
        let r = &self.resources[resource.0];
        let relative = pointer.strip_prefix(&r.pointer).unwrap_or_default();
        format!("{}#{}", r.uri, relative)
    }
}

fn join(base: &Url, reference: &str, location: &str) -> Result<Url, CompileError> {
    let mut uri = base.join(reference).map_err(|e| CompileError::InvalidUri {
        uri: reference.to_string(),
        location: location.to_string(),
        reason: e.to_string(),
    })?;
    if uri.fragment() == Some("") {
        uri.set_fragment(None);
    }
    Ok(uri)
}

/// Decode `%XX` escapes in a URI fragment.
fn percent_decode(input: &str) -> String {
    fn hex(b: u8) -> Option<u8> {
        (b as char).to_digit(16).map(|d| d as u8)
    }
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(h * 16 + l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

struct Compilation {
    config: EngineConfig,
    registry: VocabularyRegistry,
    formats: Arc<dyn FormatCatalog>,
    documents: Vec<Arc<Value>>,
    index: ResourceIndex,
    nodes: Vec<SchemaNode>,
    memo: HashMap<(DocId, JsonPointer), SchemaId>,
    dialects: HashMap<String, Arc<Dialect>>,
    entered: HashSet<ResourceId>,
    pending: Vec<ResourceId>,
    dynamic: HashMap<ResourceId, BTreeMap<String, SchemaId>>,
}

impl Compilation {
    fn new(compiler: &SchemaCompiler) -> Self {
        Self {
            config: compiler.config.clone(),
            registry: compiler.registry.clone(),
            formats: Arc::clone(&compiler.formats),
            documents: Vec::new(),
            index: ResourceIndex::default(),
            nodes: Vec::new(),
            memo: HashMap::new(),
            dialects: HashMap::new(),
            entered: HashSet::new(),
            pending: Vec::new(),
            dynamic: HashMap::new(),
        }
    }

    fn add_document(&mut self, uri: &str, document: Value) -> Result<DocId, CompileError> {
        let mut url = Url::parse(uri).map_err(|e| CompileError::InvalidUri {
            uri: uri.to_string(),
            location: uri.to_string(),
            reason: e.to_string(),
        })?;
        url.set_fragment(None);

        let doc = DocId(self.documents.len());
        let document = Arc::new(document);
        self.documents.push(Arc::clone(&document));

        let dialect = document
            .get("$schema")
            .and_then(Value::as_str)
            .map_or_else(|| self.config.default_dialect.clone(), str::to_string);
        let resource = self
            .index
            .register(url, doc, JsonPointer::root(), dialect)?;
        self.index
            .walk(doc, &document, JsonPointer::root(), resource)?;
        Ok(doc)
    }

    fn dialect_for(&mut self, resource: ResourceId) -> Result<Arc<Dialect>, CompileError> {
        let uri = self.index.resources[resource.0].dialect.clone();
        if let Some(dialect) = self.dialects.get(&uri) {
            return Ok(Arc::clone(dialect));
        }

        let unknown = || CompileError::UnknownDialect { uri: uri.clone() };
        let normalized = Url::parse(&uri)
            .map(|mut u| {
                u.set_fragment(None);
                u.to_string()
            })
            .map_err(|_| unknown())?;

        let dialect = if normalized == METASCHEMA_2020_12 {
            Dialect::official(&self.registry)?
        } else {
            let declared = self.index.by_uri.get(&normalized).ok_or_else(unknown)?;
            let entry = &self.index.resources[declared.0];
            let document = Arc::clone(&self.documents[entry.doc.0]);
            let metaschema = entry.pointer.resolve(&document).ok_or_else(unknown)?;
            let vocabulary =
                metaschema
                    .get("$vocabulary")
                    .ok_or_else(|| CompileError::InvalidDialect {
                        uri: normalized.clone(),
                        reason: "metaschema has no $vocabulary".to_string(),
                    })?;
            let declarations = VocabularyDeclaration::parse_all(&normalized, vocabulary)?;
            Dialect::resolve(normalized.clone(), &declarations, &self.registry)?
        };

        let dialect = Arc::new(dialect);
        self.dialects.insert(uri, Arc::clone(&dialect));
        Ok(dialect)
    }

    fn compile_at(&mut self, doc: DocId, pointer: JsonPointer) -> Result<SchemaId, CompileError> {
        if let Some(id) = self.memo.get(&(doc, pointer.clone())) {
            return Ok(*id);
        }

        let resource = self
            .index
            .enclosing(doc, &pointer)
            .ok_or_else(|| CompileError::UnresolvableReference {
                reference: pointer.to_string(),
                location: pointer.to_string(),
            })?;
        let absolute = self.index.absolute(resource, &pointer);
        let document = Arc::clone(&self.documents[doc.0]);
        let value = pointer
            .resolve(&document)
            .ok_or_else(|| CompileError::UnresolvableReference {
                reference: pointer.to_string(),
                location: absolute.clone(),
            })?;

        let id = SchemaId(self.nodes.len());
        self.nodes.push(SchemaNode {
            kind: NodeKind::Boolean(true),
            resource,
            absolute: absolute.clone(),
        });
        self.memo.insert((doc, pointer.clone()), id);
        if self.entered.insert(resource) {
            self.pending.push(resource);
        }

        let kind = match value {
            Value::Bool(b) => NodeKind::Boolean(*b),
            Value::Object(map) => {
                NodeKind::Keywords(self.compile_keywords(doc, &pointer, resource, map)?)
            }
            other => {
                return Err(CompileError::InvalidSchema {
                    location: absolute,
                    found: json_type(other),
                })
            }
        };
        self.nodes[id.0].kind = kind;
        Ok(id)
    }

    fn compile_keywords(
        &mut self,
        doc: DocId,
        pointer: &JsonPointer,
        resource: ResourceId,
        map: &Map<String, Value>,
    ) -> Result<Vec<Box<dyn Keyword>>, CompileError> {
        let dialect = self.dialect_for(resource)?;
        let mut keywords: Vec<Box<dyn Keyword>> = Vec::with_capacity(map.len());
        for (name, value) in map {
            let mut ctx = CompileContext {
                compilation: &mut *self,
                doc,
                node: pointer.clone(),
                keyword: name.clone(),
                resource,
                siblings: map,
                dialect: Arc::clone(&dialect),
            };
            let keyword: Box<dyn Keyword> = match dialect.keyword_type(name) {
                Some(keyword_type) => keyword_type.create_keyword(value, &mut ctx)?,
                None => {
                    tracing::trace!(keyword = %name, dialect = dialect.uri(), "unrecognized keyword, compiling as annotation");
                    Box::new(DefaultAnnotation::new(name.clone(), Some(value.clone())))
                }
            };
            if keyword.categories().is_empty() {
                return Err(ctx.malformed("keyword reports no categories"));
            }
            keywords.push(keyword);
        }
        Ok(keywords)
    }

    fn resolve_reference(
        &self,
        reference: &str,
        resource: ResourceId,
        location: &str,
    ) -> Result<(DocId, JsonPointer), CompileError> {
        let unresolvable = || CompileError::UnresolvableReference {
            reference: reference.to_string(),
            location: location.to_string(),
        };
        let base = &self.index.resources[resource.0].uri;
        let target = base.join(reference).map_err(|e| CompileError::InvalidUri {
            uri: reference.to_string(),
            location: location.to_string(),
            reason: e.to_string(),
        })?;
        let fragment = target.fragment().map(percent_decode).unwrap_or_default();
        let mut document_uri = target.clone();
        document_uri.set_fragment(None);

        let declared = self
            .index
            .by_uri
            .get(document_uri.as_str())
            .ok_or_else(unresolvable)?;
        let entry = &self.index.resources[declared.0];

        if fragment.is_empty() {
            return Ok((entry.doc, entry.pointer.clone()));
        }
        if fragment.starts_with('/') {
            let relative = JsonPointer::parse(&fragment).map_err(|_| unresolvable())?;
            let pointer = entry.pointer.concat(&relative);
            pointer
                .resolve(&self.documents[entry.doc.0])
                .ok_or_else(unresolvable)?;
            return Ok((entry.doc, pointer));
        }
        self.index
            .anchors
            .get(&format!("{document_uri}#{fragment}"))
            .cloned()
            .ok_or_else(unresolvable)
    }

    /// The dynamic anchor name of a `$dynamicRef`, if its static target is
    /// a `$dynamicAnchor` of that name.
    fn dynamic_anchor_name(
        &self,
        reference: &str,
        resource: ResourceId,
        target: &(DocId, JsonPointer),
    ) -> Option<String> {
        let url = self.index.resources[resource.0].uri.join(reference).ok()?;
        let name = url.fragment().map(percent_decode)?;
        if name.is_empty() || name.starts_with('/') {
            return None;
        }
        let owner = self.index.enclosing(target.0, &target.1)?;
        let declared = self.index.resources[owner.0].dynamic_anchors.get(&name)?;
        (declared == &target.1).then_some(name)
    }

    fn compile_dynamic_anchors(&mut self) -> Result<(), CompileError> {
        while let Some(resource) = self.pending.pop() {
            let entry = &self.index.resources[resource.0];
            let doc = entry.doc;
            let anchors: Vec<(String, JsonPointer)> = entry
                .dynamic_anchors
                .iter()
                .map(|(name, pointer)| (name.clone(), pointer.clone()))
                .collect();
            for (name, pointer) in anchors {
                let id = self.compile_at(doc, pointer)?;
                self.dynamic.entry(resource).or_default().insert(name, id);
            }
        }
        Ok(())
    }

    fn finish(mut self, root: SchemaId) -> CompiledSchema {
        let resources: Vec<CompiledResource> = self
            .index
            .resources
            .iter()
            .enumerate()
            .map(|(i, r)| CompiledResource {
                uri: r.uri.to_string(),
                dynamic_anchors: self.dynamic.remove(&ResourceId(i)).unwrap_or_default(),
            })
            .collect();
        tracing::debug!(
            nodes = self.nodes.len(),
            resources = resources.len(),
            documents = self.documents.len(),
            "schema compiled"
        );
        CompiledSchema {
            nodes: self.nodes,
            resources,
            root,
            config: self.config,
        }
    }
}

// ---------------------------------------------------------------------------
// Keyword compile context
// ---------------------------------------------------------------------------

/// What a [`KeywordType`](crate::KeywordType) sees while building a keyword:
/// its location, its sibling members, and the ability to compile
/// subschemas and references.
pub struct CompileContext<'a> {
    compilation: &'a mut Compilation,
    doc: DocId,
    node: JsonPointer,
    keyword: String,
    resource: ResourceId,
    siblings: &'a Map<String, Value>,
    dialect: Arc<Dialect>,
}

impl CompileContext<'_> {
    /// Name of the keyword being compiled.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Absolute location of the keyword, for error messages.
    pub fn location(&self) -> String {
        self.compilation
            .index
            .absolute(self.resource, &self.node.child(self.keyword.as_str()))
    }

    /// Another member of the same schema object.
    pub fn sibling(&self, name: &str) -> Option<&Value> {
        self.siblings.get(name)
    }

    /// Whether the active dialect compiles `name` as a keyword rather than
    /// a default annotation.
    pub fn recognizes(&self, name: &str) -> bool {
        self.dialect.keyword_type(name).is_some()
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.compilation.config
    }

    /// The format catalog.
    pub fn format_catalog(&self) -> Arc<dyn FormatCatalog> {
        Arc::clone(&self.compilation.formats)
    }

    /// A `MalformedKeyword` error for this keyword.
    pub fn malformed(&self, reason: impl Into<String>) -> CompileError {
        CompileError::malformed(self.keyword.clone(), self.location(), reason)
    }

    /// Compile the subschema at `path` inside this keyword's value.
    pub fn compile_subschema(&mut self, path: &JsonPointer) -> Result<SchemaId, CompileError> {
        let pointer = self.node.child(self.keyword.as_str()).concat(path);
        self.compilation.compile_at(self.doc, pointer)
    }

    /// Compile this keyword's value itself as a subschema.
    pub fn compile_value(&mut self) -> Result<SchemaId, CompileError> {
        self.compile_subschema(&JsonPointer::root())
    }

    /// Compile the sibling member `name` as a subschema, if present.
    pub fn compile_sibling(&mut self, name: &str) -> Result<Option<SchemaId>, CompileError> {
        if !self.siblings.contains_key(name) {
            return Ok(None);
        }
        let pointer = self.node.child(name);
        self.compilation.compile_at(self.doc, pointer).map(Some)
    }

    /// Resolve and compile a `$ref` target.
    pub fn compile_reference(&mut self, reference: &str) -> Result<SchemaId, CompileError> {
        let location = self.location();
        let (doc, pointer) = self
            .compilation
            .resolve_reference(reference, self.resource, &location)?;
        self.compilation.compile_at(doc, pointer)
    }

    /// Resolve and compile a `$dynamicRef` target. The second element is the
    /// anchor name to look up in the dynamic scope, present only when the
    /// static target itself declares that `$dynamicAnchor`.
    pub fn compile_dynamic_reference(
        &mut self,
        reference: &str,
    ) -> Result<(SchemaId, Option<String>), CompileError> {
        let location = self.location();
        let target = self
            .compilation
            .resolve_reference(reference, self.resource, &location)?;
        let anchor = self
            .compilation
            .dynamic_anchor_name(reference, self.resource, &target);
        let id = self.compilation.compile_at(target.0, target.1)?;
        Ok((id, anchor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("/$defs/a%20b"), "/$defs/a b");
        assert_eq!(percent_decode("%25"), "%");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn test_json_type_names() {
        assert_eq!(json_type(&json!(1)), "integer");
        assert_eq!(json_type(&json!(1.5)), "number");
        assert_eq!(json_type(&json!(null)), "null");
    }

    #[test]
    fn test_boolean_schemas_compile() {
        let compiled = SchemaCompiler::new().compile(&json!(true)).unwrap();
        assert_eq!(compiled.node_count(), 1);
        assert!(compiled.keywords(compiled.root()).is_empty());
        assert_eq!(compiled.location(compiled.root()), Some("json-schema:///#"));
    }

    #[test]
    fn test_non_schema_rejected() {
        let err = SchemaCompiler::new().compile(&json!(42)).unwrap_err();
        assert!(matches!(err, CompileError::InvalidSchema { found: "integer", .. }));
        let err = SchemaCompiler::new()
            .compile(&json!({"properties": {"a": "string"}}))
            .unwrap_err();
        match err {
            CompileError::InvalidSchema { location, found } => {
                assert_eq!(location, "json-schema:///#/properties/a");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_keywords_compiled_in_member_order() {
        let compiled = SchemaCompiler::new()
            .compile(&json!({"title": "t", "type": "string", "x-extra": 1}))
            .unwrap();
        let names: Vec<&str> = compiled
            .keywords(compiled.root())
            .iter()
            .map(|k| k.name())
            .collect();
        assert_eq!(names, vec!["title", "type", "x-extra"]);
    }

    #[test]
    fn test_cycle_reuses_handle() {
        let compiled = SchemaCompiler::new()
            .compile(&json!({"properties": {"next": {"$ref": "#"}}}))
            .unwrap();
        assert_eq!(compiled.node_count(), 2);
    }

    #[test]
    fn test_embedded_resource_location() {
        let compiled = SchemaCompiler::new()
            .compile(&json!({
                "$id": "https://example.com/root.json",
                "$defs": {"inner": {"$id": "inner.json", "type": "integer"}},
                "$ref": "inner.json"
            }))
            .unwrap();
        let located: Vec<&str> = (0..compiled.node_count())
            .filter_map(|i| compiled.location(SchemaId(i)))
            .collect();
        assert!(located.contains(&"https://example.com/inner.json#"));
        assert_eq!(
            compiled.resource_uri(compiled.root()),
            Some("https://example.com/root.json")
        );
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let err = SchemaCompiler::new()
            .compile(&json!({
                "$defs": {
                    "a": {"$id": "https://example.com/same"},
                    "b": {"$id": "https://example.com/same"}
                }
            }))
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateResource { .. }));
    }

    #[test]
    fn test_unknown_dialect_rejected() {
        let err = SchemaCompiler::new()
            .compile(&json!({"$schema": "https://example.com/nowhere", "type": "string"}))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownDialect { .. }));
    }

    #[test]
    fn test_compiled_schema_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledSchema>();
        assert_send_sync::<SchemaCompiler>();
    }
}

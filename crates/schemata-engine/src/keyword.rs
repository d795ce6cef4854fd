//! # Keyword Model
//!
//! A [`Keyword`] is one compiled schema member. It has a name, a non-empty
//! [`CategorySet`], and up to three optional views:
//!
//! | View | Used when | Returns |
//! |------|-----------|---------|
//! | [`Keyword::as_assertion`] | ASSERTION and the keyword only looks at the instance | violations |
//! | [`Keyword::as_applicator`] | the keyword needs subschemas, the dynamic scope or sibling annotations | an [`Outcome`] |
//! | [`Keyword::as_annotation`] | ANNOTATION with a value known at compile time | an [`Annotation`] |
//!
//! Dispatch is on categories plus views; there is no keyword class
//! hierarchy. A [`KeywordType`] turns a raw JSON value into a keyword and
//! must reject malformed values there, never later.

use std::fmt;

use schemata_core::{Annotation, Constraint, UnsupportedOperation};
use serde_json::Value;

use crate::compiler::CompileContext;
use crate::error::CompileError;
use crate::evaluator::{AnnotationContext, Frame, Outcome};

/// What a keyword does during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Contributes informational annotations.
    Annotation,
    /// Can produce violations.
    Assertion,
    /// Applies subschemas to the instance or parts of it.
    Applicator,
    /// Reserves a location in the schema (identifiers, definitions, comments).
    ReservedLocation,
}

impl Category {
    const ALL: [Category; 4] = [
        Category::Annotation,
        Category::Assertion,
        Category::Applicator,
        Category::ReservedLocation,
    ];

    fn bit(self) -> u8 {
        match self {
            Category::Annotation => 1,
            Category::Assertion => 1 << 1,
            Category::Applicator => 1 << 2,
            Category::ReservedLocation => 1 << 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Annotation => "ANNOTATION",
            Category::Assertion => "ASSERTION",
            Category::Applicator => "APPLICATOR",
            Category::ReservedLocation => "RESERVED_LOCATION",
        };
        f.write_str(name)
    }
}

/// A set of [`Category`] values.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CategorySet(u8);

impl CategorySet {
    /// The empty set. A keyword must never report it.
    pub const EMPTY: CategorySet = CategorySet(0);

    /// A set holding exactly the given categories.
    pub fn of(categories: &[Category]) -> Self {
        categories.iter().fold(Self::EMPTY, |set, c| set.with(*c))
    }

    /// This set plus `category`.
    pub fn with(self, category: Category) -> Self {
        Self(self.0 | category.bit())
    }

    /// Membership test.
    pub fn contains(self, category: Category) -> bool {
        self.0 & category.bit() != 0
    }

    /// True if no category is present.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Category> {
        Category::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl fmt::Debug for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A compiled schema member.
pub trait Keyword: Send + Sync + fmt::Debug {
    /// The member name this keyword was compiled from.
    fn name(&self) -> &str;

    /// Non-empty category set.
    fn categories(&self) -> CategorySet;

    /// Exact name match.
    fn has_name(&self, name: &str) -> bool {
        self.name() == name
    }

    /// Category membership.
    fn has_category(&self, category: Category) -> bool {
        self.categories().contains(category)
    }

    /// Instance-only constraint view. Violations are reported at the root
    /// of both schema and instance; the evaluator prefixes the keyword name.
    fn as_assertion(&self) -> Option<&dyn Constraint<Value>> {
        None
    }

    /// Frame-aware view.
    fn as_applicator(&self) -> Option<&dyn Applicator> {
        None
    }

    /// Static annotation view.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` unless [`Category::Annotation`] is present.
    fn as_annotation(&self) -> Result<Annotation, UnsupportedOperation> {
        Err(UnsupportedOperation {
            keyword: self.name().to_string(),
            operation: "as_annotation",
        })
    }
}

/// The frame-aware evaluation view of a keyword.
///
/// Results carry locations relative to the schema object holding the
/// keyword, including the keyword's own name as the first keyword-location
/// segment.
pub trait Applicator: Send + Sync {
    /// Evaluate against the frame's instance.
    ///
    /// `annotations` is empty unless [`Applicator::reads_annotations`]
    /// returns true, in which case it holds every annotation the sibling
    /// keywords produced.
    fn apply(&self, frame: &Frame<'_>, annotations: &AnnotationContext) -> Outcome;

    /// Whether this keyword must run after its siblings.
    fn reads_annotations(&self) -> bool {
        false
    }
}

/// A factory from a raw schema member value to a [`Keyword`].
pub trait KeywordType: Send + Sync {
    /// The one name this type is registered under.
    fn name(&self) -> &str;

    /// Validate `value` and build the keyword.
    ///
    /// # Errors
    ///
    /// `CompileError::MalformedKeyword` when `value` has the wrong shape,
    /// or any error from compiling the subschemas it holds.
    fn create_keyword(
        &self,
        value: &Value,
        ctx: &mut CompileContext<'_>,
    ) -> Result<Box<dyn Keyword>, CompileError>;
}

type Factory =
    dyn Fn(&Value, &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError> + Send + Sync;

/// A [`KeywordType`] backed by a function.
pub struct FnKeywordType {
    name: String,
    factory: Box<Factory>,
}

impl FnKeywordType {
    /// Register `factory` under `name`.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Value, &mut CompileContext<'_>) -> Result<Box<dyn Keyword>, CompileError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
        }
    }
}

impl fmt::Debug for FnKeywordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnKeywordType").field("name", &self.name).finish()
    }
}

impl KeywordType for FnKeywordType {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_keyword(
        &self,
        value: &Value,
        ctx: &mut CompileContext<'_>,
    ) -> Result<Box<dyn Keyword>, CompileError> {
        (self.factory)(value, ctx)
    }
}

/// A keyword whose only job is to contribute its own value as an
/// annotation. Unknown members compile to this.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultAnnotation {
    name: String,
    value: Value,
}

impl DefaultAnnotation {
    /// `None` is stored as JSON `null`.
    pub fn new(name: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.unwrap_or(Value::Null),
        }
    }

    /// The annotated value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Keyword for DefaultAnnotation {
    fn name(&self) -> &str {
        &self.name
    }

    fn categories(&self) -> CategorySet {
        CategorySet::of(&[Category::Annotation])
    }

    fn as_annotation(&self) -> Result<Annotation, UnsupportedOperation> {
        Ok(Annotation::new(self.name.clone(), Some(self.value.clone())))
    }
}

/// A keyword that only reserves its location: identifiers, `$comment`,
/// `$defs` and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reserved {
    name: String,
}

impl Reserved {
    /// Reserve `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Keyword for Reserved {
    fn name(&self) -> &str {
        &self.name
    }

    fn categories(&self) -> CategorySet {
        CategorySet::of(&[Category::ReservedLocation])
    }
}

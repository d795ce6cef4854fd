//! # Standard Format Catalog
//!
//! [`StandardFormats`] maps every format name JSON Schema 2020-12 defines to
//! a `Condition<str>` from [`grammar`](crate::grammar). Callers may register
//! extra formats or override the built-in ones.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use schemata_core::{predicate, Condition, FormatCatalog};

use crate::grammar;

/// A shared, type-erased string predicate.
pub type FormatCondition = Arc<dyn Condition<str>>;

/// The built-in format catalog.
#[derive(Clone)]
pub struct StandardFormats {
    formats: HashMap<String, FormatCondition>,
}

impl StandardFormats {
    /// Catalog with every standard format registered.
    pub fn new() -> Self {
        let mut catalog = Self::empty();

        catalog.register("date-time", predicate(grammar::is_date_time));
        catalog.register("date", predicate(grammar::is_date));
        catalog.register("time", predicate(grammar::is_time));
        catalog.register("hostname", predicate(grammar::is_hostname));
        catalog.register("idn-hostname", predicate(grammar::is_hostname));
        catalog.register("ipv4", predicate(grammar::is_ipv4));
        catalog.register("ipv6", predicate(grammar::is_ipv6));
        catalog.register("uri", predicate(grammar::is_uri));
        catalog.register("iri", predicate(grammar::is_uri));
        catalog.register("uri-reference", predicate(grammar::is_uri_reference));
        catalog.register("iri-reference", predicate(grammar::is_uri_reference));
        catalog.register("uuid", predicate(grammar::is_uuid));
        catalog.register("regex", predicate(grammar::is_regex));
        catalog.register("json-pointer", predicate(grammar::is_json_pointer));
        catalog.register(
            "relative-json-pointer",
            predicate(grammar::is_relative_json_pointer),
        );

        if let Some(re) = compile("duration", grammar::DURATION_PATTERN) {
            catalog.register(
                "duration",
                predicate(move |s: &str| grammar::is_duration(s, &re)),
            );
        }
        if let Some(re) = compile("email", grammar::EMAIL_PATTERN) {
            let idn = re.clone();
            catalog.register("email", predicate(move |s: &str| grammar::is_email(s, &re)));
            catalog.register(
                "idn-email",
                predicate(move |s: &str| grammar::is_email(s, &idn)),
            );
        }

        catalog
    }

    /// Catalog with no formats registered.
    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    /// Register or replace the condition for `name`.
    pub fn register<C>(&mut self, name: impl Into<String>, condition: C) -> &mut Self
    where
        C: Condition<str> + 'static,
    {
        self.formats.insert(name.into(), Arc::new(condition));
        self
    }

    /// Whether `name` has a registered condition.
    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Registered format names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formats.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for StandardFormats {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StandardFormats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardFormats")
            .field("formats", &self.names())
            .finish()
    }
}

impl FormatCatalog for StandardFormats {
    fn for_format(&self, name: &str) -> Option<Arc<dyn Condition<str>>> {
        self.formats.get(name).cloned()
    }
}

fn compile(format: &str, pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(format, error = %e, "built-in format grammar failed to compile");
            None
        }
    }
}

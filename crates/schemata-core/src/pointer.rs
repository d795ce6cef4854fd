//! # JSON Pointer (RFC 6901)
//!
//! [`JsonPointer`] is the location type used everywhere in the engine:
//! instance locations, keyword locations, `$ref` fragments and the
//! property-path condition.
//!
//! Pointers are stored as unescaped reference tokens. Escaping (`~0` for
//! `~`, `~1` for `/`) only happens at the string boundary, in
//! [`JsonPointer::parse`] and the `Display` impl.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::PointerError;

/// A parsed JSON Pointer.
///
/// The empty pointer (no tokens) addresses the whole document and renders
/// as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JsonPointer(Vec<String>);

impl JsonPointer {
    /// The pointer to the document root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a pointer from already-unescaped reference tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    /// Parse the string form of a pointer.
    ///
    /// # Errors
    ///
    /// Returns `PointerError::MissingLeadingSlash` for a non-empty pointer
    /// that does not start with `/`, and `PointerError::InvalidEscape` for a
    /// `~` not followed by `0` or `1`.
    pub fn parse(input: &str) -> Result<Self, PointerError> {
        if input.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = input.strip_prefix('/') else {
            return Err(PointerError::MissingLeadingSlash(input.to_string()));
        };
        let mut tokens = Vec::new();
        for raw in rest.split('/') {
            tokens.push(unescape(input, raw)?);
        }
        Ok(Self(tokens))
    }

    /// The unescaped reference tokens.
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Returns true for the root pointer.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of reference tokens.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the pointer has no tokens.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a token in place.
    pub fn push(&mut self, token: impl Into<String>) {
        self.0.push(token.into());
    }

    /// A new pointer with `token` appended.
    pub fn child(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(token.into());
        Self(tokens)
    }

    /// A new pointer with an array index appended.
    pub fn index(&self, index: usize) -> Self {
        self.child(index.to_string())
    }

    /// `self` followed by every token of `other`.
    pub fn concat(&self, other: &JsonPointer) -> Self {
        let mut tokens = Vec::with_capacity(self.0.len() + other.0.len());
        tokens.extend(self.0.iter().cloned());
        tokens.extend(other.0.iter().cloned());
        Self(tokens)
    }

    /// Returns true if `prefix` is a (non-strict) prefix of `self`.
    pub fn starts_with(&self, prefix: &JsonPointer) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The tokens of `self` after `prefix`, if `prefix` is a prefix.
    pub fn strip_prefix(&self, prefix: &JsonPointer) -> Option<Self> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| Self(rest.to_vec()))
    }

    /// The pointer one level up, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.0.split_last()?;
        Some(Self(init.to_vec()))
    }

    /// The last token, or `None` at the root.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Resolve the pointer against a JSON value.
    ///
    /// Array tokens must be canonical decimal indices (`0`, `17`, never
    /// `01` or `-`). Returns `None` when any step is absent.
    pub fn resolve<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        let mut current = value;
        for token in &self.0 {
            current = match current {
                Value::Object(map) => map.get(token)?,
                Value::Array(items) => items.get(parse_index(token)?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn unescape(pointer: &str, raw: &str) -> Result<String, PointerError> {
    if !raw.contains('~') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.char_indices();
    while let Some((position, c)) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some((_, '0')) => out.push('~'),
            Some((_, '1')) => out.push('/'),
            _ => {
                return Err(PointerError::InvalidEscape {
                    pointer: pointer.to_string(),
                    position,
                })
            }
        }
    }
    Ok(out)
}

fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.0 {
            write!(f, "/{}", escape(token))?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_root() {
        let p = JsonPointer::parse("").unwrap();
        assert!(p.is_root());
        assert_eq!(p.to_string(), "");
    }

    #[test]
    fn test_parse_escapes() {
        let p = JsonPointer::parse("/a~1b/c~0d").unwrap();
        assert_eq!(p.tokens(), &["a/b".to_string(), "c~d".to_string()]);
        assert_eq!(p.to_string(), "/a~1b/c~0d");
    }

    #[test]
    fn test_parse_rejects_missing_slash() {
        let err = JsonPointer::parse("a/b").unwrap_err();
        assert!(matches!(err, PointerError::MissingLeadingSlash(_)));
    }

    #[test]
    fn test_parse_rejects_bad_escape() {
        let err = JsonPointer::parse("/a~2").unwrap_err();
        match err {
            PointerError::InvalidEscape { position, .. } => assert_eq!(position, 1),
            other => panic!("Expected InvalidEscape, got: {other}"),
        }
    }

    #[test]
    fn test_empty_token_is_distinct_from_root() {
        let p = JsonPointer::parse("/").unwrap();
        assert_eq!(p.len(), 1);
        let doc = json!({"": 7});
        assert_eq!(p.resolve(&doc), Some(&json!(7)));
    }

    #[test]
    fn test_resolve_nested() {
        let doc = json!({"a": {"b": [10, 20, {"c": true}]}});
        let p = JsonPointer::parse("/a/b/2/c").unwrap();
        assert_eq!(p.resolve(&doc), Some(&json!(true)));
    }

    #[test]
    fn test_resolve_rejects_noncanonical_index() {
        let doc = json!([1, 2, 3]);
        assert!(JsonPointer::parse("/01").unwrap().resolve(&doc).is_none());
        assert!(JsonPointer::parse("/-").unwrap().resolve(&doc).is_none());
        assert_eq!(JsonPointer::parse("/0").unwrap().resolve(&doc), Some(&json!(1)));
    }

    #[test]
    fn test_resolve_absent() {
        let doc = json!({"a": 1});
        assert!(JsonPointer::parse("/b").unwrap().resolve(&doc).is_none());
        assert!(JsonPointer::parse("/a/b").unwrap().resolve(&doc).is_none());
    }

    #[test]
    fn test_concat_and_strip_prefix() {
        let a = JsonPointer::from_tokens(["properties", "name"]);
        let b = JsonPointer::from_tokens(["type"]);
        let joined = a.concat(&b);
        assert_eq!(joined.to_string(), "/properties/name/type");
        assert!(joined.starts_with(&a));
        assert_eq!(joined.strip_prefix(&a), Some(b));
        assert_eq!(joined.parent().unwrap().last(), Some("name"));
    }

    #[test]
    fn test_serde_as_string() {
        let p = JsonPointer::from_tokens(["a/b", "0"]);
        let encoded = serde_json::to_value(&p).unwrap();
        assert_eq!(encoded, json!("/a~1b/0"));
        let decoded: JsonPointer = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, p);
    }
}

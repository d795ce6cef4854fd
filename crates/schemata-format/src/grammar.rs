//! # Format Grammars
//!
//! One function per format name. Each takes the candidate string and
//! returns whether it conforms. Regex-backed grammars are compiled by the
//! caller and passed in, so this module holds no global state.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use schemata_core::JsonPointer;
use url::Url;

/// RFC 3339 `date-time`.
pub fn is_date_time(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
}

/// RFC 3339 `full-date`: exactly `YYYY-MM-DD`.
pub fn is_date(s: &str) -> bool {
    s.len() == 10
        && s.as_bytes()[4] == b'-'
        && s.as_bytes()[7] == b'-'
        && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// RFC 3339 `full-time`: `HH:MM:SS[.frac](Z|±HH:MM)`.
pub fn is_time(s: &str) -> bool {
    // Borrow the date-time parser by prefixing a fixed date.
    s.len() >= 9 && s.as_bytes()[2] == b':' && is_date_time(&format!("1970-01-01T{s}"))
}

/// RFC 3339 appendix A `duration`.
pub fn is_duration(s: &str, grammar: &Regex) -> bool {
    grammar.is_match(s)
}

/// Pattern for [`is_duration`].
pub const DURATION_PATTERN: &str = concat!(
    r"^P(?:",
    r"(?:\d+Y(?:\d+M(?:\d+D)?)?|\d+M(?:\d+D)?|\d+D)",
    r"(?:T(?:\d+H(?:\d+M(?:\d+S)?)?|\d+M(?:\d+S)?|\d+S))?",
    r"|T(?:\d+H(?:\d+M(?:\d+S)?)?|\d+M(?:\d+S)?|\d+S)",
    r"|\d+W",
    r")$"
);

/// Pattern for [`is_email`]: a dot-atom local part and a hostname.
pub const EMAIL_PATTERN: &str = r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([^@\s]+)$";

/// RFC 5321 mailbox, restricted to dot-atom local parts.
pub fn is_email(s: &str, grammar: &Regex) -> bool {
    grammar
        .captures(s)
        .and_then(|c| c.get(1))
        .is_some_and(|domain| is_hostname(domain.as_str()))
}

/// RFC 1123 hostname.
pub fn is_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

/// Dotted-quad IPv4, no leading zeros.
pub fn is_ipv4(s: &str) -> bool {
    Ipv4Addr::from_str(s).is_ok()
}

/// RFC 4291 IPv6.
pub fn is_ipv6(s: &str) -> bool {
    Ipv6Addr::from_str(s).is_ok()
}

/// Absolute URI (RFC 3986) or IRI (RFC 3987).
pub fn is_uri(s: &str) -> bool {
    !s.contains(char::is_whitespace) && Url::parse(s).is_ok()
}

/// URI or relative reference.
pub fn is_uri_reference(s: &str) -> bool {
    if s.contains(char::is_whitespace) || s.contains('\\') {
        return false;
    }
    if Url::parse(s).is_ok() {
        return true;
    }
    Url::parse("json-schema:///")
        .and_then(|base| base.join(s))
        .is_ok()
}

/// Hyphenated UUID, 36 characters.
pub fn is_uuid(s: &str) -> bool {
    s.len() == 36 && uuid::Uuid::try_parse(s).is_ok()
}

/// A regular expression the `regex` crate accepts.
pub fn is_regex(s: &str) -> bool {
    Regex::new(s).is_ok()
}

/// RFC 6901 JSON Pointer.
pub fn is_json_pointer(s: &str) -> bool {
    JsonPointer::parse(s).is_ok()
}

/// Relative JSON Pointer: a non-negative integer prefix followed by `#` or
/// a JSON Pointer.
pub fn is_relative_json_pointer(s: &str) -> bool {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || (digits > 1 && s.starts_with('0')) {
        return false;
    }
    let rest = &s[digits..];
    rest == "#" || is_json_pointer(rest)
}

//! Integration test: the condition and constraint algebras compose across
//! module boundaries the way keyword implementations use them.
//!
//! A keyword author typically builds a `Check` from a `Mapped` condition,
//! scopes it with `PropertyPath`, and composes several of them with the
//! logical combinators. These tests exercise that path through the public
//! API only.

use schemata_core::{
    predicate, AllOf, AnyOf, Check, Condition, ConditionExt, Constraint, ConstraintError,
    ForAll, JsonPointer, Mapped, Not, PropertyPath, Violation, Violations,
};
use serde_json::{json, Value};

fn string_len(v: &Value) -> Option<usize> {
    v.as_str().map(|s| s.chars().count())
}

fn at_most(limit: usize) -> impl Condition<Option<usize>> {
    predicate(move |n: &Option<usize>| n.map_or(true, |n| n <= limit))
}

#[test]
fn test_one_bound_condition_serves_many_transforms() {
    let short_string: Mapped<_, _, Option<usize>> = Mapped::new(at_most(3), string_len);
    let short_array: Mapped<_, _, Option<usize>> =
        Mapped::new(at_most(3), |v: &Value| v.as_array().map(Vec::len));

    assert!(short_string.is_fulfilled_by(&json!("abc")));
    assert!(!short_string.is_fulfilled_by(&json!("abcd")));
    assert!(short_string.is_fulfilled_by(&json!(42)));
    assert!(short_array.is_fulfilled_by(&json!([1, 2])));
    assert!(!short_array.is_fulfilled_by(&json!([1, 2, 3, 4])));
}

#[test]
fn test_property_scoped_checks_compose() {
    let name_short = Check::new(
        PropertyPath::new(
            JsonPointer::from_tokens(["name"]),
            Mapped::<_, _, Option<usize>>::new(at_most(5), string_len),
        ),
        Violation::new("maxLength", "name too long")
            .at_instance(JsonPointer::from_tokens(["name"])),
    );
    let tag_not_null = Check::new(
        PropertyPath::new(
            JsonPointer::from_tokens(["tag"]),
            predicate(|v: &Value| !v.is_null()),
        ),
        Violation::new("required", "tag must be present and non-null"),
    );
    let both = AllOf::new(vec![
        Box::new(name_short) as Box<dyn Constraint<Value>>,
        Box::new(tag_not_null),
    ])
    .unwrap();

    let ok: Violations = both.violations_by(&json!({"name": "bob", "tag": "x"}));
    assert!(ok.is_empty());

    let bad: Violations = both.violations_by(&json!({"name": "bartholomew"}));
    assert_eq!(bad.len(), 2);
    let located: Vec<String> = bad.iter().map(|v| v.instance_location.to_string()).collect();
    assert!(located.contains(&"/name".to_string()));
}

#[test]
fn test_for_all_feeds_check() {
    let all_strings = ForAll::new(predicate(|v: &Value| v.is_string()));
    let c = Check::new(all_strings, Violation::new("items", "non-string element"));
    let ok: Violations = c.violations_by(&json!(["a", "b"]));
    assert!(ok.is_empty());
    let bad: Violations = c.violations_by(&json!(["a", 2]));
    assert_eq!(bad.len(), 1);
}

fn kind_check(kind: &'static str) -> Box<dyn Constraint<Value>> {
    let matches = predicate(move |v: &Value| match kind {
        "string" => v.is_string(),
        "number" => v.is_number(),
        _ => false,
    });
    Box::new(Check::new(matches, Violation::new("type", format!("not a {kind}"))))
}

#[test]
fn test_or_and_not_nest() {
    let string_or_number = AnyOf::new(vec![kind_check("string"), kind_check("number")]).unwrap();
    let not_either = Not::new(string_or_number, Violation::new("not", "must be neither"));

    let on_bool: Violations = not_either.violations_by(&json!(true));
    assert!(on_bool.is_empty());
    let on_string: Violations = not_either.violations_by(&json!("s"));
    assert_eq!(on_string.len(), 1);
}

#[test]
fn test_condition_connectives_over_json() {
    let non_empty_string = predicate(|v: &Value| v.is_string())
        .and(predicate(|v: &Value| v.as_str().is_some_and(|s| !s.is_empty())));
    let blank = non_empty_string.negate();
    assert!(blank.is_fulfilled_by(&json!("")));
    assert!(blank.is_fulfilled_by(&json!(7)));
    assert!(!blank.is_fulfilled_by(&json!("x")));
}

#[test]
fn test_empty_or_is_a_construction_error() {
    let operands: Vec<Box<dyn Constraint<Value>>> = Vec::new();
    assert_eq!(
        AnyOf::new(operands).err(),
        Some(ConstraintError::NoOperands { combinator: "anyOf" })
    );
}

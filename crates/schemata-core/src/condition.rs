//! # Condition Algebra
//!
//! A [`Condition<T>`] is a total, side-effect-free predicate over `T`.
//! Conditions answer yes or no and nothing else; when the reason for a
//! failure matters, wrap the condition in a [`Check`](crate::Check)
//! constraint.
//!
//! ## Structural Adapters
//!
//! - [`PropertyPath`] scopes a `Condition<Value>` to a member of a JSON
//!   document. A missing member is presented to the inner condition as JSON
//!   `null`, so callers never special-case "absent" against "explicitly null".
//! - [`Mapped`] reuses a `Condition<R>` anywhere a `T -> R` transform exists.
//! - [`ForAll`] lifts an element condition to sequences. The empty sequence
//!   is vacuously fulfilled.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::pointer::JsonPointer;

/// A pure predicate over `T`.
pub trait Condition<T: ?Sized>: Send + Sync {
    /// Returns true if `value` fulfils the condition.
    fn is_fulfilled_by(&self, value: &T) -> bool;
}

impl<T: ?Sized, C: Condition<T> + ?Sized> Condition<T> for &C {
    fn is_fulfilled_by(&self, value: &T) -> bool {
        (**self).is_fulfilled_by(value)
    }
}

impl<T: ?Sized, C: Condition<T> + ?Sized> Condition<T> for Box<C> {
    fn is_fulfilled_by(&self, value: &T) -> bool {
        (**self).is_fulfilled_by(value)
    }
}

impl<T: ?Sized, C: Condition<T> + ?Sized> Condition<T> for Arc<C> {
    fn is_fulfilled_by(&self, value: &T) -> bool {
        (**self).is_fulfilled_by(value)
    }
}

// ---------------------------------------------------------------------------
// Leaves
// ---------------------------------------------------------------------------

/// A condition backed by a closure.
#[derive(Clone, Copy)]
pub struct Predicate<F>(F);

/// Wrap a closure as a [`Condition`].
pub fn predicate<T, F>(f: F) -> Predicate<F>
where
    T: ?Sized,
    F: Fn(&T) -> bool + Send + Sync,
{
    Predicate(f)
}

impl<T, F> Condition<T> for Predicate<F>
where
    T: ?Sized,
    F: Fn(&T) -> bool + Send + Sync,
{
    fn is_fulfilled_by(&self, value: &T) -> bool {
        (self.0)(value)
    }
}

impl<F> std::fmt::Debug for Predicate<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Predicate(..)")
    }
}

// ---------------------------------------------------------------------------
// Structural adapters
// ---------------------------------------------------------------------------

static NULL: Value = Value::Null;

/// Applies an inner condition to the value found at a JSON Pointer.
///
/// If the pointer does not resolve, the inner condition sees JSON `null`.
#[derive(Debug, Clone)]
pub struct PropertyPath<C> {
    pointer: JsonPointer,
    inner: C,
}

impl<C> PropertyPath<C> {
    /// Scope `inner` to the member at `pointer`.
    pub fn new(pointer: JsonPointer, inner: C) -> Self {
        Self { pointer, inner }
    }

    /// The pointer this condition looks at.
    pub fn pointer(&self) -> &JsonPointer {
        &self.pointer
    }
}

impl<C: Condition<Value>> Condition<Value> for PropertyPath<C> {
    fn is_fulfilled_by(&self, value: &Value) -> bool {
        let target = self.pointer.resolve(value).unwrap_or(&NULL);
        self.inner.is_fulfilled_by(target)
    }
}

/// Applies an inner `Condition<R>` to the image of a `T -> R` transform.
pub struct Mapped<C, F, R> {
    inner: C,
    transform: F,
    _marker: PhantomData<fn() -> R>,
}

impl<C, F, R> Mapped<C, F, R> {
    /// `is_fulfilled_by(t) == inner.is_fulfilled_by(&transform(t))`.
    pub fn new(inner: C, transform: F) -> Self {
        Self {
            inner,
            transform,
            _marker: PhantomData,
        }
    }
}

impl<T, R, C, F> Condition<T> for Mapped<C, F, R>
where
    T: ?Sized,
    C: Condition<R>,
    F: Fn(&T) -> R + Send + Sync,
{
    fn is_fulfilled_by(&self, value: &T) -> bool {
        self.inner.is_fulfilled_by(&(self.transform)(value))
    }
}

impl<C: std::fmt::Debug, F, R> std::fmt::Debug for Mapped<C, F, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapped")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

/// Universal quantification over a sequence.
#[derive(Debug, Clone)]
pub struct ForAll<C> {
    element: C,
}

impl<C> ForAll<C> {
    /// Every element must fulfil `element`.
    pub fn new(element: C) -> Self {
        Self { element }
    }
}

impl<T, C: Condition<T>> Condition<[T]> for ForAll<C> {
    fn is_fulfilled_by(&self, value: &[T]) -> bool {
        value.iter().all(|item| self.element.is_fulfilled_by(item))
    }
}

/// Over JSON values, only arrays are quantified; any other value is
/// outside the condition's domain and fulfils it.
impl<C: Condition<Value>> Condition<Value> for ForAll<C> {
    fn is_fulfilled_by(&self, value: &Value) -> bool {
        match value {
            Value::Array(items) => Condition::<[Value]>::is_fulfilled_by(self, items.as_slice()),
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Logical connectives
// ---------------------------------------------------------------------------

/// Logical negation.
#[derive(Debug, Clone)]
pub struct Negated<C>(C);

impl<T: ?Sized, C: Condition<T>> Condition<T> for Negated<C> {
    fn is_fulfilled_by(&self, value: &T) -> bool {
        !self.0.is_fulfilled_by(value)
    }
}

/// Logical conjunction.
#[derive(Debug, Clone)]
pub struct Both<A, B>(A, B);

impl<T: ?Sized, A: Condition<T>, B: Condition<T>> Condition<T> for Both<A, B> {
    fn is_fulfilled_by(&self, value: &T) -> bool {
        self.0.is_fulfilled_by(value) && self.1.is_fulfilled_by(value)
    }
}

/// Logical disjunction.
#[derive(Debug, Clone)]
pub struct Either<A, B>(A, B);

impl<T: ?Sized, A: Condition<T>, B: Condition<T>> Condition<T> for Either<A, B> {
    fn is_fulfilled_by(&self, value: &T) -> bool {
        self.0.is_fulfilled_by(value) || self.1.is_fulfilled_by(value)
    }
}

/// Combinator methods available on every condition.
pub trait ConditionExt<T: ?Sized>: Condition<T> + Sized {
    /// Logical negation.
    fn negate(self) -> Negated<Self> {
        Negated(self)
    }

    /// Both `self` and `other`.
    fn and<O: Condition<T>>(self, other: O) -> Both<Self, O> {
        Both(self, other)
    }

    /// Either `self` or `other`.
    fn or<O: Condition<T>>(self, other: O) -> Either<Self, O> {
        Either(self, other)
    }

    /// Lift to sequences of `T`.
    fn for_all(self) -> ForAll<Self> {
        ForAll::new(self)
    }

    /// Reuse this condition over `U` through a `U -> T` transform.
    fn map_from<U, F>(self, transform: F) -> Mapped<Self, F, T>
    where
        U: ?Sized,
        T: Sized,
        F: Fn(&U) -> T + Send + Sync,
    {
        Mapped::new(self, transform)
    }
}

impl<T: ?Sized, C: Condition<T>> ConditionExt<T> for C {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn is_null() -> Predicate<impl Fn(&Value) -> bool + Send + Sync> {
        predicate(|v: &Value| v.is_null())
    }

    #[test]
    fn test_property_path_present() {
        let c = PropertyPath::new(
            JsonPointer::from_tokens(["status"]),
            predicate(|v: &Value| v == "active"),
        );
        assert!(c.is_fulfilled_by(&json!({"status": "active"})));
        assert!(!c.is_fulfilled_by(&json!({"status": "closed"})));
    }

    #[test]
    fn test_property_path_absent_reads_null() {
        let c = PropertyPath::new(JsonPointer::from_tokens(["missing"]), is_null());
        assert!(c.is_fulfilled_by(&json!({"other": 1})));
        assert!(c.is_fulfilled_by(&json!({"missing": null})));
        assert!(!c.is_fulfilled_by(&json!({"missing": 0})));
    }

    #[test]
    fn test_property_path_nested_pointer() {
        let c = PropertyPath::new(
            JsonPointer::from_tokens(["a", "b"]),
            predicate(|v: &Value| v.as_i64() == Some(3)),
        );
        assert!(c.is_fulfilled_by(&json!({"a": {"b": 3}})));
        assert!(!c.is_fulfilled_by(&json!({"a": {"c": 3}})));
    }

    #[test]
    fn test_mapped_reuses_inner() {
        let at_least_three = predicate(|n: &usize| *n >= 3);
        let long_string: Mapped<_, _, usize> = Mapped::new(&at_least_three, |s: &str| s.chars().count());
        let long_list: Mapped<_, _, usize> = Mapped::new(&at_least_three, |v: &Vec<u8>| v.len());
        assert!(long_string.is_fulfilled_by("abc"));
        assert!(!long_string.is_fulfilled_by("ab"));
        assert!(long_list.is_fulfilled_by(&vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_for_all_empty_is_vacuous() {
        let never = predicate(|_: &i32| false);
        let all = ForAll::new(never);
        let empty: [i32; 0] = [];
        assert!(all.is_fulfilled_by(&empty[..]));
        assert!(!all.is_fulfilled_by(&[1][..]));
    }

    #[test]
    fn test_for_all_over_json() {
        let strings = ForAll::new(predicate(|v: &Value| v.is_string()));
        assert!(Condition::<Value>::is_fulfilled_by(&strings, &json!(["a", "b"])));
        assert!(!Condition::<Value>::is_fulfilled_by(&strings, &json!(["a", 1])));
        assert!(Condition::<Value>::is_fulfilled_by(&strings, &json!("not an array")));
    }

    #[test]
    fn test_connectives() {
        let positive = predicate(|n: &i64| *n > 0);
        let even = predicate(|n: &i64| n % 2 == 0);
        let both = positive.and(even);
        assert!(both.is_fulfilled_by(&4i64));
        assert!(!both.is_fulfilled_by(&3i64));
        let neither = predicate(|n: &i64| *n > 0).or(predicate(|n: &i64| n % 2 == 0)).negate();
        assert!(neither.is_fulfilled_by(&-3i64));
        assert!(!neither.is_fulfilled_by(&-2i64));
    }
}

//! # Constraint Algebra
//!
//! A [`Constraint<T>`] maps a value to a [`Verdict`]: the set of violations
//! it produces, empty when satisfied. Unlike a [`Condition`], a constraint
//! keeps every failure reason, so composed constraints can report all of
//! them.
//!
//! ## Combinators
//!
//! | Combinator | Satisfied iff | Failure report |
//! |------------|---------------|----------------|
//! | [`AnyOf`] | at least one operand satisfied | union of every operand's violations |
//! | [`AllOf`] | every operand satisfied | union of the failing operands' violations |
//! | [`OneOf`] | exactly one operand satisfied | union when none pass, one ambiguity violation when several pass |
//! | [`Not`] | the operand is not satisfied | one template violation |
//!
//! `AnyOf`, `AllOf` and `OneOf` reject an empty operand list at construction.
//!
//! ## Verdicts
//!
//! The combinators are generic over the verdict type. Plain [`Violations`]
//! is the default. A verdict may also carry an informational payload (the
//! engine carries annotations) which the combinators merge from the
//! operands that decided the outcome. A *fatal* verdict stops every
//! combinator immediately and is returned unchanged.

use std::sync::Arc;

use crate::condition::Condition;
use crate::error::ConstraintError;
use crate::violation::{Violation, Violations};

/// The result of applying a constraint.
pub trait Verdict: Default {
    /// Violations found.
    fn violations(&self) -> &Violations;

    /// A fatal verdict aborts composition; it is never satisfied.
    fn is_fatal(&self) -> bool {
        false
    }

    /// Satisfied means not fatal and no violations.
    fn is_satisfied(&self) -> bool {
        !self.is_fatal() && self.violations().is_empty()
    }

    /// Absorb another verdict of the same kind.
    fn merge(&mut self, other: Self);

    /// A verdict holding exactly one violation.
    fn from_violation(violation: Violation) -> Self;
}

impl Verdict for Violations {
    fn violations(&self) -> &Violations {
        self
    }

    fn merge(&mut self, mut other: Self) {
        self.append(&mut other);
    }

    fn from_violation(violation: Violation) -> Self {
        let mut set = Violations::new();
        set.insert(violation);
        set
    }
}

/// A pure function from `T` to a verdict.
pub trait Constraint<T: ?Sized, V: Verdict = Violations>: Send + Sync {
    /// Collect the violations `value` produces.
    fn violations_by(&self, value: &T) -> V;

    /// Returns true if `value` produces no violations.
    fn is_satisfied_by(&self, value: &T) -> bool {
        self.violations_by(value).is_satisfied()
    }
}

impl<T: ?Sized, V: Verdict, C: Constraint<T, V> + ?Sized> Constraint<T, V> for &C {
    fn violations_by(&self, value: &T) -> V {
        (**self).violations_by(value)
    }
}

impl<T: ?Sized, V: Verdict, C: Constraint<T, V> + ?Sized> Constraint<T, V> for Box<C> {
    fn violations_by(&self, value: &T) -> V {
        (**self).violations_by(value)
    }
}

impl<T: ?Sized, V: Verdict, C: Constraint<T, V> + ?Sized> Constraint<T, V> for Arc<C> {
    fn violations_by(&self, value: &T) -> V {
        (**self).violations_by(value)
    }
}

// ---------------------------------------------------------------------------
// Leaf
// ---------------------------------------------------------------------------

/// A leaf constraint: a condition plus the violation to report when the
/// condition is not fulfilled.
#[derive(Debug, Clone)]
pub struct Check<C> {
    condition: C,
    violation: Violation,
}

impl<C> Check<C> {
    /// Report `violation` whenever `condition` fails.
    pub fn new(condition: C, violation: Violation) -> Self {
        Self {
            condition,
            violation,
        }
    }
}

impl<T: ?Sized, V: Verdict, C: Condition<T>> Constraint<T, V> for Check<C> {
    fn violations_by(&self, value: &T) -> V {
        if self.condition.is_fulfilled_by(value) {
            V::default()
        } else {
            V::from_violation(self.violation.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

fn non_empty<C>(operands: Vec<C>, combinator: &'static str) -> Result<Vec<C>, ConstraintError> {
    if operands.is_empty() {
        Err(ConstraintError::NoOperands { combinator })
    } else {
        Ok(operands)
    }
}

/// Logical OR.
///
/// Every operand is evaluated, even after one passes, so a satisfied
/// verdict carries the merged payload of all passing operands.
#[derive(Debug, Clone)]
pub struct AnyOf<C> {
    operands: Vec<C>,
}

impl<C> AnyOf<C> {
    /// # Errors
    ///
    /// Returns `ConstraintError::NoOperands` for an empty operand list.
    pub fn new(operands: Vec<C>) -> Result<Self, ConstraintError> {
        Ok(Self {
            operands: non_empty(operands, "anyOf")?,
        })
    }

    /// The operands, in order.
    pub fn operands(&self) -> &[C] {
        &self.operands
    }
}

impl<T: ?Sized, V: Verdict, C: Constraint<T, V>> Constraint<T, V> for AnyOf<C> {
    fn violations_by(&self, value: &T) -> V {
        let mut passed: Option<V> = None;
        let mut failed = V::default();
        for operand in &self.operands {
            let verdict = operand.violations_by(value);
            if verdict.is_fatal() {
                return verdict;
            }
            if verdict.is_satisfied() {
                match passed.as_mut() {
                    Some(acc) => acc.merge(verdict),
                    None => passed = Some(verdict),
                }
            } else if passed.is_none() {
                failed.merge(verdict);
            }
        }
        passed.unwrap_or(failed)
    }
}

/// Logical AND.
#[derive(Debug, Clone)]
pub struct AllOf<C> {
    operands: Vec<C>,
}

impl<C> AllOf<C> {
    /// # Errors
    ///
    /// Returns `ConstraintError::NoOperands` for an empty operand list.
    pub fn new(operands: Vec<C>) -> Result<Self, ConstraintError> {
        Ok(Self {
            operands: non_empty(operands, "allOf")?,
        })
    }

    /// The operands, in order.
    pub fn operands(&self) -> &[C] {
        &self.operands
    }
}

impl<T: ?Sized, V: Verdict, C: Constraint<T, V>> Constraint<T, V> for AllOf<C> {
    fn violations_by(&self, value: &T) -> V {
        let mut acc = V::default();
        for operand in &self.operands {
            let verdict = operand.violations_by(value);
            if verdict.is_fatal() {
                return verdict;
            }
            acc.merge(verdict);
        }
        acc
    }
}

/// Exactly one operand must be satisfied.
#[derive(Debug, Clone)]
pub struct OneOf<C> {
    operands: Vec<C>,
    ambiguity: Violation,
}

impl<C> OneOf<C> {
    /// `ambiguity` is reported when more than one operand is satisfied.
    ///
    /// # Errors
    ///
    /// Returns `ConstraintError::NoOperands` for an empty operand list.
    pub fn new(operands: Vec<C>, ambiguity: Violation) -> Result<Self, ConstraintError> {
        Ok(Self {
            operands: non_empty(operands, "oneOf")?,
            ambiguity,
        })
    }

    /// The operands, in order.
    pub fn operands(&self) -> &[C] {
        &self.operands
    }
}

impl<T: ?Sized, V: Verdict, C: Constraint<T, V>> Constraint<T, V> for OneOf<C> {
    fn violations_by(&self, value: &T) -> V {
        let mut passed: Vec<V> = Vec::new();
        let mut failed = V::default();
        for operand in &self.operands {
            let verdict = operand.violations_by(value);
            if verdict.is_fatal() {
                return verdict;
            }
            if verdict.is_satisfied() {
                passed.push(verdict);
            } else {
                failed.merge(verdict);
            }
        }
        match passed.len() {
            0 => failed,
            1 => passed.pop().unwrap_or_default(),
            _ => V::from_violation(self.ambiguity.clone()),
        }
    }
}

/// Logical NOT.
///
/// The operand's own verdict is discarded either way: a failing operand
/// makes `Not` pass with an empty verdict, a passing operand makes it fail
/// with the template violation.
#[derive(Debug, Clone)]
pub struct Not<C> {
    operand: C,
    violation: Violation,
}

impl<C> Not<C> {
    /// Report `violation` whenever `operand` is satisfied.
    pub fn new(operand: C, violation: Violation) -> Self {
        Self { operand, violation }
    }
}

impl<T: ?Sized, V: Verdict, C: Constraint<T, V>> Constraint<T, V> for Not<C> {
    fn violations_by(&self, value: &T) -> V {
        let verdict = self.operand.violations_by(value);
        if verdict.is_fatal() {
            verdict
        } else if verdict.is_satisfied() {
            V::from_violation(self.violation.clone())
        } else {
            V::default()
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::condition::predicate;
    use proptest::prelude::*;

    fn threshold(n: i64) -> Check<impl Condition<i64>> {
        Check::new(
            predicate(move |v: &i64| *v >= n),
            Violation::new("minimum", format!("must be >= {n}")),
        )
    }

    fn satisfied<C: Constraint<i64>>(c: &C, v: i64) -> bool {
        c.is_satisfied_by(&v)
    }

    proptest! {
        /// OR is satisfied iff at least one operand is satisfied.
        #[test]
        fn any_of_iff_some_operand(thresholds in prop::collection::vec(-100i64..100, 1..8), v in -150i64..150) {
            let expected = thresholds.iter().any(|t| v >= *t);
            let c = AnyOf::new(thresholds.iter().map(|t| threshold(*t)).collect()).unwrap();
            prop_assert_eq!(satisfied(&c, v), expected);
        }

        /// A failing OR reports every operand's reason.
        #[test]
        fn any_of_failure_is_union(thresholds in prop::collection::btree_set(1i64..100, 1..8)) {
            let c = AnyOf::new(thresholds.iter().map(|t| threshold(*t)).collect()).unwrap();
            let v: Violations = c.violations_by(&0);
            prop_assert_eq!(v.len(), thresholds.len());
        }

        /// AND is satisfied iff every operand is satisfied.
        #[test]
        fn all_of_iff_every_operand(thresholds in prop::collection::vec(-100i64..100, 1..8), v in -150i64..150) {
            let expected = thresholds.iter().all(|t| v >= *t);
            let c = AllOf::new(thresholds.iter().map(|t| threshold(*t)).collect()).unwrap();
            prop_assert_eq!(satisfied(&c, v), expected);
        }

        /// NOT flips satisfaction.
        #[test]
        fn not_flips(t in -100i64..100, v in -150i64..150) {
            let c = Not::new(threshold(t), Violation::new("not", "negated"));
            prop_assert_eq!(satisfied(&c, v), v < t);
        }
    }
}

use std::{fmt, sync::Arc};

use serde_json::{Number, Value};

use crate::signature::{value_type_name, CONSTRAINT_TYPE};

/// Predicate applied to one actual argument of an intercepted call.
pub trait Constraint: fmt::Debug + Send + Sync {
    fn evaluate(&self, candidate: &Value) -> bool;
    fn describe(&self) -> String;
}

/// Matches arguments equal to the expected value.
#[derive(Debug, Clone, PartialEq)]
pub struct IsEqual {
    expected: Value,
}

impl IsEqual {
    pub fn new(expected: impl Into<Value>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl Constraint for IsEqual {
    fn evaluate(&self, candidate: &Value) -> bool {
        values_equal(&self.expected, candidate)
    }

    fn describe(&self) -> String {
        format!("equal to <{}>", self.expected)
    }
}

/// Matches every argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsAnything;

impl Constraint for IsAnything {
    fn evaluate(&self, _candidate: &Value) -> bool {
        true
    }

    fn describe(&self) -> String {
        "anything".to_string()
    }
}

type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;

/// Closure-backed constraint for test-specific matching rules.
#[derive(Clone)]
pub struct Predicate {
    description: String,
    check: Arc<PredicateFn>,
}

impl Predicate {
    /// `check` runs while the owning registry is locked, so it must not call
    /// back into that registry.
    pub fn new<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            check: Arc::new(check),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Constraint for Predicate {
    fn evaluate(&self, candidate: &Value) -> bool {
        (self.check)(candidate)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Expected-argument slot: literal equality, wildcard, or a custom constraint.
#[derive(Debug, Clone)]
pub enum ArgMatcher {
    Equal(Value),
    Anything,
    Custom(Arc<dyn Constraint>),
}

impl ArgMatcher {
    pub fn custom<C>(constraint: C) -> Self
    where
        C: Constraint + 'static,
    {
        Self::Custom(Arc::new(constraint))
    }

    pub fn predicate<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::custom(Predicate::new(description, check))
    }

    pub fn evaluate(&self, candidate: &Value) -> bool {
        match self {
            ArgMatcher::Equal(expected) => values_equal(expected, candidate),
            ArgMatcher::Anything => true,
            ArgMatcher::Custom(constraint) => constraint.evaluate(candidate),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ArgMatcher::Equal(expected) => IsEqual::new(expected.clone()).describe(),
            ArgMatcher::Anything => IsAnything.describe(),
            ArgMatcher::Custom(constraint) => constraint.describe(),
        }
    }

    /// Argument-type descriptor this slot contributes to a signature.
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgMatcher::Equal(expected) => value_type_name(expected),
            ArgMatcher::Anything => value_type_name(&Value::Null),
            ArgMatcher::Custom(_) => CONSTRAINT_TYPE,
        }
    }
}

/// Numbers compare by value so `1` and `1.0` recorded from different sources still match.
fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(left), Value::Number(right)) => numbers_equal(left, right),
        _ => expected == actual,
    }
}

/// Integers compare exactly; a float only equals an integer it represents exactly.
fn numbers_equal(left: &Number, right: &Number) -> bool {
    match (integer_value(left), integer_value(right)) {
        (Some(left), Some(right)) => left == right,
        (Some(integer), None) => float_equals_integer(right.as_f64(), integer),
        (None, Some(integer)) => float_equals_integer(left.as_f64(), integer),
        (None, None) => left.as_f64() == right.as_f64(),
    }
}

fn integer_value(number: &Number) -> Option<i128> {
    number
        .as_i64()
        .map(i128::from)
        .or_else(|| number.as_u64().map(i128::from))
}

fn float_equals_integer(float: Option<f64>, integer: i128) -> bool {
    // 2^64 bounds every integer a JSON number can hold.
    float.is_some_and(|float| {
        float.fract() == 0.0 && float.abs() <= 18_446_744_073_709_551_616.0 && float as i128 == integer
    })
}

impl From<Value> for ArgMatcher {
    fn from(value: Value) -> Self {
        if value.is_null() {
            Self::Anything
        } else {
            Self::Equal(value)
        }
    }
}

impl From<Option<Value>> for ArgMatcher {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Anything, Self::from)
    }
}

impl From<IsEqual> for ArgMatcher {
    fn from(constraint: IsEqual) -> Self {
        Self::from(constraint.expected)
    }
}

impl From<IsAnything> for ArgMatcher {
    fn from(_: IsAnything) -> Self {
        Self::Anything
    }
}

impl From<Predicate> for ArgMatcher {
    fn from(predicate: Predicate) -> Self {
        Self::custom(predicate)
    }
}

impl From<Arc<dyn Constraint>> for ArgMatcher {
    fn from(constraint: Arc<dyn Constraint>) -> Self {
        Self::Custom(constraint)
    }
}

macro_rules! impl_literal_arg_matcher {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ArgMatcher {
                fn from(value: $ty) -> Self {
                    Self::from(Value::from(value))
                }
            }
        )*
    };
}

impl_literal_arg_matcher!(bool, i32, i64, u32, u64, f64, &str, String);

/// Builds a `Vec<ArgMatcher>` from a mix of literals, `Value`s and constraints.
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        ::std::vec![$($crate::ArgMatcher::from($arg)),*]
    };
}

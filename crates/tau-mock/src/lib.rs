//! Expectation recording and call dispatch engine for test substitutes.
//!
//! A [`Mock`] registry records expected calls per member, routes intercepted
//! invocations through a per-member [`DispatchStrategy`], and verifies that
//! every expectation was met.
mod constraint;
mod error;
mod mock_call;
mod options;
mod registry;
mod signature;
mod strategy;

pub use constraint::{ArgMatcher, Constraint, IsAnything, IsEqual, Predicate};
pub use error::{
    ConfigurationError, MemberKind, MockError, StubbedError, VerificationFailure,
};
pub use mock_call::{ExpectedCall, MockCall};
pub use options::{MockOptions, RECORD_HISTORY_ENV, STRICT_ENV};
pub use registry::{
    logical_member_name, InvocationOutcome, InvocationRecord, Mock, VerificationReport,
};
pub use signature::{value_type_name, Signature, CONSTRAINT_TYPE};
pub use strategy::{
    DispatchStrategy, FixedReturn, OrderedQueue, ParameterizedLookup, RoundRobin, StrategyKind,
};

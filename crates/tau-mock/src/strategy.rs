//! Per-member dispatch policies.
//!
//! Each registry member owns exactly one strategy. The strategy decides which
//! recorded expectation answers a call and what `verify` means for that member.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{MockError, VerificationFailure},
    mock_call::MockCall,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `DispatchStrategy` implementations.
pub enum StrategyKind {
    OrderedQueue,
    RoundRobin,
    FixedReturn,
    ParameterizedLookup,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::OrderedQueue => "ordered_queue",
            StrategyKind::RoundRobin => "round_robin",
            StrategyKind::FixedReturn => "fixed_return",
            StrategyKind::ParameterizedLookup => "parameterized_lookup",
        }
    }

    pub(crate) fn create(self, name: &str) -> Box<dyn DispatchStrategy> {
        match self {
            StrategyKind::OrderedQueue => Box::new(OrderedQueue::new(name)),
            StrategyKind::RoundRobin => Box::new(RoundRobin::new(name)),
            StrategyKind::FixedReturn => Box::new(FixedReturn::new(name)),
            StrategyKind::ParameterizedLookup => Box::new(ParameterizedLookup::new(name)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatch policy over the expectation records of one member.
pub trait DispatchStrategy: fmt::Debug + Send {
    fn name(&self) -> &str;
    fn kind(&self) -> StrategyKind;
    fn record(&mut self, expectation: MockCall);
    fn call(&mut self, args: &mut [Value]) -> Result<Value, MockError>;
    /// Must not mutate dispatch state.
    fn verify(&self) -> Result<(), VerificationFailure>;
    fn expectation_count(&self) -> usize;
    fn calls_made(&self) -> usize;
}

/// Strict FIFO queue: every record answers exactly one call, in order.
#[derive(Debug)]
pub struct OrderedQueue {
    name: String,
    expectations: Vec<MockCall>,
    calls_made: usize,
}

impl OrderedQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expectations: Vec::new(),
            calls_made: 0,
        }
    }

    fn expected_calls(&self) -> usize {
        self.expectations
            .iter()
            .filter(|expectation| !expectation.is_forbidden())
            .count()
    }
}

impl DispatchStrategy for OrderedQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::OrderedQueue
    }

    fn record(&mut self, expectation: MockCall) {
        self.expectations.push(expectation);
    }

    fn call(&mut self, args: &mut [Value]) -> Result<Value, MockError> {
        let index = self.calls_made;
        self.calls_made += 1;
        match self.expectations.get(index) {
            Some(expectation) => expectation.invoke(&self.name, args),
            None => Err(VerificationFailure::new(
                format!("{}() called too many times", self.name),
                self.expected_calls(),
                self.calls_made,
            )
            .into()),
        }
    }

    fn verify(&self) -> Result<(), VerificationFailure> {
        let expected = self.expected_calls();
        if self.calls_made < expected {
            return Err(VerificationFailure::new(
                format!("{}() not called enough times", self.name),
                expected,
                self.calls_made,
            ));
        }
        if self.calls_made > expected {
            return Err(VerificationFailure::new(
                format!("{}() called too many times", self.name),
                expected,
                self.calls_made,
            ));
        }
        Ok(())
    }

    fn expectation_count(&self) -> usize {
        self.expectations.len()
    }

    fn calls_made(&self) -> usize {
        self.calls_made
    }
}

/// Cycles through its records forever; never fails on call count.
#[derive(Debug)]
pub struct RoundRobin {
    name: String,
    expectations: Vec<MockCall>,
    cursor: usize,
    calls_made: usize,
}

impl RoundRobin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expectations: Vec::new(),
            cursor: 0,
            calls_made: 0,
        }
    }
}

impl DispatchStrategy for RoundRobin {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::RoundRobin
    }

    fn record(&mut self, expectation: MockCall) {
        self.expectations.push(expectation);
    }

    fn call(&mut self, args: &mut [Value]) -> Result<Value, MockError> {
        self.calls_made += 1;
        if self.expectations.is_empty() {
            return Ok(Value::Null);
        }
        let index = self.cursor % self.expectations.len();
        self.cursor = (index + 1) % self.expectations.len();
        self.expectations[index].invoke(&self.name, args)
    }

    fn verify(&self) -> Result<(), VerificationFailure> {
        Ok(())
    }

    fn expectation_count(&self) -> usize {
        self.expectations.len()
    }

    fn calls_made(&self) -> usize {
        self.calls_made
    }
}

/// Answers every call with one stubbed outcome.
#[derive(Debug)]
pub struct FixedReturn {
    name: String,
    expectation: Option<MockCall>,
    calls_made: usize,
}

impl FixedReturn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expectation: None,
            calls_made: 0,
        }
    }
}

impl DispatchStrategy for FixedReturn {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::FixedReturn
    }

    // Last setup wins.
    fn record(&mut self, expectation: MockCall) {
        self.expectation = Some(expectation);
    }

    fn call(&mut self, args: &mut [Value]) -> Result<Value, MockError> {
        self.calls_made += 1;
        match &self.expectation {
            Some(expectation) => expectation.invoke(&self.name, args),
            None => Ok(Value::Null),
        }
    }

    fn verify(&self) -> Result<(), VerificationFailure> {
        Ok(())
    }

    fn expectation_count(&self) -> usize {
        usize::from(self.expectation.is_some())
    }

    fn calls_made(&self) -> usize {
        self.calls_made
    }
}

/// Picks the first record whose constraints fully match the actual arguments.
#[derive(Debug)]
pub struct ParameterizedLookup {
    name: String,
    expectations: Vec<MockCall>,
    calls_made: usize,
}

impl ParameterizedLookup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expectations: Vec::new(),
            calls_made: 0,
        }
    }
}

impl DispatchStrategy for ParameterizedLookup {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::ParameterizedLookup
    }

    fn record(&mut self, expectation: MockCall) {
        self.expectations.push(expectation);
    }

    fn call(&mut self, args: &mut [Value]) -> Result<Value, MockError> {
        self.calls_made += 1;
        let actual: &[Value] = args;
        match self
            .expectations
            .iter()
            .find(|expectation| expectation.matches(actual))
        {
            Some(expectation) => expectation.produce(args),
            None => {
                tracing::debug!(member = %self.name, "no parameterized result matched; returning null");
                Ok(Value::Null)
            }
        }
    }

    fn verify(&self) -> Result<(), VerificationFailure> {
        Ok(())
    }

    fn expectation_count(&self) -> usize {
        self.expectations.len()
    }

    fn calls_made(&self) -> usize {
        self.calls_made
    }
}

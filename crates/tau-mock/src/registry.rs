//! The `Mock` registry: recording API, call routing and aggregated verification.

use serde::Serialize;
use serde_json::Value;

use crate::{
    constraint::ArgMatcher,
    error::{MockError, StubbedError, VerificationFailure},
    mock_call::{ExpectedCall, MockCall},
    options::MockOptions,
    signature::{value_type_name, Signature},
    strategy::{DispatchStrategy, StrategyKind},
};

/// Collapses accessor-style names to the logical member they address.
///
/// `get_X` with no arguments (or one, for indexers) and `set_X` with exactly one
/// argument both resolve to `X`. Any other shape is returned unchanged.
pub fn logical_member_name(member: &str, arity: usize) -> &str {
    if let Some(property) = member.strip_prefix("get_") {
        if arity <= 1 && !property.is_empty() {
            return property;
        }
    }
    if let Some(property) = member.strip_prefix("set_") {
        if arity == 1 && !property.is_empty() {
            return property;
        }
    }
    member
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
/// Enumerates how a routed invocation ended.
pub enum InvocationOutcome {
    Returned { value: Value },
    Failed { error: String },
}

/// One routed call, as seen by the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationRecord {
    pub signature: Signature,
    pub args: Vec<Value>,
    pub outcome: InvocationOutcome,
}

/// Every failure collected by [`Mock::verify_all`], in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub mock: String,
    pub failures: Vec<VerificationFailure>,
}

impl VerificationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_result(self) -> Result<(), VerificationFailure> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

/// Registry of per-member dispatch strategies for one substitute object.
#[derive(Debug)]
pub struct Mock {
    options: MockOptions,
    strategies: Vec<Box<dyn DispatchStrategy>>,
    history: Vec<InvocationRecord>,
}

impl Mock {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(MockOptions::named(name))
    }

    pub fn with_options(options: MockOptions) -> Self {
        Self {
            options,
            strategies: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn options(&self) -> &MockOptions {
        &self.options
    }

    pub fn is_strict(&self) -> bool {
        self.options.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.options.strict = strict;
    }

    /// Expects one call with the given arguments, returning `null`.
    pub fn expect<I, A>(&mut self, member: impl Into<String>, args: I)
    where
        I: IntoIterator<Item = A>,
        A: Into<ArgMatcher>,
    {
        self.expect_call(ExpectedCall::new(member).with_args(args));
    }

    pub fn expect_and_return<I, A>(
        &mut self,
        member: impl Into<String>,
        result: impl Into<Value>,
        args: I,
    ) where
        I: IntoIterator<Item = A>,
        A: Into<ArgMatcher>,
    {
        self.expect_call(ExpectedCall::new(member).with_args(args).returns(result));
    }

    pub fn expect_and_throw<I, A>(
        &mut self,
        member: impl Into<String>,
        error: impl Into<StubbedError>,
        args: I,
    ) where
        I: IntoIterator<Item = A>,
        A: Into<ArgMatcher>,
    {
        self.expect_call(ExpectedCall::new(member).with_args(args).throws(error));
    }

    /// Queues `times` independent copies of the same expectation.
    pub fn expect_times(&mut self, times: usize, call: ExpectedCall) {
        for _ in 0..times {
            self.expect_call(call.clone());
        }
    }

    pub fn expect_call(&mut self, call: ExpectedCall) {
        let call = call.into_mock_call(self.name());
        self.record(StrategyKind::OrderedQueue, call);
    }

    /// Any invocation of `member` fails immediately.
    pub fn expect_no_call<I, S>(&mut self, member: impl Into<String>, arg_types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let signature = Signature::new(self.name(), member, arg_types);
        self.record(StrategyKind::OrderedQueue, MockCall::forbidden(signature));
    }

    /// Every call returns `result`, regardless of arguments or count.
    pub fn setup_result<I, S>(
        &mut self,
        member: impl Into<String>,
        result: impl Into<Value>,
        arg_types: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.setup(
            StrategyKind::FixedReturn,
            ExpectedCall::new(member)
                .with_arg_types(arg_types)
                .returns(result),
        );
    }

    /// Appends `result` to the member's cycle of results.
    pub fn setup_result_in_order<I, S>(
        &mut self,
        member: impl Into<String>,
        result: impl Into<Value>,
        arg_types: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.setup(
            StrategyKind::RoundRobin,
            ExpectedCall::new(member)
                .with_arg_types(arg_types)
                .returns(result),
        );
    }

    /// Returns `result` whenever the actual arguments match `args`.
    pub fn setup_result_for_params<I, A>(
        &mut self,
        member: impl Into<String>,
        result: impl Into<Value>,
        args: I,
    ) where
        I: IntoIterator<Item = A>,
        A: Into<ArgMatcher>,
    {
        self.setup(
            StrategyKind::ParameterizedLookup,
            ExpectedCall::new(member).with_args(args).returns(result),
        );
    }

    pub fn setup(&mut self, kind: StrategyKind, call: ExpectedCall) {
        let call = call.into_mock_call(self.name());
        self.record(kind, call);
    }

    /// Appends `expectation` to the member's strategy of `kind`, replacing a
    /// strategy of any other kind.
    pub fn record(&mut self, kind: StrategyKind, expectation: MockCall) {
        let member = logical_member_name(
            expectation.signature().member(),
            expectation.signature().arity(),
        )
        .to_string();

        let position = self
            .strategies
            .iter()
            .position(|strategy| strategy.name() == member);
        let index = match position {
            Some(index) if self.strategies[index].kind() == kind => index,
            Some(index) => {
                tracing::debug!(
                    mock = %self.options.name,
                    member = %member,
                    previous = %self.strategies[index].kind(),
                    next = %kind,
                    discarded = self.strategies[index].expectation_count(),
                    "replacing dispatch strategy"
                );
                self.strategies[index] = kind.create(&member);
                index
            }
            None => {
                self.strategies.push(kind.create(&member));
                self.strategies.len() - 1
            }
        };

        tracing::debug!(
            mock = %self.options.name,
            signature = %expectation.signature(),
            strategy = %kind,
            forbidden = expectation.is_forbidden(),
            "recorded expectation"
        );
        self.strategies[index].record(expectation);
    }

    /// Routing entry point used by substitutes.
    ///
    /// Output values of a matching expectation are written back into `args`.
    pub fn invoke(
        &mut self,
        member: &str,
        args: &mut [Value],
        arg_types: &[String],
    ) -> Result<Value, MockError> {
        let member = logical_member_name(member, args.len());
        let signature = Signature::new(self.name(), member, arg_types.iter().cloned());
        let snapshot = self.options.record_history.then(|| args.to_vec());

        let outcome = match self
            .strategies
            .iter_mut()
            .find(|strategy| strategy.name() == member)
        {
            Some(strategy) => strategy.call(args),
            None if self.options.strict => Err(VerificationFailure::new(
                format!("{member}() called too many times"),
                0,
                1,
            )
            .into()),
            None => Ok(Value::Null),
        };

        tracing::debug!(
            mock = %self.options.name,
            signature = %signature,
            ok = outcome.is_ok(),
            "routed invocation"
        );

        if let Some(args) = snapshot {
            self.history.push(InvocationRecord {
                signature,
                args,
                outcome: match &outcome {
                    Ok(value) => InvocationOutcome::Returned {
                        value: value.clone(),
                    },
                    Err(error) => InvocationOutcome::Failed {
                        error: error.to_string(),
                    },
                },
            });
        }

        outcome
    }

    /// Invokes `member` with argument types derived from the values.
    pub fn call(&mut self, member: &str, mut args: Vec<Value>) -> Result<Value, MockError> {
        let arg_types = args
            .iter()
            .map(|arg| value_type_name(arg).to_string())
            .collect::<Vec<_>>();
        self.invoke(member, &mut args, &arg_types)
    }

    /// Verifies every strategy in registration order, stopping at the first failure.
    #[tracing::instrument(level = "debug", skip(self), fields(mock = %self.options.name))]
    pub fn verify(&self) -> Result<(), VerificationFailure> {
        for strategy in &self.strategies {
            strategy.verify()?;
        }
        Ok(())
    }

    /// Verifies every strategy and collects all failures.
    pub fn verify_all(&self) -> VerificationReport {
        VerificationReport {
            mock: self.options.name.clone(),
            failures: self
                .strategies
                .iter()
                .filter_map(|strategy| strategy.verify().err())
                .collect(),
        }
    }

    pub fn strategy_kind(&self, member: &str) -> Option<StrategyKind> {
        self.strategy(member).map(|strategy| strategy.kind())
    }

    pub fn has_expectations(&self, member: &str) -> bool {
        self.strategy(member)
            .is_some_and(|strategy| strategy.expectation_count() > 0)
    }

    pub fn calls_made(&self, member: &str) -> usize {
        self.strategy(member)
            .map_or(0, |strategy| strategy.calls_made())
    }

    pub fn history(&self) -> &[InvocationRecord] {
        &self.history
    }

    /// Drains the invocation log; recording continues afterwards.
    pub fn take_history(&mut self) -> Vec<InvocationRecord> {
        std::mem::take(&mut self.history)
    }

    fn strategy(&self, member: &str) -> Option<&dyn DispatchStrategy> {
        self.strategies
            .iter()
            .find(|strategy| strategy.name() == member)
            .map(|strategy| &**strategy)
    }
}

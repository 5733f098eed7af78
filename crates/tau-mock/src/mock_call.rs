//! Expectation records and the builder used to describe them.

use serde_json::Value;

use crate::{
    constraint::ArgMatcher,
    error::{MockError, StubbedError, VerificationFailure},
    signature::Signature,
};

/// One recorded call: expected arguments plus the outcome to produce.
#[derive(Debug, Clone)]
pub struct MockCall {
    signature: Signature,
    constraints: Option<Vec<ArgMatcher>>,
    result: Value,
    error: Option<StubbedError>,
    outputs: Vec<Option<Value>>,
    forbidden: bool,
}

impl MockCall {
    pub fn new(signature: Signature, constraints: Option<Vec<ArgMatcher>>, result: Value) -> Self {
        Self {
            signature,
            constraints,
            result,
            error: None,
            outputs: Vec::new(),
            forbidden: false,
        }
    }

    /// Record that raises as soon as it is reached.
    pub fn forbidden(signature: Signature) -> Self {
        Self {
            forbidden: true,
            ..Self::new(signature, None, Value::Null)
        }
    }

    pub fn with_error(mut self, error: StubbedError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<Option<Value>>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn constraints(&self) -> Option<&[ArgMatcher]> {
        self.constraints.as_deref()
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn error(&self) -> Option<&StubbedError> {
        self.error.as_ref()
    }

    pub fn is_forbidden(&self) -> bool {
        self.forbidden
    }

    /// Checks arity and every positional constraint, then produces the stubbed outcome.
    pub fn invoke(&self, member: &str, args: &mut [Value]) -> Result<Value, MockError> {
        if self.forbidden {
            return Err(VerificationFailure::new(format!("{member}() called"), 0, 1).into());
        }

        if let Some(constraints) = &self.constraints {
            if constraints.len() != args.len() {
                return Err(VerificationFailure::new(
                    format!("{member}() called with incorrect number of parameters"),
                    constraints.len(),
                    args.len(),
                )
                .into());
            }
            for (index, (constraint, actual)) in constraints.iter().zip(args.iter()).enumerate() {
                if !constraint.evaluate(actual) {
                    return Err(VerificationFailure::new(
                        format!(
                            "{member}() called with incorrect parameter ({})",
                            index + 1
                        ),
                        constraint.describe(),
                        actual,
                    )
                    .into());
                }
            }
        }

        self.produce(args)
    }

    /// Arity plus full constraint evaluation, without raising.
    pub fn matches(&self, args: &[Value]) -> bool {
        let constraints = self.constraints.as_deref().unwrap_or_default();
        constraints.len() == args.len()
            && constraints
                .iter()
                .zip(args)
                .all(|(constraint, actual)| constraint.evaluate(actual))
    }

    pub(crate) fn produce(&self, args: &mut [Value]) -> Result<Value, MockError> {
        for (slot, output) in args.iter_mut().zip(&self.outputs) {
            if let Some(value) = output {
                *slot = value.clone();
            }
        }
        match &self.error {
            Some(error) => Err(MockError::Stubbed(error.clone())),
            None => Ok(self.result.clone()),
        }
    }
}

/// Builder describing an expectation before it is bound to a registry.
#[derive(Debug, Clone)]
pub struct ExpectedCall {
    member: String,
    args: Option<Vec<ArgMatcher>>,
    arg_types: Option<Vec<String>>,
    result: Value,
    error: Option<StubbedError>,
    outputs: Vec<Option<Value>>,
}

impl ExpectedCall {
    pub fn new(member: impl Into<String>) -> Self {
        Self {
            member: member.into(),
            args: None,
            arg_types: None,
            result: Value::Null,
            error: None,
            outputs: Vec::new(),
        }
    }

    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<ArgMatcher>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Pins the signature to explicit argument types, for overloaded members.
    pub fn with_arg_types<I, S>(mut self, arg_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arg_types = Some(arg_types.into_iter().map(Into::into).collect());
        self
    }

    pub fn returns(mut self, result: impl Into<Value>) -> Self {
        self.result = result.into();
        self
    }

    pub fn throws(mut self, error: impl Into<StubbedError>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_outputs<I>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        self.outputs = outputs.into_iter().collect();
        self
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Signature this expectation binds to under the given owner name.
    pub fn signature(&self, owner: &str) -> Signature {
        match (&self.arg_types, &self.args) {
            (Some(types), _) => Signature::new(owner, self.member.as_str(), types.iter().cloned()),
            (None, Some(args)) => Signature::new(
                owner,
                self.member.as_str(),
                args.iter().map(ArgMatcher::type_name),
            ),
            (None, None) => Signature::new(owner, self.member.as_str(), Vec::<String>::new()),
        }
    }

    pub fn into_mock_call(self, owner: &str) -> MockCall {
        let signature = self.signature(owner);
        let mut call = MockCall::new(signature, self.args, self.result).with_outputs(self.outputs);
        if let Some(error) = self.error {
            call = call.with_error(error);
        }
        call
    }
}

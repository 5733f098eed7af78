//! Contract-validated mock: every expectation is checked against the target
//! descriptor before it reaches the registry.

use std::{collections::BTreeSet, sync::Arc};

use serde_json::Value;
use tau_mock::{
    logical_member_name, value_type_name, ArgMatcher, ConfigurationError, ExpectedCall,
    MemberKind, Mock, MockCall, MockError, MockOptions, Signature, StrategyKind, StubbedError,
    VerificationFailure, VerificationReport,
};

use crate::{
    descriptor::{addresses_setter, value_assignable, TypeDescriptor, VOID_TYPE},
    proxy::{ProxyGenerator, SharedMock, Substitute, TableProxyGenerator},
};

/// Registry wrapper that validates expectations against a [`TypeDescriptor`].
pub struct DynamicMock {
    mock: SharedMock,
    target: TypeDescriptor,
    ignored: BTreeSet<String>,
    generator: Arc<dyn ProxyGenerator>,
    instance: Option<Arc<dyn Substitute>>,
}

impl DynamicMock {
    pub fn new(target: TypeDescriptor) -> Self {
        Self::with_generator(target, TableProxyGenerator::new())
    }

    pub fn with_generator<G>(target: TypeDescriptor, generator: G) -> Self
    where
        G: ProxyGenerator + 'static,
    {
        let options = MockOptions::named(target.name.clone());
        Self::with_options(target, options, generator)
    }

    pub fn with_options<G>(target: TypeDescriptor, options: MockOptions, generator: G) -> Self
    where
        G: ProxyGenerator + 'static,
    {
        Self {
            mock: SharedMock::new(Mock::with_options(options)),
            target,
            ignored: BTreeSet::new(),
            generator: Arc::new(generator),
            instance: None,
        }
    }

    pub fn target(&self) -> &TypeDescriptor {
        &self.target
    }

    /// Handle to the underlying registry, shared with the substitute.
    pub fn mock(&self) -> &SharedMock {
        &self.mock
    }

    pub fn set_strict(&self, strict: bool) {
        self.mock.lock().set_strict(strict);
    }

    pub fn is_strict(&self) -> bool {
        self.mock.lock().is_strict()
    }

    pub fn expect<I, A>(&self, member: impl Into<String>, args: I) -> Result<(), MockError>
    where
        I: IntoIterator<Item = A>,
        A: Into<ArgMatcher>,
    {
        self.expect_call(ExpectedCall::new(member).with_args(args))
    }

    pub fn expect_and_return<I, A>(
        &self,
        member: impl Into<String>,
        result: impl Into<Value>,
        args: I,
    ) -> Result<(), MockError>
    where
        I: IntoIterator<Item = A>,
        A: Into<ArgMatcher>,
    {
        self.expect_call(ExpectedCall::new(member).with_args(args).returns(result))
    }

    pub fn expect_and_throw<I, A>(
        &self,
        member: impl Into<String>,
        error: impl Into<StubbedError>,
        args: I,
    ) -> Result<(), MockError>
    where
        I: IntoIterator<Item = A>,
        A: Into<ArgMatcher>,
    {
        self.expect_call(ExpectedCall::new(member).with_args(args).throws(error))
    }

    pub fn expect_times(&self, times: usize, call: ExpectedCall) -> Result<(), MockError> {
        self.validate(&call)?;
        self.mock.lock().expect_times(times, call);
        Ok(())
    }

    pub fn expect_call(&self, call: ExpectedCall) -> Result<(), MockError> {
        self.validate(&call)?;
        self.mock.lock().expect_call(call);
        Ok(())
    }

    pub fn expect_no_call<I, S>(&self, member: impl Into<String>, arg_types: I) -> Result<(), MockError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let signature = Signature::new(self.target.name.as_str(), member, arg_types);
        self.check_member(&signature)?;
        self.mock
            .lock()
            .record(StrategyKind::OrderedQueue, MockCall::forbidden(signature));
        Ok(())
    }

    pub fn setup_result<I, S>(
        &self,
        member: impl Into<String>,
        result: impl Into<Value>,
        arg_types: I,
    ) -> Result<(), MockError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.setup(
            StrategyKind::FixedReturn,
            ExpectedCall::new(member)
                .with_arg_types(arg_types)
                .returns(result),
        )
    }

    pub fn setup_result_in_order<I, S>(
        &self,
        member: impl Into<String>,
        result: impl Into<Value>,
        arg_types: I,
    ) -> Result<(), MockError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.setup(
            StrategyKind::RoundRobin,
            ExpectedCall::new(member)
                .with_arg_types(arg_types)
                .returns(result),
        )
    }

    pub fn setup_result_for_params<I, A>(
        &self,
        member: impl Into<String>,
        result: impl Into<Value>,
        args: I,
    ) -> Result<(), MockError>
    where
        I: IntoIterator<Item = A>,
        A: Into<ArgMatcher>,
    {
        self.setup(
            StrategyKind::ParameterizedLookup,
            ExpectedCall::new(member).with_args(args).returns(result),
        )
    }

    pub fn setup(&self, kind: StrategyKind, call: ExpectedCall) -> Result<(), MockError> {
        self.validate(&call)?;
        self.mock.lock().setup(kind, call);
        Ok(())
    }

    /// Keeps the real implementation of `member` in the substitute.
    pub fn ignore(&mut self, member: impl Into<String>) -> Result<(), MockError> {
        let member = member.into();
        if self.instance.is_some() {
            return Err(ConfigurationError::SubstituteAlreadyCreated { member }.into());
        }
        self.ignored.insert(member);
        Ok(())
    }

    pub fn ignored(&self) -> &BTreeSet<String> {
        &self.ignored
    }

    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    /// The substitute, generated on first access and cached afterwards.
    pub fn object(&mut self) -> Result<Arc<dyn Substitute>, MockError> {
        if let Some(instance) = &self.instance {
            return Ok(Arc::clone(instance));
        }
        let instance = self.generator.generate(
            &self.target,
            &self.ignored,
            Arc::new(self.mock.clone()),
        )?;
        self.instance = Some(Arc::clone(&instance));
        Ok(instance)
    }

    pub fn verify(&self) -> Result<(), VerificationFailure> {
        self.mock.verify()
    }

    pub fn verify_all(&self) -> VerificationReport {
        self.mock.verify_all()
    }

    fn validate(&self, call: &ExpectedCall) -> Result<(), MockError> {
        let signature = call.signature(&self.target.name);
        self.check_member(&signature)?;
        if !call.has_error() {
            self.check_return_type(&signature, call.result())?;
        }
        Ok(())
    }

    /// Resolves the signature against the target's capability set and requires
    /// the resolved member to be overridable.
    pub fn check_member(&self, signature: &Signature) -> Result<(), MockError> {
        let member = signature.member();
        let arity = signature.arity();
        let arg_types = signature.arg_types();

        if let Some(resolved) = self.target.find_method(member, arg_types) {
            return self.require_overridable(member, MemberKind::Method, resolved.is_overridable());
        }

        let property_name = logical_member_name(member, arity);
        if let Some(resolved) = self.target.find_property(property_name) {
            return match resolved.property.accessor_for(member, arity) {
                Some(accessor) => self.require_overridable(
                    member,
                    MemberKind::Property,
                    resolved.accessor_overridable(accessor),
                ),
                None => self.missing_member(signature),
            };
        }

        let alternate = accessor_alternate_name(member, arity);
        if let Some(resolved) = self.target.find_method(&alternate, arg_types) {
            return self.require_overridable(
                member,
                MemberKind::Property,
                resolved.is_overridable(),
            );
        }

        self.missing_member(signature)
    }

    /// Requires a non-null stubbed result to be assignable to the member's declared type.
    pub fn check_return_type(&self, signature: &Signature, result: &Value) -> Result<(), MockError> {
        if result.is_null() {
            return Ok(());
        }
        let Some(expected) = self.declared_result_type(signature) else {
            return Ok(());
        };
        if value_assignable(&expected, result) {
            return Ok(());
        }
        tracing::debug!(
            target_type = %self.target.name,
            member = %signature.member(),
            expected = %expected,
            "rejected stub with incompatible result type"
        );
        Err(ConfigurationError::IncompatibleReturnType {
            member: signature.member().to_string(),
            expected,
            actual: value_type_name(result).to_string(),
        }
        .into())
    }

    /// Method first, then property, then synthesized accessor method.
    fn declared_result_type(&self, signature: &Signature) -> Option<String> {
        let member = signature.member();
        let arity = signature.arity();
        let arg_types = signature.arg_types();

        if let Some(resolved) = self.target.find_method(member, arg_types) {
            return Some(resolved.method.returns.clone());
        }
        if let Some(resolved) = self.target.find_property(logical_member_name(member, arity)) {
            return Some(if addresses_setter(member, arity) {
                VOID_TYPE.to_string()
            } else {
                resolved.property.ty.clone()
            });
        }
        self.target
            .find_method(&accessor_alternate_name(member, arity), arg_types)
            .map(|resolved| resolved.method.returns.clone())
    }

    fn require_overridable(
        &self,
        member: &str,
        kind: MemberKind,
        overridable: bool,
    ) -> Result<(), MockError> {
        if overridable {
            return Ok(());
        }
        tracing::debug!(
            target_type = %self.target.name,
            member = %member,
            kind = %kind,
            "rejected expectation on non-overridable member"
        );
        Err(ConfigurationError::NotOverridable {
            type_name: self.target.name.clone(),
            member: member.to_string(),
            kind,
        }
        .into())
    }

    fn missing_member(&self, signature: &Signature) -> Result<(), MockError> {
        if signature.has_constraint_arg() {
            return Ok(());
        }
        Err(ConfigurationError::MissingMember {
            type_name: self.target.name.clone(),
            member: signature.member().to_string(),
        }
        .into())
    }
}

/// Accessor method a property-style call maps to when no property is declared.
fn accessor_alternate_name(member: &str, arity: usize) -> String {
    let property = logical_member_name(member, arity);
    if addresses_setter(member, arity) {
        format!("set_{property}")
    } else {
        format!("get_{property}")
    }
}

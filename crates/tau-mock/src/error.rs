use std::{error::Error as StdError, fmt, sync::Arc};

use serde::Serialize;
use thiserror::Error;

/// Raised when an invocation or a `verify` pass contradicts recorded expectations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{reason}\nexpected:<{expected}>\n but was:<{actual}>")]
pub struct VerificationFailure {
    pub reason: String,
    pub expected: String,
    pub actual: String,
}

impl VerificationFailure {
    pub fn new(
        reason: impl Into<String>,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self {
            reason: reason.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Distinguishes the two member shapes a contract can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Method,
    Property,
}

impl MemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberKind::Method => "method",
            MemberKind::Property => "property",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised at registration time when an expectation cannot apply to the target contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{type_name} does not define a member '{member}' matching the recorded arguments")]
    MissingMember { type_name: String, member: String },
    #[error("{kind} '{member}' on {type_name} is not overridable and cannot be mocked")]
    NotOverridable {
        type_name: String,
        member: String,
        kind: MemberKind,
    },
    #[error("stubbed result for '{member}' must be assignable to {expected}, got {actual}")]
    IncompatibleReturnType {
        member: String,
        expected: String,
        actual: String,
    },
    #[error("cannot ignore '{member}' after the substitute instance has been created")]
    SubstituteAlreadyCreated { member: String },
    #[error("substitute for {type_name} does not route or implement '{member}'")]
    UnroutedMember { type_name: String, member: String },
}

/// Test-author supplied error that is re-raised verbatim by a matching call.
#[derive(Clone)]
pub struct StubbedError {
    inner: Arc<dyn StdError + Send + Sync + 'static>,
}

impl StubbedError {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Builds a stubbed error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        let boxed: Box<dyn StdError + Send + Sync> = message.into().into();
        Self {
            inner: Arc::from(boxed),
        }
    }

    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.as_ref()
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.inner.as_ref().downcast_ref::<E>()
    }

    /// Returns true when both handles point at the same recorded error.
    pub fn same_as(&self, other: &StubbedError) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<anyhow::Error> for StubbedError {
    fn from(error: anyhow::Error) -> Self {
        let boxed: Box<dyn StdError + Send + Sync> = error.into();
        Self {
            inner: Arc::from(boxed),
        }
    }
}

impl fmt::Debug for StubbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StubbedError").field(&self.inner).finish()
    }
}

impl fmt::Display for StubbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for StubbedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

#[derive(Debug, Clone, Error)]
/// Enumerates every failure the mock engine can propagate.
pub enum MockError {
    #[error(transparent)]
    Verification(#[from] VerificationFailure),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Stubbed(#[from] StubbedError),
}

impl MockError {
    pub fn as_verification(&self) -> Option<&VerificationFailure> {
        match self {
            MockError::Verification(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn as_configuration(&self) -> Option<&ConfigurationError> {
        match self {
            MockError::Configuration(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_stubbed(&self) -> Option<&StubbedError> {
        match self {
            MockError::Stubbed(error) => Some(error),
            _ => None,
        }
    }
}

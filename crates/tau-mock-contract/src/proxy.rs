//! Substitute generation: route every interceptable member through one handler.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use serde_json::Value;
use tau_mock::{ConfigurationError, Mock, MockError, VerificationFailure, VerificationReport};

use crate::descriptor::{TypeDescriptor, TypeKind};

/// Routing callback a substitute funnels intercepted calls into.
pub trait Invoker: Send + Sync {
    fn invoke(
        &self,
        member: &str,
        args: &mut [Value],
        arg_types: &[String],
    ) -> Result<Value, MockError>;
}

/// A live stand-in for a target type.
pub trait Substitute: Send + Sync {
    fn type_name(&self) -> &str;

    fn call(&self, member: &str, args: &mut [Value]) -> Result<Value, MockError>;

    fn get(&self, property: &str) -> Result<Value, MockError> {
        self.call(&format!("get_{property}"), &mut [])
    }

    fn set(&self, property: &str, value: Value) -> Result<(), MockError> {
        self.call(&format!("set_{property}"), &mut [value])
            .map(|_| ())
    }
}

/// Produces substitutes for target types.
pub trait ProxyGenerator: Send + Sync {
    fn generate(
        &self,
        target: &TypeDescriptor,
        ignored: &BTreeSet<String>,
        invoker: Arc<dyn Invoker>,
    ) -> Result<Arc<dyn Substitute>, MockError>;
}

/// A registry shared between the recording side and a substitute.
#[derive(Debug, Clone)]
pub struct SharedMock {
    inner: Arc<Mutex<Mock>>,
}

impl SharedMock {
    pub fn new(mock: Mock) -> Self {
        Self {
            inner: Arc::new(Mutex::new(mock)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Mock> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn verify(&self) -> Result<(), VerificationFailure> {
        self.lock().verify()
    }

    pub fn verify_all(&self) -> VerificationReport {
        self.lock().verify_all()
    }
}

// Constraints are evaluated under the registry lock; a predicate that locks
// this handle again deadlocks.
impl Invoker for SharedMock {
    fn invoke(
        &self,
        member: &str,
        args: &mut [Value],
        arg_types: &[String],
    ) -> Result<Value, MockError> {
        self.lock().invoke(member, args, arg_types)
    }
}

type RealImplementation = dyn Fn(&mut [Value]) -> Result<Value, MockError> + Send + Sync;

#[derive(Clone)]
enum Route {
    Intercept { arg_types: Vec<String> },
    Real(Arc<RealImplementation>),
}

/// Builds a routing table from the descriptor at generation time.
///
/// Overridable, non-ignored members are intercepted. Everything else runs the
/// real implementation registered with [`TableProxyGenerator::with_implementation`].
#[derive(Clone, Default)]
pub struct TableProxyGenerator {
    implementations: HashMap<String, Arc<RealImplementation>>,
}

impl TableProxyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_implementation<F>(mut self, member: impl Into<String>, implementation: F) -> Self
    where
        F: Fn(&mut [Value]) -> Result<Value, MockError> + Send + Sync + 'static,
    {
        self.implementations
            .insert(member.into(), Arc::new(implementation));
        self
    }

    fn real(&self, member: &str) -> Option<Route> {
        self.implementations
            .get(member)
            .map(|implementation| Route::Real(Arc::clone(implementation)))
    }
}

impl fmt::Debug for TableProxyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut members = self.implementations.keys().collect::<Vec<_>>();
        members.sort();
        f.debug_struct("TableProxyGenerator")
            .field("implementations", &members)
            .finish()
    }
}

impl ProxyGenerator for TableProxyGenerator {
    fn generate(
        &self,
        target: &TypeDescriptor,
        ignored: &BTreeSet<String>,
        invoker: Arc<dyn Invoker>,
    ) -> Result<Arc<dyn Substitute>, MockError> {
        let mut routes: HashMap<String, Vec<Route>> = HashMap::new();
        let mut intercepted = 0usize;

        for owner in target.capability_set() {
            for method in &owner.methods {
                let overridable = method.overridable || owner.kind == TypeKind::Contract;
                let route = if overridable && !ignored.contains(&method.name) {
                    intercepted += 1;
                    Some(Route::Intercept {
                        arg_types: method.params.clone(),
                    })
                } else {
                    self.real(&method.name)
                };
                if let Some(route) = route {
                    routes.entry(method.name.clone()).or_default().push(route);
                }
            }

            for property in &owner.properties {
                let accessors = [
                    (property.getter_name(), property.getter, Vec::new()),
                    (
                        property.setter_name(),
                        property.setter,
                        vec![property.ty.clone()],
                    ),
                ];
                for (name, accessor, arg_types) in accessors {
                    let Some(accessor) = accessor else {
                        continue;
                    };
                    let overridable =
                        accessor.overridable || owner.kind == TypeKind::Contract;
                    let skipped = ignored.contains(&name) || ignored.contains(&property.name);
                    let route = if overridable && !skipped {
                        intercepted += 1;
                        Some(Route::Intercept { arg_types })
                    } else {
                        self.real(&name)
                    };
                    if let Some(route) = route {
                        routes.entry(name).or_default().push(route);
                    }
                }
            }
        }

        tracing::debug!(
            target_type = %target.name,
            members = routes.len(),
            intercepted,
            ignored = ignored.len(),
            "generated substitute routing table"
        );

        Ok(Arc::new(TableSubstitute {
            type_name: target.name.clone(),
            routes,
            invoker,
        }))
    }
}

struct TableSubstitute {
    type_name: String,
    routes: HashMap<String, Vec<Route>>,
    invoker: Arc<dyn Invoker>,
}

impl TableSubstitute {
    fn route(&self, member: &str, arity: usize) -> Option<&Route> {
        let candidates = self.routes.get(member)?;
        candidates
            .iter()
            .find(|route| match route {
                Route::Intercept { arg_types } => arg_types.len() == arity,
                Route::Real(_) => true,
            })
            .or_else(|| candidates.first())
    }
}

impl Substitute for TableSubstitute {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn call(&self, member: &str, args: &mut [Value]) -> Result<Value, MockError> {
        match self.route(member, args.len()) {
            Some(Route::Intercept { arg_types }) => self.invoker.invoke(member, args, arg_types),
            Some(Route::Real(implementation)) => (**implementation)(args),
            None => Err(ConfigurationError::UnroutedMember {
                type_name: self.type_name.clone(),
                member: member.to_string(),
            }
            .into()),
        }
    }
}

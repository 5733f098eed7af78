//! Contract-aware substitutes built on the `tau-mock` registry.
//!
//! A [`DynamicMock`] checks every expectation against a [`TypeDescriptor`]
//! before recording it, then hands out a substitute whose interceptable
//! members all route back into the shared registry.
mod descriptor;
mod dynamic_mock;
mod proxy;

pub use descriptor::{
    type_accepts, value_assignable, AccessorDescriptor, MethodDescriptor, PropertyDescriptor,
    ResolvedMethod, ResolvedProperty, TypeDescriptor, TypeKind, ANY_TYPE, VOID_TYPE,
};
pub use dynamic_mock::DynamicMock;
pub use proxy::{Invoker, ProxyGenerator, SharedMock, Substitute, TableProxyGenerator};

//! Declarative description of the type a substitute stands in for.
//!
//! Descriptors carry just enough shape for pre-flight validation: member
//! names, parameter and result types, and whether each member can be
//! intercepted. They can be built in code or loaded from JSON.

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tau_mock::{logical_member_name, value_type_name};

pub const ANY_TYPE: &str = "any";
pub const VOID_TYPE: &str = "void";

const VALUE_TYPES: &[&str] = &["bool", "integer", "number"];
const BUILTIN_TYPES: &[&str] = &[
    "bool", "integer", "number", "string", "array", "object", ANY_TYPE, VOID_TYPE,
];

/// Returns true when an argument or result of type `actual` can flow into `declared`.
pub fn type_accepts(declared: &str, actual: &str) -> bool {
    if declared == actual || declared == ANY_TYPE {
        return true;
    }
    if actual == "null" {
        return !VALUE_TYPES.contains(&declared);
    }
    if declared == "number" && actual == "integer" {
        return true;
    }
    // Named user types are opaque objects.
    !BUILTIN_TYPES.contains(&declared) && actual == "object"
}

/// A collapsed `get_`/`set_` name decides by prefix, so `get_Item(i)` reads an
/// indexer. Bare names with one argument address the setter.
pub(crate) fn addresses_setter(member: &str, arity: usize) -> bool {
    if logical_member_name(member, arity) != member {
        return member.starts_with("set_");
    }
    arity == 1
}

pub fn value_assignable(declared: &str, value: &Value) -> bool {
    type_accepts(declared, value_type_name(value))
}

fn default_void() -> String {
    VOID_TYPE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Public struct `MethodDescriptor` describing one method overload.
pub struct MethodDescriptor {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default = "default_void")]
    pub returns: String,
    #[serde(default)]
    pub overridable: bool,
}

impl MethodDescriptor {
    pub fn new<I, S>(name: impl Into<String>, params: I, returns: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            returns: returns.into(),
            overridable: false,
        }
    }

    pub fn overridable(mut self) -> Self {
        self.overridable = true;
        self
    }

    /// Arity plus positional type compatibility with the recorded argument types.
    pub fn accepts(&self, arg_types: &[String]) -> bool {
        self.params.len() == arg_types.len()
            && self
                .params
                .iter()
                .zip(arg_types)
                .all(|(declared, actual)| type_accepts(declared, actual))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorDescriptor {
    #[serde(default)]
    pub overridable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Public struct `PropertyDescriptor` describing a property and its accessors.
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub getter: Option<AccessorDescriptor>,
    #[serde(default)]
    pub setter: Option<AccessorDescriptor>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            getter: None,
            setter: None,
        }
    }

    pub fn getter(mut self, overridable: bool) -> Self {
        self.getter = Some(AccessorDescriptor { overridable });
        self
    }

    pub fn setter(mut self, overridable: bool) -> Self {
        self.setter = Some(AccessorDescriptor { overridable });
        self
    }

    /// Accessor addressed by a call to `member` with `arity` arguments.
    pub fn accessor_for(&self, member: &str, arity: usize) -> Option<AccessorDescriptor> {
        if addresses_setter(member, arity) {
            self.setter
        } else {
            self.getter
        }
    }

    pub fn getter_name(&self) -> String {
        format!("get_{}", self.name)
    }

    pub fn setter_name(&self) -> String {
        format!("set_{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `TypeKind` values.
pub enum TypeKind {
    #[default]
    Class,
    /// Abstract capability set; every member is interceptable.
    Contract,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Public struct `TypeDescriptor` describing a mockable target type.
pub struct TypeDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub base: Option<Box<TypeDescriptor>>,
    #[serde(default)]
    pub contracts: Vec<TypeDescriptor>,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
}

/// A method found somewhere in a type's capability set.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMethod<'a> {
    pub owner: &'a TypeDescriptor,
    pub method: &'a MethodDescriptor,
}

impl ResolvedMethod<'_> {
    pub fn is_overridable(&self) -> bool {
        self.method.overridable || self.owner.kind == TypeKind::Contract
    }
}

/// A property found somewhere in a type's capability set.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedProperty<'a> {
    pub owner: &'a TypeDescriptor,
    pub property: &'a PropertyDescriptor,
}

impl ResolvedProperty<'_> {
    pub fn accessor_overridable(&self, accessor: AccessorDescriptor) -> bool {
        accessor.overridable || self.owner.kind == TypeKind::Contract
    }
}

impl TypeDescriptor {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            base: None,
            contracts: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn contract(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Contract,
            ..Self::class(name)
        }
    }

    /// Parses a descriptor from its JSON form.
    pub fn from_json(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).context("invalid type descriptor JSON")
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn extends(mut self, base: TypeDescriptor) -> Self {
        self.base = Some(Box::new(base));
        self
    }

    pub fn implements(mut self, contract: TypeDescriptor) -> Self {
        self.contracts.push(contract);
        self
    }

    /// The type itself, its base chain, and every implemented contract, each once.
    pub fn capability_set(&self) -> Vec<&TypeDescriptor> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        let mut pending = vec![self];
        while let Some(current) = pending.pop() {
            if !seen.insert(current.name.as_str()) {
                continue;
            }
            ordered.push(current);
            for contract in current.contracts.iter().rev() {
                pending.push(contract);
            }
            if let Some(base) = &current.base {
                pending.push(base.as_ref());
            }
        }
        ordered
    }

    pub fn find_method(&self, name: &str, arg_types: &[String]) -> Option<ResolvedMethod<'_>> {
        self.capability_set().into_iter().find_map(|owner| {
            owner
                .methods
                .iter()
                .find(|method| method.name == name && method.accepts(arg_types))
                .map(|method| ResolvedMethod { owner, method })
        })
    }

    pub fn find_property(&self, name: &str) -> Option<ResolvedProperty<'_>> {
        self.capability_set().into_iter().find_map(|owner| {
            owner
                .properties
                .iter()
                .find(|property| property.name == name)
                .map(|property| ResolvedProperty { owner, property })
        })
    }
}

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Type descriptor recorded for an argument slot matched by a custom constraint.
pub const CONSTRAINT_TYPE: &str = "constraint";

/// Returns the argument-type descriptor for a dynamic value.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(number) if number.is_i64() || number.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Identity of one member overload: owner, member name and argument types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Signature {
    owner: String,
    member: String,
    arg_types: Vec<String>,
}

impl Signature {
    pub fn new<I, S>(owner: impl Into<String>, member: impl Into<String>, arg_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            owner: owner.into(),
            member: member.into(),
            arg_types: arg_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Derives argument types from literal argument values.
    pub fn for_values(owner: impl Into<String>, member: impl Into<String>, args: &[Value]) -> Self {
        Self::new(owner, member, args.iter().map(value_type_name))
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn arg_types(&self) -> &[String] {
        &self.arg_types
    }

    pub fn arity(&self) -> usize {
        self.arg_types.len()
    }

    /// True when at least one slot is matched by a custom constraint.
    pub fn has_constraint_arg(&self) -> bool {
        self.arg_types.iter().any(|ty| ty == CONSTRAINT_TYPE)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}()", self.owner, self.member)
    }
}

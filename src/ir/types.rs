//! IR Types and Constant Values
//!
//! The type system is deliberately small: enough to type registers, memory
//! slots, and call results. Smart-pointer values are ordinary pointers at
//! this level; their ownership semantics are recovered from callee names,
//! not from types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// IR type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrType {
    /// Void type (no value)
    Void,

    /// Boolean type
    Bool,

    /// Integer types
    I32,
    I64,

    /// Floating point type
    F64,

    /// Pointer type
    Ptr(Box<IrType>),

    /// Opaque named type (class/struct known only by name)
    Named(String),
}

impl IrType {
    /// Shorthand for a pointer to an opaque named type.
    pub fn ptr_to_named(name: impl Into<String>) -> Self {
        IrType::Ptr(Box::new(IrType::Named(name.into())))
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Bool => write!(f, "bool"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::F64 => write!(f, "f64"),
            IrType::Ptr(inner) => write!(f, "*{}", inner),
            IrType::Named(name) => write!(f, "%{}", name),
        }
    }
}

/// Constant value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrValue {
    /// No value
    Void,
    /// Undefined value
    Undef,
    /// Null pointer
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer values
    I32(i32),
    I64(i64),
    /// Floating point value
    F64(f64),
    /// String value
    Str(String),
}

impl IrValue {
    /// The type of this constant, as far as it can be told from the value.
    pub fn ty(&self) -> IrType {
        match self {
            IrValue::Void | IrValue::Undef => IrType::Void,
            IrValue::Null => IrType::Ptr(Box::new(IrType::Void)),
            IrValue::Bool(_) => IrType::Bool,
            IrValue::I32(_) => IrType::I32,
            IrValue::I64(_) => IrType::I64,
            IrValue::F64(_) => IrType::F64,
            IrValue::Str(_) => IrType::Ptr(Box::new(IrType::I32)),
        }
    }
}

impl fmt::Display for IrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrValue::Void => write!(f, "void"),
            IrValue::Undef => write!(f, "undef"),
            IrValue::Null => write!(f, "null"),
            IrValue::Bool(b) => write!(f, "{}", b),
            IrValue::I32(v) => write!(f, "{}", v),
            IrValue::I64(v) => write!(f, "{}", v),
            IrValue::F64(v) => write!(f, "{}", v),
            IrValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(format!("{}", IrType::I32), "i32");
        assert_eq!(
            format!("{}", IrType::ptr_to_named("UniquePtr")),
            "*%UniquePtr"
        );
    }

    #[test]
    fn test_value_types() {
        assert_eq!(IrValue::I32(7).ty(), IrType::I32);
        assert_eq!(IrValue::Bool(true).ty(), IrType::Bool);
    }
}

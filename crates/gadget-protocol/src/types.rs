//! Declared parameter types and the typed arguments coerced from JSON.
//!
//! Capability operations declare a [`ParamType`] per position. Incoming JSON
//! arguments are deserialized against that type with `serde_json`; a value
//! that does not deserialize as the declared type is a coercion failure for
//! that operation.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Type descriptor for one operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// JSON boolean.
    Bool,
    /// Integral JSON number within the 32-bit signed range.
    Int,
    /// Integral JSON number within the 64-bit signed range.
    Long,
    /// Any JSON number.
    Double,
    /// JSON string.
    String,
    /// JSON array of 32-bit integers.
    IntArray,
    /// JSON array of strings.
    StringArray,
    /// JSON array of integers in `0..=255`.
    Bytes,
    /// Any JSON value, passed through untouched.
    Json,
}

impl ParamType {
    /// Returns the descriptor name used in logs and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::String => "string",
            Self::IntArray => "int[]",
            Self::StringArray => "string[]",
            Self::Bytes => "bytes",
            Self::Json => "json",
        }
    }

    /// Deserializes `value` as this type.
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError`] when the value does not have this type's
    /// shape or range.
    pub fn coerce(self, value: Value) -> Result<Argument, CoercionError> {
        match self {
            Self::Bool => typed(self, value).map(Argument::Bool),
            Self::Int => typed(self, value).map(Argument::Int),
            Self::Long => typed(self, value).map(Argument::Long),
            Self::Double => typed(self, value).map(Argument::Double),
            Self::String => typed(self, value).map(Argument::String),
            Self::IntArray => typed(self, value).map(Argument::IntArray),
            Self::StringArray => typed(self, value).map(Argument::StringArray),
            Self::Bytes => typed(self, value).map(Argument::Bytes),
            Self::Json => Ok(Argument::Json(value)),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn typed<T: DeserializeOwned>(expected: ParamType, value: Value) -> Result<T, CoercionError> {
    serde_json::from_value(value).map_err(|source| CoercionError { expected, source })
}

/// A JSON argument did not match its declared parameter type.
#[derive(Debug, Error)]
#[error("expected {expected}: {source}")]
pub struct CoercionError {
    /// Declared type the value was coerced against.
    pub expected: ParamType,
    /// Deserialization failure.
    #[source]
    pub source: serde_json::Error,
}

/// An argument value coerced to its declared parameter type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Argument {
    /// Boolean argument.
    Bool(bool),
    /// 32-bit integer argument.
    Int(i32),
    /// 64-bit integer argument.
    Long(i64),
    /// Floating point argument.
    Double(f64),
    /// String argument.
    String(String),
    /// Integer array argument.
    IntArray(Vec<i32>),
    /// String array argument.
    StringArray(Vec<String>),
    /// Byte array argument.
    Bytes(Vec<u8>),
    /// Untyped JSON argument.
    Json(Value),
}

impl Argument {
    /// Returns the declared type this argument was coerced to.
    #[must_use]
    pub const fn param_type(&self) -> ParamType {
        match self {
            Self::Bool(_) => ParamType::Bool,
            Self::Int(_) => ParamType::Int,
            Self::Long(_) => ParamType::Long,
            Self::Double(_) => ParamType::Double,
            Self::String(_) => ParamType::String,
            Self::IntArray(_) => ParamType::IntArray,
            Self::StringArray(_) => ParamType::StringArray,
            Self::Bytes(_) => ParamType::Bytes,
            Self::Json(_) => ParamType::Json,
        }
    }

    /// Returns the boolean value, if this is a boolean argument.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer value for `Int` and `Long` arguments.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(i64::from(*value)),
            Self::Long(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string value, if this is a string argument.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the integer array, if this is an integer array argument.
    #[must_use]
    pub fn as_int_array(&self) -> Option<&[i32]> {
        match self {
            Self::IntArray(values) => Some(values),
            _ => None,
        }
    }
}

//! Request payload model.
//!
//! A request is a JSON array `[target, method, arg0, arg1, ...]`. Two method
//! names are reserved for administrative operations; every other method is a
//! capability call whose arguments stay untyped until the dispatcher resolves
//! them against an operation signature.

use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::error_kind::ErrorKind;

/// Method name that enumerates discoverable targets.
pub const LIST_APPS: &str = "listApps";
/// Method name that attaches to a target.
pub const CONNECT_APP: &str = "connectApp";

/// Decoded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Identifier of the target the request is addressed to.
    pub target: String,
    /// Operation requested.
    pub kind: RequestKind,
}

/// Operation carried by a [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    /// Enumerate discoverable targets.
    ListApps,
    /// Attach to the request's target.
    ConnectApp,
    /// Invoke a capability operation on the request's target.
    Call {
        /// Operation name.
        method: String,
        /// Positional arguments, not yet coerced.
        arguments: Vec<Value>,
    },
}

/// The payload was not a well-formed request array.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Payload was not valid JSON.
    #[error("request is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Payload was JSON but not an array.
    #[error("request must be a JSON array, got {found}")]
    NotAnArray {
        /// JSON type that was received instead.
        found: &'static str,
    },
    /// Array had fewer than the two required elements.
    #[error("request array has {len} elements; target and method are required")]
    TooShort {
        /// Number of elements received.
        len: usize,
    },
    /// Target or method element was not a string.
    #[error("request {field} must be a string, got {found}")]
    NotAString {
        /// Which element was malformed.
        field: &'static str,
        /// JSON type that was received instead.
        found: &'static str,
    },
}

impl RequestError {
    /// Returns the error kind reported to the peer.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::BadRequest
    }
}

impl Request {
    /// Builds an enumerate-targets request.
    #[must_use]
    pub fn list_apps(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: RequestKind::ListApps,
        }
    }

    /// Builds an attach request.
    #[must_use]
    pub fn connect_app(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: RequestKind::ConnectApp,
        }
    }

    /// Builds a capability call.
    #[must_use]
    pub fn call(target: impl Into<String>, method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            target: target.into(),
            kind: RequestKind::Call {
                method: method.into(),
                arguments,
            },
        }
    }

    /// Parses a frame payload.
    ///
    /// Arguments following a reserved method name are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the payload is not a JSON array whose
    /// first two elements are strings.
    pub fn parse(payload: &[u8]) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_slice(payload)?;
        Self::from_value(value)
    }

    /// Interprets an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] under the same conditions as [`Self::parse`].
    pub fn from_value(value: Value) -> Result<Self, RequestError> {
        let Value::Array(elements) = value else {
            return Err(RequestError::NotAnArray {
                found: json_type(&value),
            });
        };
        let len = elements.len();
        let mut elements = elements.into_iter();
        let (Some(target), Some(method)) = (elements.next(), elements.next()) else {
            return Err(RequestError::TooShort { len });
        };
        let target = expect_string("target", target)?;
        let method = expect_string("method", method)?;
        let kind = match method.as_str() {
            LIST_APPS => RequestKind::ListApps,
            CONNECT_APP => RequestKind::ConnectApp,
            _ => RequestKind::Call {
                method,
                arguments: elements.collect(),
            },
        };
        Ok(Self { target, kind })
    }

    /// Returns the method name as it appears on the wire.
    #[must_use]
    pub fn method(&self) -> &str {
        match &self.kind {
            RequestKind::ListApps => LIST_APPS,
            RequestKind::ConnectApp => CONNECT_APP,
            RequestKind::Call { method, .. } => method,
        }
    }

    /// Returns the wire representation as a JSON array.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut elements = vec![
            Value::String(self.target.clone()),
            Value::String(self.method().to_owned()),
        ];
        if let RequestKind::Call { arguments, .. } = &self.kind {
            elements.extend(arguments.iter().cloned());
        }
        Value::Array(elements)
    }
}

impl Serialize for Request {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let arguments: &[Value] = match &self.kind {
            RequestKind::Call { arguments, .. } => arguments,
            RequestKind::ListApps | RequestKind::ConnectApp => &[],
        };
        let mut seq = serializer.serialize_seq(Some(2 + arguments.len()))?;
        seq.serialize_element(&self.target)?;
        seq.serialize_element(self.method())?;
        for argument in arguments {
            seq.serialize_element(argument)?;
        }
        seq.end()
    }
}

fn expect_string(field: &'static str, value: Value) -> Result<String, RequestError> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(RequestError::NotAString {
            field,
            found: json_type(&other),
        }),
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

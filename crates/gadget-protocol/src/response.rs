//! Response payload model.

use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error_kind::ErrorKind;

/// Outcome of a request, serialized as `{"success": bool, "response": any}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The request succeeded with the given payload.
    Success(Value),
    /// The request failed; the payload is the kind's short message.
    Failure(ErrorKind),
}

impl Response {
    /// Builds a successful response from any serializable payload.
    ///
    /// # Errors
    ///
    /// Returns the serialization error when the payload cannot be converted
    /// into JSON.
    pub fn success<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(payload).map(Self::Success)
    }

    /// Returns whether the response reports success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the payload as it appears on the wire.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::Success(value) => value.clone(),
            Self::Failure(kind) => Value::String(kind.message().to_owned()),
        }
    }

    /// Converts the response into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the carried [`ErrorKind`] when the response is a failure.
    pub fn into_result(self) -> Result<Value, ErrorKind> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(kind) => Err(kind),
        }
    }
}

impl From<ErrorKind> for Response {
    fn from(kind: ErrorKind) -> Self {
        Self::Failure(kind)
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Response", 2)?;
        state.serialize_field("success", &self.is_success())?;
        match self {
            Self::Success(value) => state.serialize_field("response", value)?,
            Self::Failure(kind) => state.serialize_field("response", kind.message())?,
        }
        state.end()
    }
}

#[derive(Deserialize)]
struct RawResponse {
    success: bool,
    #[serde(default)]
    response: Value,
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawResponse::deserialize(deserializer)?;
        if raw.success {
            return Ok(Self::Success(raw.response));
        }
        let message = raw
            .response
            .as_str()
            .ok_or_else(|| D::Error::custom("failed response must carry a message string"))?;
        ErrorKind::from_message(message)
            .map(Self::Failure)
            .ok_or_else(|| D::Error::custom(format!("unknown failure message: {message}")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_serializes_payload() {
        let response = Response::success(&vec!["a", "b"]).expect("serialize");
        let encoded = serde_json::to_value(&response).expect("encode");
        assert_eq!(encoded, json!({"success": true, "response": ["a", "b"]}));
    }

    #[test]
    fn failure_serializes_message() {
        let response = Response::from(ErrorKind::ServiceNotFound);
        let encoded = serde_json::to_string(&response).expect("encode");
        assert_eq!(encoded, r#"{"success":false,"response":"Service not found"}"#);
    }

    #[test]
    fn null_success_payload_survives() {
        let decoded: Response =
            serde_json::from_str(r#"{"success":true,"response":null}"#).expect("decode");
        assert_eq!(decoded, Response::Success(Value::Null));
    }

    #[test]
    fn failure_decodes_into_kind() {
        let decoded: Response =
            serde_json::from_str(r#"{"success":false,"response":"Illegal argument"}"#)
                .expect("decode");
        assert_eq!(decoded.into_result(), Err(ErrorKind::IllegalArgument));
    }

    #[test]
    fn unknown_failure_message_is_rejected() {
        let result: Result<Response, _> =
            serde_json::from_str(r#"{"success":false,"response":"boom"}"#);
        assert!(result.is_err());
    }
}

//! JSON message helpers layered over the frame codec.

use std::io::{Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::frame::{self, FrameError};

/// Failure while moving a JSON message through a framed stream.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Framing failed.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// The payload was not the expected JSON.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes `message` as JSON and wraps it in a frame.
///
/// # Errors
///
/// Returns [`ProtocolError`] when serialization fails or the payload is too
/// large to frame.
pub fn encode_message<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let payload = serde_json::to_vec(message)?;
    Ok(frame::encode_frame(&payload)?)
}

/// Deserializes a frame payload as JSON.
///
/// # Errors
///
/// Returns [`ProtocolError::Json`] when the payload does not decode as `T`.
pub fn decode_message<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Serializes and writes one framed message.
///
/// # Errors
///
/// Returns [`ProtocolError`] when serialization or the write fails.
pub fn write_message<W: Write, T: Serialize>(
    writer: &mut W,
    message: &T,
) -> Result<(), ProtocolError> {
    let payload = serde_json::to_vec(message)?;
    frame::write_frame(writer, &payload)?;
    Ok(())
}

/// Reads and deserializes one framed message; `None` on a clean close.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the stream ends inside a frame, the read
/// fails, or the payload does not decode as `T`.
pub fn read_message<R: Read, T: DeserializeOwned>(
    reader: &mut R,
) -> Result<Option<T>, ProtocolError> {
    frame::read_frame(reader)?
        .map(|payload| decode_message(&payload))
        .transpose()
}

/// Reads and deserializes one framed message whose payload may not exceed
/// `limit` bytes; `None` on a clean close.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the frame is over `limit`, the stream ends
/// inside a frame, the read fails, or the payload does not decode as `T`.
pub fn read_message_with_limit<R: Read, T: DeserializeOwned>(
    reader: &mut R,
    limit: usize,
) -> Result<Option<T>, ProtocolError> {
    frame::read_frame_with_limit(reader, limit)?
        .map(|payload| decode_message(&payload))
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde_json::{Value, json};

    use super::*;
    use crate::{ErrorKind, Response};

    #[test]
    fn response_frame_carries_json_body() {
        let bytes = encode_message(&Response::from(ErrorKind::BadRequest)).expect("encode");
        let (prefix, body) = bytes.split_at(frame::PREFIX_LEN);
        assert_eq!(prefix, &[0, 0, 0, 42]);
        assert_eq!(body, br#"{"success":false,"response":"Bad request"}"#);
    }

    #[test]
    fn messages_read_back_in_order() {
        let mut buffer = Vec::new();
        write_message(&mut buffer, &json!(["", "listApps"])).expect("write first");
        write_message(&mut buffer, &json!(["app", "connectApp"])).expect("write second");

        let mut reader = Cursor::new(buffer);
        let first: Option<Value> = read_message(&mut reader).expect("read first");
        let second: Option<Value> = read_message(&mut reader).expect("read second");
        let end: Option<Value> = read_message(&mut reader).expect("read end");
        assert_eq!(first, Some(json!(["", "listApps"])));
        assert_eq!(second, Some(json!(["app", "connectApp"])));
        assert_eq!(end, None);
    }

    #[test]
    fn invalid_json_is_reported() {
        let error = decode_message::<Value>(b"{not json").expect_err("should fail");
        assert!(matches!(error, ProtocolError::Json(_)));
    }
}

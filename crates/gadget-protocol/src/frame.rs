//! Length-prefixed framing for Gadget messages.
//!
//! Every message on the wire is a 4-byte big-endian unsigned length followed
//! by exactly that many bytes of UTF-8 JSON. The codec itself enforces no
//! payload ceiling; callers that need one configure it on the decoder.
//!
//! [`FrameDecoder`] is the incremental, I/O-free half of the codec. Socket
//! owners push whatever bytes a read produced and pop complete frames, so
//! short reads and several frames arriving in one read are handled the same
//! way. [`read_frame`] and [`write_frame`] are blocking conveniences for
//! callers that own a [`Read`]/[`Write`] stream outright.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Size of the length prefix in bytes.
pub const PREFIX_LEN: usize = 4;

/// Errors raised while framing or unframing messages.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The stream ended inside the 4-byte length prefix.
    #[error("stream ended inside length prefix after {received} of 4 bytes")]
    TruncatedPrefix {
        /// Prefix bytes received before the stream ended.
        received: usize,
    },
    /// The stream ended before the announced payload was complete.
    #[error("stream ended after {received} of {expected} payload bytes")]
    TruncatedBody {
        /// Announced payload length.
        expected: usize,
        /// Payload bytes received before the stream ended.
        received: usize,
    },
    /// The announced or supplied payload exceeds the permitted size.
    #[error("frame of {size} bytes exceeds {max_size} byte limit")]
    TooLarge {
        /// Size of the offending payload.
        size: usize,
        /// Permitted maximum.
        max_size: usize,
    },
    /// Reading from or writing to the underlying stream failed.
    #[error("frame I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// Returns `true` when the error reports a stream that ended mid-frame.
    #[must_use]
    pub const fn is_truncation(&self) -> bool {
        matches!(self, Self::TruncatedPrefix { .. } | Self::TruncatedBody { .. })
    }
}

/// Encodes a payload as a single frame.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] when the payload length does not fit the
/// 32-bit prefix.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let prefix = length_prefix(payload.len())?;
    let mut frame = Vec::with_capacity(PREFIX_LEN + payload.len());
    frame.extend_from_slice(&prefix);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Writes a payload as one frame and flushes the writer.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] for payloads that do not fit the prefix
/// and [`FrameError::Io`] when writing fails.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    let prefix = length_prefix(payload.len())?;
    writer.write_all(&prefix)?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads one complete frame from a blocking reader.
///
/// Returns `Ok(None)` when the stream ends cleanly on a frame boundary. The
/// payload buffer grows with the bytes actually received, so a corrupt prefix
/// costs no more memory than the stream delivers.
///
/// # Errors
///
/// Returns a truncation error when the stream ends mid-frame and
/// [`FrameError::Io`] for any other read failure.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
    read_frame_bounded(reader, None)
}

/// Reads one complete frame, rejecting payloads larger than `limit` bytes.
///
/// The prefix is checked before any payload byte is read.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] when the prefix announces more than
/// `limit` bytes, plus the errors of [`read_frame`].
pub fn read_frame_with_limit<R: Read>(
    reader: &mut R,
    limit: usize,
) -> Result<Option<Vec<u8>>, FrameError> {
    read_frame_bounded(reader, Some(limit))
}

fn read_frame_bounded<R: Read>(
    reader: &mut R,
    limit: Option<usize>,
) -> Result<Option<Vec<u8>>, FrameError> {
    let mut prefix = [0_u8; PREFIX_LEN];
    let received = read_full(reader, &mut prefix)?;
    if received == 0 {
        return Ok(None);
    }
    if received < PREFIX_LEN {
        return Err(FrameError::TruncatedPrefix { received });
    }

    let expected = payload_len(prefix);
    if let Some(max_size) = limit
        && expected > max_size
    {
        return Err(FrameError::TooLarge {
            size: expected,
            max_size,
        });
    }
    let mut payload = Vec::with_capacity(expected.min(READ_CAPACITY_HINT));
    let body_received = read_body(reader, expected, &mut payload)?;
    if body_received < expected {
        return Err(FrameError::TruncatedBody {
            expected,
            received: body_received,
        });
    }
    Ok(Some(payload))
}

// Upper bound on the up-front payload allocation; larger payloads grow as
// their bytes arrive.
const READ_CAPACITY_HINT: usize = 64 * 1024;

fn read_body<R: Read>(reader: &mut R, expected: usize, payload: &mut Vec<u8>) -> io::Result<usize> {
    reader.take(expected as u64).read_to_end(payload)?;
    Ok(payload.len())
}

/// Fills `buf` from the reader, stopping early only at end of stream.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let Some(remaining) = buf.get_mut(filled..) else {
            break;
        };
        match reader.read(remaining) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(filled)
}

fn length_prefix(len: usize) -> Result<[u8; PREFIX_LEN], FrameError> {
    let value = u32::try_from(len).map_err(|_| FrameError::TooLarge {
        size: len,
        max_size: u32::MAX as usize,
    })?;
    Ok(value.to_be_bytes())
}

fn payload_len(prefix: [u8; PREFIX_LEN]) -> usize {
    u32::from_be_bytes(prefix) as usize
}

/// Incremental frame decoder holding a per-connection read buffer.
///
/// Bytes are appended with [`FrameDecoder::push`]; complete frames are
/// removed with [`FrameDecoder::next_frame`] in arrival order. The decoder
/// never performs I/O.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    cursor: usize,
    limit: Option<usize>,
}

impl FrameDecoder {
    /// Creates a decoder without a payload ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder that rejects payloads larger than `limit` bytes.
    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            limit: Some(limit),
        }
    }

    /// Appends bytes received from the stream.
    pub fn push(&mut self, bytes: &[u8]) {
        self.compact();
        self.buffer.extend_from_slice(bytes);
    }

    /// Removes the next complete frame, if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] as soon as a prefix announces a
    /// payload over the configured limit.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        let pending = self.pending();
        let Some(prefix_bytes) = pending.get(..PREFIX_LEN) else {
            return Ok(None);
        };
        let mut prefix = [0_u8; PREFIX_LEN];
        prefix.copy_from_slice(prefix_bytes);
        let expected = payload_len(prefix);
        if let Some(max_size) = self.limit
            && expected > max_size
        {
            return Err(FrameError::TooLarge {
                size: expected,
                max_size,
            });
        }

        let end = PREFIX_LEN + expected;
        let Some(payload) = pending.get(PREFIX_LEN..end) else {
            return Ok(None);
        };
        let frame = payload.to_vec();
        self.cursor += end;
        Ok(Some(frame))
    }

    /// Returns `true` while part of a frame is buffered.
    #[must_use]
    pub fn has_partial_frame(&self) -> bool {
        !self.pending().is_empty()
    }

    /// Number of buffered bytes not yet returned as frames.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.pending().len()
    }

    /// Converts the buffered remainder into the truncation error reported
    /// when the stream ends, or `None` at a clean frame boundary.
    #[must_use]
    pub fn truncation_error(&self) -> Option<FrameError> {
        let pending = self.pending();
        if pending.is_empty() {
            return None;
        }
        let Some(prefix_bytes) = pending.get(..PREFIX_LEN) else {
            return Some(FrameError::TruncatedPrefix {
                received: pending.len(),
            });
        };
        let mut prefix = [0_u8; PREFIX_LEN];
        prefix.copy_from_slice(prefix_bytes);
        Some(FrameError::TruncatedBody {
            expected: payload_len(prefix),
            received: pending.len() - PREFIX_LEN,
        })
    }

    fn pending(&self) -> &[u8] {
        self.buffer.get(self.cursor..).unwrap_or_default()
    }

    fn compact(&mut self) {
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
    }
}

//! Wire protocol shared by the Gadget daemon and its clients.
//!
//! Messages travel as length-prefixed JSON frames ([`frame`]). Requests are
//! JSON arrays `[target, method, ...arguments]` ([`request`]) and responses
//! are objects `{"success": bool, "response": any}` ([`response`]). Failed
//! responses carry one of the fixed [`ErrorKind`] messages. Capability
//! operations declare [`ParamType`]s, against which untyped JSON arguments are
//! coerced into [`Argument`]s.

pub mod codec;
pub mod error_kind;
pub mod frame;
pub mod request;
pub mod response;
pub mod types;

pub use codec::{
    ProtocolError, decode_message, encode_message, read_message, read_message_with_limit,
    write_message,
};
pub use error_kind::ErrorKind;
pub use frame::{
    FrameDecoder, FrameError, PREFIX_LEN, encode_frame, read_frame, read_frame_with_limit,
    write_frame,
};
pub use request::{CONNECT_APP, LIST_APPS, Request, RequestError, RequestKind};
pub use response::Response;
pub use types::{Argument, CoercionError, ParamType};

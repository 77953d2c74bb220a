//! TCP transport for the gadget server.
//!
//! [`SocketListener`] accepts connections on a background thread and hands
//! each one to a [`ConnectionHandler`]. [`Listener`] wraps that loop with the
//! start/stop lifecycle and the live connection set, so stopping the server
//! closes every open socket before returning.

mod connections;
mod errors;
mod lifecycle;
mod listener;
#[cfg(test)]
mod test_utils;
mod worker;

pub use self::errors::ListenerError;
pub use self::lifecycle::{Listener, ListenerState, ListenerStopped};
pub use self::worker::ConnectionState;
#[cfg(test)]
pub(crate) use self::worker::connection_span;

pub(crate) use self::connections::ConnectionSupervisor;
pub(crate) use self::errors::ConnectionError;
pub(crate) use self::listener::{ConnectionHandler, ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

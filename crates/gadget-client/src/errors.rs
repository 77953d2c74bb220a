//! Error types for the client library and CLI.

use std::io;

use gadget_protocol::{ErrorKind, ProtocolError};
use thiserror::Error;

/// Errors surfaced while talking to a gadget server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server address could not be resolved.
    #[error("failed to resolve server address {endpoint}: {source}")]
    Resolve {
        /// `host:port` that was looked up.
        endpoint: String,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded without yielding an address.
    #[error("no addresses resolved for {endpoint}")]
    ResolveEmpty {
        /// `host:port` that was looked up.
        endpoint: String,
    },
    /// The TCP connection could not be established.
    #[error("failed to connect to server at {endpoint}: {source}")]
    Connect {
        /// `host:port` that was dialled.
        endpoint: String,
        /// Connect failure.
        #[source]
        source: io::Error,
    },
    /// Framing, socket, or JSON failure on the connection.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The server closed the connection before answering.
    #[error("server closed the connection")]
    Closed,
    /// The server answered with a failure.
    #[error("server reported: {0}")]
    Remote(ErrorKind),
    /// A successful payload did not have the expected shape.
    #[error("unexpected {method} payload: {source}")]
    UnexpectedPayload {
        /// Method whose answer was malformed.
        method: String,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Failure kind reported by the server, if the server answered.
    #[must_use]
    pub fn remote_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Remote(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Errors surfaced by the `gadget` command.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to encode result: {0}")]
    Render(serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(io::Error),
}

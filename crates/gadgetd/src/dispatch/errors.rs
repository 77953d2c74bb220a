//! Error types for request dispatch failures.
//!
//! Every variant maps onto one [`ErrorKind`] for the peer. The variant itself
//! keeps the local detail that is logged but never sent.

use gadget_protocol::{ErrorKind, RequestError};
use thiserror::Error;

use crate::capability::{CapabilityError, ResolveError};
use crate::collaborators::AttachError;

/// Errors surfaced while decoding and dispatching a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Frame payload was not a well-formed request.
    #[error(transparent)]
    BadRequest(#[from] RequestError),

    /// No capability is registered for the target.
    #[error("no capability registered for {target}")]
    ServiceNotFound {
        /// Requested target.
        target: String,
    },

    /// The attach collaborator refused to start.
    #[error("attach to {target} was not initiated: {source}")]
    Attach {
        /// Requested target.
        target: String,
        /// Collaborator failure.
        #[source]
        source: AttachError,
    },

    /// The call did not match an operation of the target's capability.
    #[error("cannot resolve call on {target}: {source}")]
    Resolve {
        /// Requested target.
        target: String,
        /// Resolution failure.
        #[source]
        source: ResolveError,
    },

    /// The capability reported a failure.
    #[error("{method} on {target} failed: {source}")]
    Capability {
        /// Requested target.
        target: String,
        /// Invoked operation.
        method: String,
        /// Capability failure.
        #[source]
        source: CapabilityError,
    },

    /// The capability panicked while handling the call.
    #[error("{method} on {target} panicked: {message}")]
    Panicked {
        /// Requested target.
        target: String,
        /// Invoked operation.
        method: String,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// The result could not be encoded as JSON.
    #[error("failed to serialise result: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DispatchError {
    /// Creates a service not found error.
    pub fn service_not_found(target: impl Into<String>) -> Self {
        Self::ServiceNotFound {
            target: target.into(),
        }
    }

    /// Error kind reported to the peer.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(error) => error.kind(),
            Self::ServiceNotFound { .. } | Self::Attach { .. } => ErrorKind::ServiceNotFound,
            Self::Resolve { source, .. } => source.kind(),
            Self::Capability { source, .. } => source.kind(),
            Self::Panicked { .. } | Self::Serialize(_) => ErrorKind::InvocationError,
        }
    }
}

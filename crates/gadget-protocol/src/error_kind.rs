//! Closed set of failure kinds reported to peers.

use std::fmt;

/// Reason a request failed, as carried in a failed [`Response`].
///
/// Each kind has a fixed short message that is sent on the wire instead of
/// any internal detail.
///
/// [`Response`]: crate::Response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The frame did not hold a well-formed request array.
    BadRequest,
    /// No operation matches the requested name and arity.
    MethodNotFound,
    /// Operations match by arity but no argument list fits their types.
    IllegalArgument,
    /// The capability refused access to the requested member.
    AccessDenied,
    /// The invoked operation itself failed.
    InvocationError,
    /// No capability is registered for the target.
    ServiceNotFound,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::BadRequest,
        Self::MethodNotFound,
        Self::IllegalArgument,
        Self::AccessDenied,
        Self::InvocationError,
        Self::ServiceNotFound,
    ];

    /// Returns the message sent to peers for this kind.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad request",
            Self::MethodNotFound => "Method does not exist",
            Self::IllegalArgument => "Illegal argument",
            Self::AccessDenied => "Illegal access",
            Self::InvocationError => "Invocation error",
            Self::ServiceNotFound => "Service not found",
        }
    }

    /// Parses a wire message back into its kind.
    #[must_use]
    pub fn from_message(message: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.message() == message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

//! Capability interface and operation resolution.
//!
//! A capability is the host-side service a target exposes. It publishes an
//! [`OperationTable`] of `(name, [ParamType])` signatures; the dispatcher
//! resolves each call against that table and then hands the coerced arguments
//! to [`Capability::invoke`].
//!
//! Resolution filters the table by name and arity, then tries each candidate
//! in declaration order, coercing every positional JSON argument to the
//! declared type. The first candidate whose arguments all coerce wins, so
//! same-arity overloads are told apart by their parameter types.

use std::fmt;

use gadget_protocol::{Argument, CoercionError, ErrorKind, ParamType};
use serde_json::Value;
use thiserror::Error;

/// Service attached to a target and invoked by the dispatcher.
///
/// Implementations may be called from several connection threads at once and
/// are responsible for serialising access to their own state.
pub trait Capability: Send + Sync {
    /// Operations this capability accepts.
    fn operations(&self) -> &OperationTable;

    /// Invokes a resolved operation with arguments already coerced to its
    /// declared parameter types.
    fn invoke(&self, operation: &Operation, arguments: Vec<Argument>)
    -> Result<Value, CapabilityError>;

    /// Tears down the binding behind this handle.
    ///
    /// Called by the registry, while it holds its lock, when the handle is
    /// replaced. Implementations must not call back into the registry.
    fn release(&self) {}
}

/// Failure reported by a capability while invoking an operation.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The capability refused access to the requested member.
    #[error("access denied to {member}")]
    AccessDenied {
        /// Member that could not be accessed.
        member: String,
    },
    /// The operation itself failed.
    #[error("invocation failed: {message}")]
    Invocation {
        /// Local diagnostic; never sent to peers.
        message: String,
    },
}

impl CapabilityError {
    /// Creates an access failure for `member`.
    pub fn access_denied(member: impl Into<String>) -> Self {
        Self::AccessDenied {
            member: member.into(),
        }
    }

    /// Creates an invocation failure.
    pub fn invocation(message: impl Into<String>) -> Self {
        Self::Invocation {
            message: message.into(),
        }
    }

    /// Error kind reported to the peer.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::Invocation { .. } => ErrorKind::InvocationError,
        }
    }
}

/// Signature of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    name: String,
    params: Vec<ParamType>,
}

impl Operation {
    /// Declares an operation.
    pub fn new(name: impl Into<String>, params: &[ParamType]) -> Self {
        Self {
            name: name.into(),
            params: params.to_vec(),
        }
    }

    /// Operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types in positional order.
    #[must_use]
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    fn coerce(&self, arguments: &[Value]) -> Result<Vec<Argument>, CoercionError> {
        self.params
            .iter()
            .zip(arguments.iter().cloned())
            .map(|(param, value)| param.coerce(value))
            .collect()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

/// Ordered set of operations a capability accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationTable {
    operations: Vec<Operation>,
}

impl OperationTable {
    /// Builds an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Appends an operation, keeping declaration order.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, params: &[ParamType]) -> Self {
        self.operations.push(Operation::new(name, params));
        self
    }

    /// Iterates over the operations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    /// Number of declared operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the table declares no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Resolves `method` called with `arguments` to a single operation.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MethodNotFound`] when no operation has that
    /// name and arity, and [`ResolveError::IllegalArgument`] when candidates
    /// exist but none accepts the argument types.
    pub fn resolve(
        &self,
        method: &str,
        arguments: &[Value],
    ) -> Result<ResolvedCall<'_>, ResolveError> {
        let mut last_mismatch = None;
        let candidates = self
            .operations
            .iter()
            .filter(|operation| operation.name == method && operation.arity() == arguments.len());
        for operation in candidates {
            match operation.coerce(arguments) {
                Ok(coerced) => {
                    return Ok(ResolvedCall {
                        operation,
                        arguments: coerced,
                    });
                }
                Err(error) => last_mismatch = Some(error),
            }
        }

        Err(match last_mismatch {
            Some(source) => ResolveError::IllegalArgument {
                method: method.to_owned(),
                source,
            },
            None => ResolveError::MethodNotFound {
                method: method.to_owned(),
                arity: arguments.len(),
            },
        })
    }
}

/// Operation chosen for a call together with its coerced arguments.
#[derive(Debug)]
pub struct ResolvedCall<'a> {
    /// Matched operation.
    pub operation: &'a Operation,
    /// Arguments coerced to the operation's declared types.
    pub arguments: Vec<Argument>,
}

/// Failure to match a call against an operation table.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No operation has the requested name and arity.
    #[error("no operation {method} taking {arity} arguments")]
    MethodNotFound {
        /// Requested operation name.
        method: String,
        /// Number of arguments supplied.
        arity: usize,
    },
    /// Operations match by name and arity but reject the argument types.
    #[error("arguments do not fit any {method} overload: {source}")]
    IllegalArgument {
        /// Requested operation name.
        method: String,
        /// Coercion failure of the last candidate tried.
        #[source]
        source: CoercionError,
    },
}

impl ResolveError {
    /// Error kind reported to the peer.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MethodNotFound { .. } => ErrorKind::MethodNotFound,
            Self::IllegalArgument { .. } => ErrorKind::IllegalArgument,
        }
    }
}

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use gadget_protocol::{Request, RequestKind, Response};
use serde_json::Value;
use tracing::{debug, warn};

use crate::capability::ResolvedCall;
use crate::server::ServerContext;

use super::errors::DispatchError;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Routes decoded requests to collaborators and capabilities.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    context: Arc<ServerContext>,
}

impl Dispatcher {
    /// Creates a dispatcher over `context`.
    #[must_use]
    pub fn new(context: Arc<ServerContext>) -> Self {
        Self { context }
    }

    /// Decodes a frame payload and answers it.
    #[must_use]
    pub fn handle_payload(&self, payload: &[u8]) -> Response {
        match Request::parse(payload) {
            Ok(request) => self.handle(request),
            Err(error) => {
                let error = DispatchError::from(error);
                warn!(target: DISPATCH_TARGET, %error, "malformed request");
                Response::Failure(error.kind())
            }
        }
    }

    /// Answers a decoded request.
    #[must_use]
    pub fn handle(&self, request: Request) -> Response {
        debug!(
            target: DISPATCH_TARGET,
            target_id = %request.target,
            method = request.method(),
            "dispatching request"
        );
        match self.dispatch(request) {
            Ok(value) => Response::Success(value),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    %error,
                    kind = %error.kind(),
                    "request failed"
                );
                Response::Failure(error.kind())
            }
        }
    }

    /// Executes a decoded request.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] describing why the request could not be
    /// answered successfully.
    pub fn dispatch(&self, request: Request) -> Result<Value, DispatchError> {
        let Request { target, kind } = request;
        match kind {
            RequestKind::ListApps => Ok(serde_json::to_value(
                self.context.discovery().list_targets(),
            )?),
            RequestKind::ConnectApp => {
                let registry = Arc::clone(self.context.registry());
                match self.context.attacher().attach(&target, registry) {
                    Ok(()) => Ok(Value::String(target)),
                    Err(source) => Err(DispatchError::Attach { target, source }),
                }
            }
            RequestKind::Call { method, arguments } => self.call(target, method, &arguments),
        }
    }

    fn call(
        &self,
        target: String,
        method: String,
        arguments: &[Value],
    ) -> Result<Value, DispatchError> {
        let Some(handle) = self.context.registry().lookup(&target) else {
            return Err(DispatchError::service_not_found(target));
        };
        let ResolvedCall {
            operation,
            arguments: coerced,
        } = match handle.operations().resolve(&method, arguments) {
            Ok(call) => call,
            Err(source) => return Err(DispatchError::Resolve { target, source }),
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handle.invoke(operation, coerced))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(DispatchError::Capability {
                target,
                method,
                source,
            }),
            Err(payload) => Err(DispatchError::Panicked {
                target,
                method,
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

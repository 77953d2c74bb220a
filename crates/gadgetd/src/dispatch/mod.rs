//! Request dispatch.
//!
//! A decoded [`Request`](gadget_protocol::Request) is either administrative
//! (`listApps`, `connectApp`), answered by the discovery and attach
//! collaborators, or a capability call. Calls look the target up in the
//! registry first, so an unbound target is reported as `Service not found`
//! whatever the method, and only then resolve the method against the bound
//! capability's operation table.
//!
//! Every failure becomes a failed [`Response`](gadget_protocol::Response)
//! carrying an [`ErrorKind`](gadget_protocol::ErrorKind); nothing here
//! terminates a connection.

mod dispatcher;
mod errors;

pub use self::dispatcher::Dispatcher;
pub use self::errors::DispatchError;

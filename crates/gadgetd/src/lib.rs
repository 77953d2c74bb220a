//! In-process RPC server for the Gadget bridge.
//!
//! The server accepts TCP connections speaking length-prefixed JSON frames
//! (see [`gadget_protocol`]). Each request names a target and a method.
//! `listApps` and `connectApp` are answered by the discovery and attach
//! collaborators; every other method is resolved against the operation
//! table of the capability bound to the target in the
//! [`CapabilityRegistry`] and invoked.
//!
//! Hosts embed a [`GadgetServer`] built from a [`ServerContext`]. The
//! `gadgetd` binary does the same after [`bootstrap_with`] has loaded the
//! configuration and installed telemetry, serving a [`ValueStack`] for each
//! configured target through [`LocalTargets`].

mod bootstrap;
mod capability;
mod collaborators;
mod dispatch;
mod health;
mod process;
mod registry;
mod server;
mod stack;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use capability::{
    Capability, CapabilityError, Operation, OperationTable, ResolveError, ResolvedCall,
};
pub use collaborators::{
    AttachError, CapabilityFactory, LocalTargets, TargetAttacher, TargetDiscovery,
};
pub use dispatch::{DispatchError, Dispatcher};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownHandle, ShutdownReason, ShutdownSignal,
    SystemShutdownSignal, run_daemon,
};
pub use registry::CapabilityRegistry;
pub use server::{GadgetServer, ServerContext};
pub use stack::ValueStack;
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ConnectionState, Listener, ListenerError, ListenerState, ListenerStopped};

#[cfg(test)]
mod tests;

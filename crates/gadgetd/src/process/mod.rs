//! Foreground process lifecycle for the `gadgetd` binary.

mod errors;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::run_daemon;
pub use shutdown::{
    ShutdownError, ShutdownHandle, ShutdownReason, ShutdownSignal, SystemShutdownSignal,
};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

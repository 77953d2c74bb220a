//! Termination handling for the foreground daemon.

use std::fmt;
use std::io;
use std::sync::{Mutex, PoisonError};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::debug;

use super::PROCESS_TARGET;

const TERMINATION_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until the server should stop, returning what asked for it.
    fn wait(&self) -> Result<ShutdownReason, ShutdownError>;
}

/// What ended a [`ShutdownSignal::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A termination signal arrived.
    Signal(i32),
    /// [`ShutdownHandle::request`] was called.
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Signal(SIGTERM) => f.write_str("SIGTERM"),
            Self::Signal(SIGINT) => f.write_str("SIGINT"),
            Self::Signal(SIGQUIT) => f.write_str("SIGQUIT"),
            Self::Signal(SIGHUP) => f.write_str("SIGHUP"),
            Self::Signal(other) => write!(f, "signal {other}"),
            Self::Requested => f.write_str("shutdown requested"),
        }
    }
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener fed by process termination signals.
///
/// Handlers are registered by [`SystemShutdownSignal::install`], so a signal
/// delivered while the server is still starting is queued and ends the first
/// [`ShutdownSignal::wait`] immediately.
pub struct SystemShutdownSignal {
    signals: Mutex<Signals>,
    handle: Handle,
}

impl SystemShutdownSignal {
    /// Registers handlers for `SIGTERM`, `SIGINT`, `SIGQUIT` and `SIGHUP`.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] when the handlers cannot be
    /// registered.
    pub fn install() -> Result<Self, ShutdownError> {
        let signals =
            Signals::new(TERMINATION_SIGNALS).map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        Ok(Self {
            signals: Mutex::new(signals),
            handle,
        })
    }

    /// Returns a handle that ends the wait without a signal.
    #[must_use]
    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            handle: self.handle.clone(),
        }
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<ShutdownReason, ShutdownError> {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        let reason = signals
            .forever()
            .next()
            .map_or(ShutdownReason::Requested, ShutdownReason::Signal);
        debug!(target: PROCESS_TARGET, %reason, "shutdown wait ended");
        Ok(reason)
    }
}

impl fmt::Debug for SystemShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemShutdownSignal")
            .field("closed", &self.handle.is_closed())
            .finish_non_exhaustive()
    }
}

/// Requests shutdown from another thread.
///
/// Once requested, every later wait on the same listener returns
/// [`ShutdownReason::Requested`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    handle: Handle,
}

impl ShutdownHandle {
    /// Ends the pending wait.
    pub fn request(&self) {
        self.handle.close();
    }
}

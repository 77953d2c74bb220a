//! Error surface for launching and supervising the daemon process.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed before the server was built.
    #[error(transparent)]
    Bootstrap {
        /// Underlying bootstrap error.
        #[from]
        source: BootstrapError,
    },
    /// The server could not start or did not stop cleanly.
    #[error("server listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[from]
        source: ListenerError,
    },
    /// Waiting for a termination signal failed.
    #[error(transparent)]
    Shutdown {
        /// Underlying signal error.
        #[from]
        source: ShutdownError,
    },
}

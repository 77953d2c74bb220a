//! Runs the server in the foreground until a termination signal arrives.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the daemon using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when signal handlers cannot be installed, bootstrap
/// fails, or the configured port cannot be bound.
pub fn run_daemon() -> Result<(), LaunchError> {
    // Installed before bootstrap so a signal sent during startup is queued.
    let shutdown = SystemShutdownSignal::install()?;
    run_daemon_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        &shutdown,
    )
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let daemon = bootstrap_with(loader, reporter)?;
    let server = daemon.server();
    let local_addr = server.start_server(daemon.config().listen_port())?;
    info!(
        target: PROCESS_TARGET,
        %local_addr,
        targets = ?daemon.config().targets(),
        "daemon ready"
    );

    let waited = shutdown.wait();
    match &waited {
        Ok(reason) => info!(target: PROCESS_TARGET, %local_addr, %reason, "stopping server"),
        Err(error) => warn!(
            target: PROCESS_TARGET,
            %local_addr,
            %error,
            "shutdown wait failed; stopping server"
        ),
    }
    let stopped = server.stop_server()?;
    waited?;
    info!(
        target: PROCESS_TARGET,
        %local_addr,
        closed = stopped.map_or(0, |summary| summary.closed),
        "shutdown sequence completed"
    );
    Ok(())
}

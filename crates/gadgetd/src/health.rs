//! Structured health reporting for bootstrap and server lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use gadget_config::Config;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the server socket is bound.
    fn server_starting(&self, port: u16);

    /// Invoked once the server accepts connections.
    fn server_listening(&self, addr: SocketAddr);

    /// Invoked when the server socket cannot be bound.
    fn server_start_failed(&self, error: &ListenerError);

    /// Invoked after the server and all its connections have closed.
    fn server_stopped(&self, addr: SocketAddr);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn server_starting(&self, port: u16) {
        (**self).server_starting(port);
    }

    fn server_listening(&self, addr: SocketAddr) {
        (**self).server_listening(addr);
    }

    fn server_start_failed(&self, error: &ListenerError) {
        (**self).server_start_failed(error);
    }

    fn server_stopped(&self, addr: SocketAddr) {
        (**self).server_stopped(addr);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: "gadgetd::health",
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: "gadgetd::health",
            event = "bootstrap_succeeded",
            listen_host = %config.listen_host(),
            listen_port = config.listen_port(),
            targets = ?config.targets(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "gadgetd::health",
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn server_starting(&self, port: u16) {
        tracing::info!(
            target: "gadgetd::health",
            event = "server_starting",
            port,
            "starting server"
        );
    }

    fn server_listening(&self, addr: SocketAddr) {
        tracing::info!(
            target: "gadgetd::health",
            event = "server_listening",
            %addr,
            "server listening"
        );
    }

    fn server_start_failed(&self, error: &ListenerError) {
        tracing::error!(
            target: "gadgetd::health",
            event = "server_start_failed",
            error = %error,
            "server failed to start"
        );
    }

    fn server_stopped(&self, addr: SocketAddr) {
        tracing::info!(
            target: "gadgetd::health",
            event = "server_stopped",
            %addr,
            "server stopped"
        );
    }
}

//! Server context and the host control surface.
//!
//! [`ServerContext`] owns what every connection shares: the capability
//! registry and the discovery and attach collaborators. [`GadgetServer`]
//! pairs a context with a [`Listener`] and exposes the start/stop surface a
//! host embeds.

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gadget_config::Config;

use crate::collaborators::{LocalTargets, TargetAttacher, TargetDiscovery};
use crate::dispatch::Dispatcher;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::registry::CapabilityRegistry;
use crate::stack::ValueStack;
use crate::transport::{ConnectionState, Listener, ListenerError, ListenerStopped};

/// State shared by the dispatcher and every connection worker.
pub struct ServerContext {
    registry: Arc<CapabilityRegistry>,
    discovery: Arc<dyn TargetDiscovery>,
    attacher: Arc<dyn TargetAttacher>,
}

impl ServerContext {
    /// Builds a context with an empty registry.
    #[must_use]
    pub fn new(discovery: Arc<dyn TargetDiscovery>, attacher: Arc<dyn TargetAttacher>) -> Self {
        Self {
            registry: Arc::new(CapabilityRegistry::new()),
            discovery,
            attacher,
        }
    }

    /// Builds a context whose discovery and attach are served by `targets`.
    #[must_use]
    pub fn local(targets: LocalTargets) -> Self {
        let targets = Arc::new(targets);
        Self::new(
            Arc::clone(&targets) as Arc<dyn TargetDiscovery>,
            targets as Arc<dyn TargetAttacher>,
        )
    }

    /// Serves a [`ValueStack`] for every target named in `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let targets = config
            .targets()
            .iter()
            .fold(LocalTargets::new(), |targets, target| {
                targets.with_target(target.clone(), || Arc::new(ValueStack::new()))
            });
        Self::local(targets)
    }

    /// Registry of attached capabilities.
    #[must_use]
    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Discovery collaborator answering `listApps`.
    #[must_use]
    pub fn discovery(&self) -> &dyn TargetDiscovery {
        self.discovery.as_ref()
    }

    /// Attach collaborator answering `connectApp`.
    #[must_use]
    pub fn attacher(&self) -> &dyn TargetAttacher {
        self.attacher.as_ref()
    }
}

impl fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerContext")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// RPC server embedded in a host.
///
/// Start and stop are serialised, so each transition is reported to the
/// health reporter exactly once however many callers race. Dropping the
/// server stops it.
pub struct GadgetServer {
    context: Arc<ServerContext>,
    listener: Listener,
    reporter: Arc<dyn HealthReporter>,
    control: Mutex<()>,
}

impl GadgetServer {
    /// Creates a stopped server bound to the host and frame limit in
    /// `config`.
    #[must_use]
    pub fn new(config: &Config, context: ServerContext) -> Self {
        let context = Arc::new(context);
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&context)));
        let listener = Listener::new(dispatcher, config.listen_host(), config.max_frame_bytes());
        Self {
            context,
            listener,
            reporter: Arc::new(StructuredHealthReporter::new()),
            control: Mutex::new(()),
        }
    }

    /// Replaces the health reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn HealthReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Starts listening on `port`, returning the bound address.
    ///
    /// Calling this while the server runs returns the current address.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the port cannot be bound.
    pub fn start_server(&self, port: u16) -> Result<SocketAddr, ListenerError> {
        let _control = self.control();
        if let Some(local_addr) = self.listener.local_addr() {
            return Ok(local_addr);
        }
        self.reporter.server_starting(port);
        match self.listener.start(port) {
            Ok(local_addr) => {
                self.reporter.server_listening(local_addr);
                Ok(local_addr)
            }
            Err(error) => {
                self.reporter.server_start_failed(&error);
                Err(error)
            }
        }
    }

    /// Stops the server and closes every client connection.
    ///
    /// Returns `None` when the server was not running.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the accept thread
    /// panicked. The server is stopped regardless.
    pub fn stop_server(&self) -> Result<Option<ListenerStopped>, ListenerError> {
        let _control = self.control();
        let Some(local_addr) = self.listener.local_addr() else {
            return Ok(None);
        };
        let result = self.listener.stop();
        self.reporter.server_stopped(local_addr);
        result
    }

    /// Host-specific mode. The server has none.
    #[must_use]
    pub fn mode(&self) -> Option<String> {
        None
    }

    /// Host-advertised address. The server has none.
    #[must_use]
    pub fn address(&self) -> Option<String> {
        None
    }

    /// Host-advertised port. The server has none; see [`Self::local_addr`]
    /// for the bound socket.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        None
    }

    /// Whether the server accepts connections.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.listener.is_running()
    }

    /// Bound socket address while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of open client connections.
    #[must_use]
    pub fn live_connections(&self) -> usize {
        self.listener.live_connections()
    }

    /// Peer address and state of every open client connection.
    #[must_use]
    pub fn connections(&self) -> Vec<(SocketAddr, ConnectionState)> {
        self.listener.connections()
    }

    /// Registry of attached capabilities.
    #[must_use]
    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        self.context.registry()
    }

    fn control(&self) -> MutexGuard<'_, ()> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for GadgetServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GadgetServer")
            .field("context", &self.context)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

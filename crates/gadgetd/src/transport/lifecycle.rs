//! Start and stop sequencing for the server socket.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::dispatch::Dispatcher;

use super::{
    ConnectionHandler, ConnectionState, ConnectionSupervisor, LISTENER_TARGET, ListenerError,
    ListenerHandle, SocketListener,
};

/// Observable listener lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// No socket is bound.
    Stopped,
    /// Accepting connections.
    Listening,
    /// Closing the socket and every live connection.
    Stopping,
}

/// Summary of a stop that closed a running listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerStopped {
    /// Address the listener was bound to.
    pub local_addr: SocketAddr,
    /// Live connections killed by the stop.
    pub closed: usize,
    /// Connections still tracked once every worker was joined.
    pub remaining: usize,
}

struct Running {
    local_addr: SocketAddr,
    handle: ListenerHandle,
    supervisor: Arc<ConnectionSupervisor>,
}

struct Inner {
    state: ListenerState,
    running: Option<Running>,
}

/// Owns the server socket between `start` and `stop`.
///
/// Start and stop are serialised by a lifecycle lock, so a stop racing a
/// start either sees the running listener or finds nothing to do.
pub struct Listener {
    dispatcher: Arc<Dispatcher>,
    host: String,
    max_frame_bytes: usize,
    lifecycle: Mutex<()>,
    inner: Mutex<Inner>,
}

impl Listener {
    /// Creates a stopped listener that binds `host` when started.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, host: impl Into<String>, max_frame_bytes: usize) -> Self {
        Self {
            dispatcher,
            host: host.into(),
            max_frame_bytes,
            lifecycle: Mutex::new(()),
            inner: Mutex::new(Inner {
                state: ListenerState::Stopped,
                running: None,
            }),
        }
    }

    /// Binds `port` and starts accepting connections.
    ///
    /// Starting a running listener is a no-op returning the bound address.
    /// Port `0` asks the system for a free port.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the address cannot be bound or the
    /// accept thread cannot be started. The listener stays stopped.
    pub fn start(&self, port: u16) -> Result<SocketAddr, ListenerError> {
        let _lifecycle = self.lifecycle();
        if let Some(local_addr) = self.local_addr() {
            debug!(target: LISTENER_TARGET, %local_addr, "listener already running");
            return Ok(local_addr);
        }

        let socket = SocketListener::bind(&self.host, port)?;
        let local_addr = socket.local_addr()?;
        let supervisor = Arc::new(ConnectionSupervisor::new(
            Arc::clone(&self.dispatcher),
            self.max_frame_bytes,
        ));
        let handler = Arc::clone(&supervisor) as Arc<dyn ConnectionHandler>;
        let handle = socket.start(handler)?;

        let mut inner = self.inner();
        inner.running = Some(Running {
            local_addr,
            handle,
            supervisor,
        });
        inner.state = ListenerState::Listening;
        info!(target: LISTENER_TARGET, %local_addr, "listener started");
        Ok(local_addr)
    }

    /// Stops accepting, closes every live connection, and waits for the
    /// accept thread and all workers to finish.
    ///
    /// Returns `None` when the listener was already stopped.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the accept thread
    /// panicked. Connections are closed regardless.
    pub fn stop(&self) -> Result<Option<ListenerStopped>, ListenerError> {
        let _lifecycle = self.lifecycle();
        let running = {
            let mut inner = self.inner();
            let Some(running) = inner.running.take() else {
                return Ok(None);
            };
            inner.state = ListenerState::Stopping;
            running
        };
        let Running {
            local_addr,
            handle,
            supervisor,
        } = running;

        handle.shutdown();
        let joined = handle.join();
        let closed = supervisor.shutdown();
        let remaining = supervisor.live_connections();

        self.inner().state = ListenerState::Stopped;
        info!(
            target: LISTENER_TARGET,
            %local_addr,
            closed,
            remaining,
            "listener stopped"
        );
        joined.map(|()| {
            Some(ListenerStopped {
                local_addr,
                closed,
                remaining,
            })
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ListenerState {
        self.inner().state
    }

    /// Whether the listener is accepting connections.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ListenerState::Listening
    }

    /// Address bound by the running listener.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner().running.as_ref().map(|running| running.local_addr)
    }

    /// Number of connections whose workers are still running.
    #[must_use]
    pub fn live_connections(&self) -> usize {
        self.inner()
            .running
            .as_ref()
            .map_or(0, |running| running.supervisor.live_connections())
    }

    /// Peer address and state of every live connection.
    #[must_use]
    pub fn connections(&self) -> Vec<(SocketAddr, ConnectionState)> {
        self.inner()
            .running
            .as_ref()
            .map_or_else(Vec::new, |running| running.supervisor.connections())
    }

    fn lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            tracing::warn!(target: LISTENER_TARGET, %error, "listener stop failed on drop");
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("host", &self.host)
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

//! Live connection tracking and worker spawning.

use std::collections::HashMap;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::dispatch::Dispatcher;

use super::worker::{ConnectionControl, ConnectionState, ConnectionWorker};
use super::{ConnectionHandler, LISTENER_TARGET};

pub(crate) type ConnectionId = u64;

struct LiveEntry {
    control: Arc<ConnectionControl>,
    worker: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct LiveSet {
    closing: bool,
    entries: HashMap<ConnectionId, LiveEntry>,
}

/// Set of connections whose workers are still running.
///
/// An entry is inserted before its worker starts and removed by the worker
/// when the peer leaves. Once [`LiveConnections::close`] runs the set refuses
/// new entries and the caller owns the drained workers.
#[derive(Default)]
pub(crate) struct LiveConnections {
    next_id: AtomicU64,
    set: Mutex<LiveSet>,
}

impl LiveConnections {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a connection, returning its id, or `None` once closing began.
    pub(crate) fn insert(&self, control: Arc<ConnectionControl>) -> Option<ConnectionId> {
        let mut set = self.set();
        if set.closing {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        set.entries.insert(
            id,
            LiveEntry {
                control,
                worker: None,
            },
        );
        Some(id)
    }

    /// Stores the worker thread for `id` so shutdown can join it.
    ///
    /// A worker that already finished and removed itself is dropped, which
    /// detaches a thread that has nothing left to do.
    pub(crate) fn attach_worker(&self, id: ConnectionId, worker: JoinHandle<()>) {
        if let Some(entry) = self.set().entries.get_mut(&id) {
            entry.worker = Some(worker);
        }
    }

    /// Removes `id`. Removing an absent id does nothing.
    pub(crate) fn remove(&self, id: ConnectionId) {
        self.set().entries.remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        self.set().entries.len()
    }

    /// Peer and state of every live connection.
    pub(crate) fn snapshot(&self) -> Vec<(SocketAddr, ConnectionState)> {
        self.set()
            .entries
            .values()
            .map(|entry| (entry.control.peer(), entry.control.state()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops admitting connections and takes every live entry.
    fn close(&self) -> Vec<LiveEntry> {
        let mut set = self.set();
        set.closing = true;
        set.entries.drain().map(|(_, entry)| entry).collect()
    }

    fn set(&self) -> MutexGuard<'_, LiveSet> {
        self.set.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Connection handler that gives each accepted socket its own worker.
pub(crate) struct ConnectionSupervisor {
    dispatcher: Arc<Dispatcher>,
    live: Arc<LiveConnections>,
    max_frame_bytes: usize,
}

impl ConnectionSupervisor {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>, max_frame_bytes: usize) -> Self {
        Self {
            dispatcher,
            live: Arc::new(LiveConnections::new()),
            max_frame_bytes,
        }
    }

    pub(crate) fn live_connections(&self) -> usize {
        self.live.len()
    }

    pub(crate) fn connections(&self) -> Vec<(SocketAddr, ConnectionState)> {
        self.live.snapshot()
    }

    /// Closes every live connection and waits for its worker.
    ///
    /// Sockets are all shut down before any join, so one slow worker does
    /// not hold the others open. Returns the number of connections closed.
    pub(crate) fn shutdown(&self) -> usize {
        let entries = self.live.close();
        for entry in &entries {
            entry.control.kill();
        }
        let closed = entries.len();
        for entry in entries {
            let peer = entry.control.peer();
            if let Some(worker) = entry.worker
                && worker.join().is_err()
            {
                warn!(target: LISTENER_TARGET, %peer, "connection worker panicked");
            }
        }
        closed
    }
}

impl ConnectionHandler for ConnectionSupervisor {
    fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        let control = match ConnectionControl::new(&stream, peer) {
            Ok(control) => Arc::new(control),
            Err(error) => {
                warn!(target: LISTENER_TARGET, %peer, %error, "failed to track connection");
                return;
            }
        };
        let Some(id) = self.live.insert(Arc::clone(&control)) else {
            debug!(target: LISTENER_TARGET, %peer, "connection refused during shutdown");
            control.kill();
            return;
        };
        let worker = ConnectionWorker {
            id,
            stream,
            control,
            dispatcher: Arc::clone(&self.dispatcher),
            live: Arc::clone(&self.live),
            max_frame_bytes: self.max_frame_bytes,
        };
        match thread::Builder::new()
            .name(format!("gadget-conn-{id}"))
            .spawn(move || worker.run())
        {
            Ok(handle) => self.live.attach_worker(id, handle),
            Err(error) => {
                warn!(target: LISTENER_TARGET, %peer, %error, "failed to spawn connection worker");
                self.live.remove(id);
            }
        }
    }
}

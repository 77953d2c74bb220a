//! Per-connection worker reading frames and writing responses.

use std::fmt;
use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use gadget_protocol::{FrameDecoder, write_message};
use tracing::{Span, debug, info_span, warn};

use crate::dispatch::Dispatcher;

use super::connections::{ConnectionId, LiveConnections};
use super::{ConnectionError, LISTENER_TARGET};

const READ_CHUNK: usize = 8 * 1024;

/// Span wrapping everything logged while serving one connection.
pub(crate) fn connection_span(id: ConnectionId, peer: SocketAddr) -> Span {
    info_span!(target: LISTENER_TARGET, "connection", id, peer = %peer)
}

/// Lifecycle of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, worker not yet running.
    Connecting,
    /// Reading and answering frames.
    Active,
    /// The peer closed its side at a frame boundary.
    Closing,
    /// The stream failed or carried a malformed frame.
    Faulted,
    /// Finished and removed from the live set.
    Closed,
}

/// Shared control block for a connection.
///
/// The listener keeps one per live connection so it can tear the socket down
/// from outside the worker thread.
pub(crate) struct ConnectionControl {
    peer: SocketAddr,
    socket: TcpStream,
    killed: AtomicBool,
    state: Mutex<ConnectionState>,
}

impl ConnectionControl {
    pub(crate) fn new(stream: &TcpStream, peer: SocketAddr) -> io::Result<Self> {
        Ok(Self {
            peer,
            socket: stream.try_clone()?,
            killed: AtomicBool::new(false),
            state: Mutex::new(ConnectionState::Connecting),
        })
    }

    pub(crate) fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub(crate) fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// Closes the socket in both directions, unblocking any pending read.
    pub(crate) fn kill(&self) {
        self.killed.store(true, Ordering::SeqCst);
        if let Err(error) = self.socket.shutdown(Shutdown::Both)
            && error.kind() != io::ErrorKind::NotConnected
        {
            debug!(
                target: LISTENER_TARGET,
                peer = %self.peer,
                error = %error,
                "socket shutdown failed"
            );
        }
    }
}

impl fmt::Debug for ConnectionControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionControl")
            .field("peer", &self.peer)
            .field("state", &self.state())
            .field("killed", &self.is_killed())
            .finish()
    }
}

/// Serves one connection until the peer leaves, the stream faults, or the
/// listener kills it.
pub(crate) struct ConnectionWorker {
    pub(crate) id: ConnectionId,
    pub(crate) stream: TcpStream,
    pub(crate) control: Arc<ConnectionControl>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) live: Arc<LiveConnections>,
    pub(crate) max_frame_bytes: usize,
}

impl ConnectionWorker {
    pub(crate) fn run(mut self) {
        let _span = connection_span(self.id, self.control.peer()).entered();
        self.control.set_state(ConnectionState::Active);
        let outcome = self.serve();
        self.finish(outcome);
    }

    fn serve(&mut self) -> Result<(), ConnectionError> {
        let mut decoder = FrameDecoder::with_limit(self.max_frame_bytes);
        let mut chunk = vec![0_u8; READ_CHUNK];
        loop {
            // Frames are answered strictly in arrival order; a pipelining
            // peer matches responses to requests by position.
            while let Some(payload) = decoder.next_frame()? {
                if self.control.is_killed() {
                    return Ok(());
                }
                let response = self.dispatcher.handle_payload(&payload);
                write_message(&mut self.stream, &response)?;
            }
            if self.control.is_killed() {
                return Ok(());
            }
            let bytes_read = read_chunk_with_retry(&mut self.stream, &mut chunk)?;
            if bytes_read == 0 {
                return match decoder.truncation_error() {
                    Some(error) => Err(error.into()),
                    None => Ok(()),
                };
            }
            decoder.push(&chunk[..bytes_read]);
        }
    }

    fn finish(self, outcome: Result<(), ConnectionError>) {
        let peer = self.control.peer();
        if self.control.is_killed() {
            // The listener owns the live set during shutdown; a killed worker
            // only records its final state.
            self.control.set_state(ConnectionState::Closed);
            debug!(target: LISTENER_TARGET, %peer, "connection closed by listener");
            return;
        }
        match outcome {
            Ok(()) => {
                self.control.set_state(ConnectionState::Closing);
                debug!(target: LISTENER_TARGET, %peer, "peer disconnected");
            }
            Err(error) => {
                self.control.set_state(ConnectionState::Faulted);
                warn!(target: LISTENER_TARGET, %peer, %error, "connection faulted");
                if let Err(error) = self.stream.shutdown(Shutdown::Both)
                    && error.kind() != io::ErrorKind::NotConnected
                {
                    debug!(target: LISTENER_TARGET, %peer, %error, "socket shutdown failed");
                }
            }
        }
        self.live.remove(self.id);
        self.control.set_state(ConnectionState::Closed);
    }
}

fn read_chunk_with_retry(stream: &mut TcpStream, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

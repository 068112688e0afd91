//! Peer connection handle and single-connection management
//!
//! The bridge serves exactly one upstream game client. Admitting a new client
//! forcibly terminates the previous handle first — a graceful close handshake
//! may never complete against a zombie peer — which makes a page reload
//! reconnect transparently.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::protocol::ServerMessage;

/// Handle to the single live upstream transport.
pub struct PeerConnection {
    /// Monotonic id; tells a superseded handle from the current one.
    pub id: u64,
    outbound: mpsc::Sender<ServerMessage>,
    alive: AtomicBool,
    cancel: CancellationToken,
}

impl PeerConnection {
    fn new(id: u64, outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            outbound,
            alive: AtomicBool::new(true),
            cancel: CancellationToken::new(),
        }
    }

    /// Record a liveness acknowledgment from the peer.
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Relaxed);
    }

    /// Whether the last probe was acknowledged.
    pub fn check_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Clear the ack flag ahead of a probe. Exactly one probe is outstanding
    /// at a time.
    pub fn begin_probe(&self) {
        self.alive.store(false, Ordering::Relaxed);
    }

    /// Enqueue a frame toward the peer. Returns whether delivery was
    /// attempted; never blocks.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.outbound.try_send(message).is_ok()
    }

    /// Forcibly terminate: the connection task drops the socket without
    /// waiting for a close handshake.
    pub fn terminate(&self) {
        self.cancel.cancel();
    }

    /// Whether this handle has been terminated.
    pub fn is_terminated(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the handle is terminated.
    pub async fn terminated(&self) {
        self.cancel.cancelled().await;
    }
}

/// Owns the one live peer slot.
pub struct ConnectionManager {
    current: Mutex<Option<Arc<PeerConnection>>>,
    next_peer_id: AtomicU64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            next_peer_id: AtomicU64::new(1),
        }
    }

    /// Adopt a newly admitted peer, forcibly superseding any live one before
    /// the new handle becomes addressable.
    pub fn adopt(&self, outbound: mpsc::Sender<ServerMessage>) -> Arc<PeerConnection> {
        let id = self.next_peer_id.fetch_add(1, Ordering::Relaxed);
        let peer = Arc::new(PeerConnection::new(id, outbound));

        let mut current = self.current.lock().unwrap();
        if let Some(previous) = current.take() {
            tracing::info!(superseded = previous.id, peer_id = id, "replacing live peer");
            previous.terminate();
        }
        *current = Some(Arc::clone(&peer));
        peer
    }

    /// Release a peer slot when its connection task ends.
    ///
    /// Returns true only when `peer_id` still names the current peer; a
    /// superseded handle must not trigger disconnect handling for its
    /// replacement.
    pub fn release(&self, peer_id: u64) -> bool {
        let mut current = self.current.lock().unwrap();
        match current.as_ref() {
            Some(peer) if peer.id == peer_id => {
                *current = None;
                true
            }
            _ => false,
        }
    }

    /// The live peer, if any.
    pub fn current(&self) -> Option<Arc<PeerConnection>> {
        self.current.lock().unwrap().clone()
    }

    /// Whether a peer is currently addressable.
    pub fn is_connected(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    /// Enqueue a frame to the live peer, if any.
    pub fn send(&self, message: ServerMessage) -> bool {
        match self.current() {
            Some(peer) => peer.send(message),
            None => false,
        }
    }

    /// Terminate the live peer, if any.
    pub fn shutdown(&self) {
        if let Some(peer) = self.current() {
            peer.terminate();
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

//! Heartbeat supervision for the peer connection
//!
//! One probe is outstanding at a time: each tick terminates the peer if the
//! previous probe went unacknowledged, otherwise clears the ack flag and
//! enqueues the next `ping`. The loop runs alongside message dispatch but
//! only ever touches connection-liveness state.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use crate::protocol::ServerMessage;

use super::peer::PeerConnection;

/// Why the heartbeat loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// The peer missed a probe window and was terminated.
    TimedOut,
    /// The peer handle was terminated elsewhere.
    Cancelled,
}

/// Supervise `peer` until it times out or is terminated.
///
/// The first tick completes immediately and sends the initial probe.
pub async fn run_heartbeat(peer: Arc<PeerConnection>, interval: Duration) -> HeartbeatOutcome {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !peer.check_alive() {
                    tracing::warn!(
                        peer_id = peer.id,
                        "no liveness ack within heartbeat interval, terminating peer"
                    );
                    peer.terminate();
                    return HeartbeatOutcome::TimedOut;
                }
                peer.begin_probe();
                if !peer.send(ServerMessage::Ping) {
                    tracing::debug!(peer_id = peer.id, "heartbeat probe not enqueued");
                }
            }
            _ = peer.terminated() => return HeartbeatOutcome::Cancelled,
        }
    }
}

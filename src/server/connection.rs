//! Per-connection socket loop and inbound dispatch
//!
//! One task drives the admitted WebSocket: it forwards queued outbound
//! frames, dispatches inbound frames, and reacts to forced termination from
//! the heartbeat, a replacement peer, or server shutdown. Cleanup runs on
//! every exit path, so the heartbeat task is always released and the
//! disconnect signal fires exactly once per peer.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::time::{timeout, Duration};

use crate::protocol::{ClientMessage, ServerMessage};

use super::heartbeat::run_heartbeat;
use super::listener::Bridge;
use super::peer::PeerConnection;

/// Bound on the goodbye close frame; a zombie peer must not stall teardown.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Drive one admitted WebSocket until close, transport error, or termination.
pub async fn run_peer(socket: WebSocket, bridge: Arc<Bridge>) {
    let (out_tx, mut out_rx) = tokio::sync::mpsc::channel::<ServerMessage>(bridge.config.send_queue);
    let peer = bridge.manager.adopt(out_tx);
    tracing::info!(peer_id = peer.id, "game client connected");

    let heartbeat = tokio::spawn(run_heartbeat(
        Arc::clone(&peer),
        bridge.config.heartbeat_interval,
    ));

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            _ = peer.terminated() => {
                let goodbye = Message::Close(Some(CloseFrame {
                    code: 1001,
                    reason: Utf8Bytes::from_static("bridge closing connection"),
                }));
                let _ = timeout(CLOSE_GRACE, ws_tx.send(goodbye)).await;
                break;
            }
            outbound = out_rx.recv() => {
                let Some(message) = outbound else { break };
                match serde_json::to_string(&message) {
                    Ok(json) => {
                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                            tracing::warn!(peer_id = peer.id, "peer transport failed on send");
                            break;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "unserializable outbound frame dropped"),
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => dispatch(text.as_str(), &peer, &bridge),
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = ws_tx.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(peer_id = peer.id, "peer closed connection");
                        break;
                    }
                    Some(Ok(_)) => {} // Binary and pong frames carry nothing for us
                    Some(Err(e)) => {
                        tracing::warn!(peer_id = peer.id, error = %e, "peer transport error");
                        break;
                    }
                }
            }
        }
    }

    // Every exit path lands here: stop the heartbeat, free the slot, and
    // signal the disconnect exactly once, only if we are still the live peer.
    peer.terminate();
    let _ = heartbeat.await;
    if bridge.manager.release(peer.id) {
        bridge.store.mark_disconnected();
        tracing::info!(peer_id = peer.id, "game client disconnected");
    }
}

/// Parse and route one inbound frame.
///
/// Malformed frames and unknown tags are logged and dropped; the connection
/// stays open.
pub(crate) fn dispatch(raw: &str, peer: &PeerConnection, bridge: &Bridge) {
    let message: ClientMessage = match serde_json::from_str(raw) {
        Ok(message) => message,
        Err(e) => {
            let tag = serde_json::from_str::<serde_json::Value>(raw)
                .ok()
                .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_owned));
            match tag {
                Some(tag) => tracing::warn!(tag = %tag, error = %e, "unrecognized frame dropped"),
                None => tracing::warn!(error = %e, "malformed frame dropped"),
            }
            return;
        }
    };

    match message {
        ClientMessage::GameReady {
            world_id,
            actors,
            scene,
            combat,
            chat_history,
        } => {
            bridge
                .store
                .apply_full_snapshot(world_id, actors, scene, combat, chat_history);
        }
        ClientMessage::ChatMessage { message } => bridge.store.apply_chat_append(message),
        ClientMessage::ChatMessageUpdate { message } => bridge.store.apply_chat_update(message),
        ClientMessage::ActorUpdate { actor_id, actor } => {
            bridge.store.apply_actor_update(actor_id, actor);
        }
        ClientMessage::CombatUpdate { combat } => bridge.store.apply_combat_update(combat),
        ClientMessage::SceneChange { scene } => bridge.store.apply_scene_change(scene),
        ClientMessage::VideoChunk { data, timestamp } => {
            bridge.capture.handle_fragment(&data, timestamp);
        }
        ClientMessage::Pong => peer.mark_alive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::BridgeConfig;
    use tokio::sync::mpsc;

    fn bridge() -> (Arc<Bridge>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Bridge::new(BridgeConfig::default().capture_dir(dir.path()));
        (bridge, dir)
    }

    fn peer(bridge: &Bridge) -> Arc<PeerConnection> {
        bridge.manager.adopt(mpsc::channel(8).0)
    }

    #[tokio::test]
    async fn test_dispatch_game_ready_populates_store() {
        let (bridge, _dir) = bridge();
        let peer = peer(&bridge);

        dispatch(
            r#"{"type":"gameReady","worldId":"w1","actors":{"a1":{"name":"Zara"}}}"#,
            &peer,
            &bridge,
        );

        assert!(bridge.store.is_connected());
        assert_eq!(bridge.store.actor("a1").unwrap().name.as_deref(), Some("Zara"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tag_keeps_state_untouched() {
        let (bridge, _dir) = bridge();
        let peer = peer(&bridge);

        dispatch(r#"{"type":"teleport","x":1}"#, &peer, &bridge);
        dispatch("not json at all", &peer, &bridge);

        assert!(!bridge.store.is_connected());
        assert!(!peer.is_terminated());
    }

    #[tokio::test]
    async fn test_dispatch_pong_acknowledges_probe() {
        let (bridge, _dir) = bridge();
        let peer = peer(&bridge);
        peer.begin_probe();

        dispatch(r#"{"type":"pong"}"#, &peer, &bridge);

        assert!(peer.check_alive());
    }

    #[tokio::test]
    async fn test_dispatch_video_chunk_starts_capture() {
        let (bridge, _dir) = bridge();
        let peer = peer(&bridge);

        dispatch(
            r#"{"type":"videoChunk","data":"GkXfowAA","timestamp":1.0}"#,
            &peer,
            &bridge,
        );

        assert!(bridge.capture.status().active);
        bridge.capture.shutdown().await;
    }
}

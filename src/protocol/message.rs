//! Wire messages
//!
//! One JSON object per frame, discriminated by a `type` field. Each direction
//! is a closed sum type, so adding a message tag is a compile-time-checked
//! change everywhere it is matched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::records::{ActorRecord, ChatRecord, CombatRecord, SceneRecord};

/// Frames the game client sends to the bridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Full session snapshot; sent on page load and in answer to `queryState`.
    #[serde(rename_all = "camelCase")]
    GameReady {
        #[serde(default)]
        world_id: Option<String>,
        #[serde(default)]
        actors: HashMap<String, ActorRecord>,
        #[serde(default)]
        scene: Option<SceneRecord>,
        #[serde(default)]
        combat: Option<CombatRecord>,
        #[serde(default)]
        chat_history: Vec<ChatRecord>,
    },
    /// A new chat entry.
    ChatMessage { message: ChatRecord },
    /// An edit to an existing chat entry, matched by id.
    ChatMessageUpdate { message: ChatRecord },
    /// Insert-or-replace of a single actor.
    #[serde(rename_all = "camelCase")]
    ActorUpdate { actor_id: String, actor: ActorRecord },
    /// Wholesale combat replacement; `null` means combat ended.
    CombatUpdate {
        #[serde(default)]
        combat: Option<CombatRecord>,
    },
    /// Wholesale scene replacement; `null` clears it.
    SceneChange {
        #[serde(default)]
        scene: Option<SceneRecord>,
    },
    /// One base64 fragment of the media side-channel.
    VideoChunk { data: String, timestamp: f64 },
    /// Liveness acknowledgment.
    Pong,
}

/// Frames the bridge sends to the game client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Show a private message to the operator at the table.
    Whisper {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    /// Ask for a fresh `gameReady` snapshot.
    QueryState,
    /// Liveness probe.
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_game_ready() {
        let json = r#"{
            "type": "gameReady",
            "worldId": "world-1",
            "actors": {"a1": {"name": "Zara", "fatePoints": 3}},
            "scene": {"name": "Docks"},
            "combat": null,
            "chatHistory": [{"id": "m1", "content": "hi"}]
        }"#;

        match serde_json::from_str::<ClientMessage>(json).unwrap() {
            ClientMessage::GameReady {
                world_id,
                actors,
                scene,
                combat,
                chat_history,
            } => {
                assert_eq!(world_id.as_deref(), Some("world-1"));
                assert_eq!(actors["a1"].name.as_deref(), Some("Zara"));
                assert_eq!(scene.unwrap().name.as_deref(), Some("Docks"));
                assert!(combat.is_none());
                assert_eq!(chat_history.len(), 1);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_game_ready_defaults() {
        // A minimal frame still parses; every payload field is optional
        let message: ClientMessage = serde_json::from_str(r#"{"type":"gameReady"}"#).unwrap();
        match message {
            ClientMessage::GameReady { actors, .. } => assert!(actors.is_empty()),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_actor_update() {
        let json = r#"{"type":"actorUpdate","actorId":"a1","actor":{"name":"Zara","fatePoints":2}}"#;
        match serde_json::from_str::<ClientMessage>(json).unwrap() {
            ClientMessage::ActorUpdate { actor_id, actor } => {
                assert_eq!(actor_id, "a1");
                assert_eq!(actor.extra["fatePoints"], 2);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_combat_cleared() {
        let json = r#"{"type":"combatUpdate","combat":null}"#;
        match serde_json::from_str::<ClientMessage>(json).unwrap() {
            ClientMessage::CombatUpdate { combat } => assert!(combat.is_none()),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_pong() {
        let message: ClientMessage = serde_json::from_str(r#"{"type":"pong"}"#).unwrap();
        assert!(matches!(message, ClientMessage::Pong));
    }

    #[test]
    fn test_parse_video_chunk() {
        let json = r#"{"type":"videoChunk","data":"GkXfow==","timestamp":1700000000123.0}"#;
        match serde_json::from_str::<ClientMessage>(json).unwrap() {
            ClientMessage::VideoChunk { data, timestamp } => {
                assert_eq!(data, "GkXfow==");
                assert!(timestamp > 0.0);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"teleport"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_whisper_skips_missing_title() {
        let json = serde_json::to_string(&ServerMessage::Whisper {
            content: "roll initiative".into(),
            title: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"whisper","content":"roll initiative"}"#);
    }

    #[test]
    fn test_serialize_ping_and_query_state() {
        assert_eq!(
            serde_json::to_string(&ServerMessage::Ping).unwrap(),
            r#"{"type":"ping"}"#
        );
        assert_eq!(
            serde_json::to_string(&ServerMessage::QueryState).unwrap(),
            r#"{"type":"queryState"}"#
        );
    }
}

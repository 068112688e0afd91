//! Game entity records
//!
//! Value records mirroring the shapes the game client sends. The bridge treats
//! them as opaque payloads except for chat message identity (update-in-place
//! matching) and roll dice values (roll summaries on the chat view). Fields the
//! bridge does not know about are preserved through `#[serde(flatten)]` so
//! consumers see exactly what the client sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An actor (character, NPC) as reported by the game client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Everything else: skills, aspects, stress tracks, fate points, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A chat log entry.
///
/// `id` is the only field the bridge interprets; it keys update-in-place when
/// the client edits a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rolls: Vec<RollRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A dice roll attached to a chat entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// Individual die faces; -1, 0 and +1 for fudge dice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dice: Vec<i32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The scene currently being viewed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The active combat encounter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_preserves_unknown_fields() {
        let json = r#"{"id":"a1","name":"Zara","fatePoints":3,"skills":{"Fight":2}}"#;
        let actor: ActorRecord = serde_json::from_str(json).unwrap();

        assert_eq!(actor.id.as_deref(), Some("a1"));
        assert_eq!(actor.name.as_deref(), Some("Zara"));
        assert_eq!(actor.extra["fatePoints"], 3);
        assert_eq!(actor.extra["skills"]["Fight"], 2);

        // Round-trip keeps the passthrough fields
        let back = serde_json::to_value(&actor).unwrap();
        assert_eq!(back["fatePoints"], 3);
    }

    #[test]
    fn test_chat_record_requires_id() {
        let result = serde_json::from_str::<ChatRecord>(r#"{"content":"hello"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_chat_record_with_roll() {
        let json = r#"{"id":"m1","content":"attack!","rolls":[{"formula":"4df+4","total":6,"dice":[1,0,1,0]}]}"#;
        let message: ChatRecord = serde_json::from_str(json).unwrap();

        assert_eq!(message.rolls.len(), 1);
        assert_eq!(message.rolls[0].total, Some(6.0));
        assert_eq!(message.rolls[0].dice, vec![1, 0, 1, 0]);
    }

    #[test]
    fn test_records_tolerate_minimal_shapes() {
        let scene: SceneRecord = serde_json::from_str("{}").unwrap();
        assert!(scene.id.is_none());

        let combat: CombatRecord = serde_json::from_str(r#"{"round":2}"#).unwrap();
        assert_eq!(combat.round, Some(2));
    }
}

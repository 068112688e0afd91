//! Session snapshot types

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::protocol::records::{ActorRecord, ChatRecord, CombatRecord, SceneRecord};

/// Maximum number of chat entries retained. Inserting beyond capacity evicts
/// the oldest entry.
pub const CHAT_HISTORY_LIMIT: usize = 200;

/// The full session state at a point in time.
///
/// Owned by the store; consumers always get clones, never references into
/// the live state, so a reader can never observe a partially-applied update.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Opaque id of the currently bridged game world.
    pub world_id: Option<String>,
    /// All known actors, keyed by actor id.
    pub actors: HashMap<String, ActorRecord>,
    /// The scene currently being viewed, if any.
    pub scene: Option<SceneRecord>,
    /// The active combat encounter, if any.
    pub combat: Option<CombatRecord>,
    /// Chat log, oldest first, bounded by [`CHAT_HISTORY_LIMIT`].
    pub chat_history: VecDeque<ChatRecord>,
    /// When the current client session delivered its snapshot; `None` after
    /// a disconnect.
    pub connected_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    /// Append a chat entry, evicting the oldest beyond capacity.
    pub(crate) fn push_chat(&mut self, record: ChatRecord) {
        self.chat_history.push_back(record);
        while self.chat_history.len() > CHAT_HISTORY_LIMIT {
            self.chat_history.pop_front();
        }
    }
}

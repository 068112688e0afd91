//! Session state store
//!
//! The authoritative in-memory view of the bridged game session. Only
//! messages routed from the live peer connection mutate it, so there is a
//! single writer by construction; any number of consumer handlers read
//! concurrently and receive consistent clones (copy-on-read).
//!
//! Every mutation signals the change notifier. Incremental deltas defer
//! (coalescing bursts into one batch per quiet window); a full snapshot and a
//! disconnect invalidate everything at once and flush immediately.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::protocol::records::{ActorRecord, ChatRecord, CombatRecord, SceneRecord};

use super::notify::{all_resources, ChangeBatch, ChangeNotifier, Resource};
use super::snapshot::{SessionSnapshot, CHAT_HISTORY_LIMIT};

/// Authoritative store for the bridged session.
pub struct SessionStore {
    snapshot: RwLock<SessionSnapshot>,
    notifier: Arc<ChangeNotifier>,
}

impl SessionStore {
    /// Create an empty store with the given debounce window.
    pub fn new(debounce_window: Duration) -> Self {
        Self {
            snapshot: RwLock::new(SessionSnapshot::default()),
            notifier: ChangeNotifier::new(debounce_window),
        }
    }

    /// Subscribe to change batches.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeBatch> {
        self.notifier.subscribe()
    }

    /// Replace the whole snapshot from a `gameReady` payload.
    ///
    /// Fires an immediate notification covering every resource: a fresh
    /// snapshot means every cached view is stale.
    pub fn apply_full_snapshot(
        &self,
        world_id: Option<String>,
        actors: HashMap<String, ActorRecord>,
        scene: Option<SceneRecord>,
        combat: Option<CombatRecord>,
        chat_history: Vec<ChatRecord>,
    ) {
        let (actor_count, chat_count) = {
            let mut snap = self.snapshot.write().unwrap();
            if let (Some(old), Some(new)) = (snap.world_id.as_deref(), world_id.as_deref()) {
                if old != new {
                    // Replace anyway: refusing the update would leave stale
                    // cross-world data in place.
                    tracing::warn!(previous = old, current = new, "world changed between snapshots");
                }
            }
            let skip = chat_history.len().saturating_sub(CHAT_HISTORY_LIMIT);
            snap.world_id = world_id;
            snap.actors = actors;
            snap.scene = scene;
            snap.combat = combat;
            snap.chat_history = chat_history.into_iter().skip(skip).collect();
            snap.connected_at = Some(Utc::now());
            (snap.actors.len(), snap.chat_history.len())
        };

        tracing::info!(actors = actor_count, chat = chat_count, "session snapshot applied");
        self.notifier.notify_immediate(all_resources());
    }

    /// Append a chat entry; the oldest is evicted beyond capacity.
    pub fn apply_chat_append(&self, record: ChatRecord) {
        {
            self.snapshot.write().unwrap().push_chat(record);
        }
        self.notifier.notify_deferred([Resource::Chat]);
    }

    /// Replace an existing chat entry in place, matched by id.
    ///
    /// An unknown id means the entry fell outside the retained window; that
    /// is not an error and the update is dropped silently.
    pub fn apply_chat_update(&self, record: ChatRecord) {
        let replaced = {
            let mut snap = self.snapshot.write().unwrap();
            match snap.chat_history.iter_mut().find(|m| m.id == record.id) {
                Some(slot) => {
                    *slot = record;
                    true
                }
                None => false,
            }
        };
        if replaced {
            self.notifier.notify_deferred([Resource::Chat]);
        } else {
            tracing::debug!("chat update outside retained window, dropped");
        }
    }

    /// Insert or replace one actor.
    pub fn apply_actor_update(&self, actor_id: String, actor: ActorRecord) {
        {
            self.snapshot
                .write()
                .unwrap()
                .actors
                .insert(actor_id.clone(), actor);
        }
        self.notifier
            .notify_deferred([Resource::Actors, Resource::Actor(actor_id)]);
    }

    /// Replace the active combat; `None` clears it (combat ended).
    pub fn apply_combat_update(&self, combat: Option<CombatRecord>) {
        {
            self.snapshot.write().unwrap().combat = combat;
        }
        self.notifier.notify_deferred([Resource::Combat]);
    }

    /// Replace the active scene; `None` clears it.
    pub fn apply_scene_change(&self, scene: Option<SceneRecord>) {
        {
            self.snapshot.write().unwrap().scene = scene;
        }
        self.notifier.notify_deferred([Resource::Scene]);
    }

    /// Record that the peer is gone. Cached data stays readable but is
    /// flagged stale through the aggregate state resource. Idempotent.
    pub fn mark_disconnected(&self) {
        let was_connected = {
            let mut snap = self.snapshot.write().unwrap();
            snap.connected_at.take().is_some()
        };
        if was_connected {
            self.notifier.notify_immediate([Resource::State]);
        }
    }

    /// Clone of the full snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().unwrap().clone()
    }

    /// Whether a full snapshot has been applied since the last disconnect.
    pub fn is_connected(&self) -> bool {
        self.snapshot.read().unwrap().connected_at.is_some()
    }

    /// One actor by id.
    pub fn actor(&self, id: &str) -> Option<ActorRecord> {
        self.snapshot.read().unwrap().actors.get(id).cloned()
    }

    /// The actor collection.
    pub fn actors(&self) -> HashMap<String, ActorRecord> {
        self.snapshot.read().unwrap().actors.clone()
    }

    /// The active scene, if any.
    pub fn scene(&self) -> Option<SceneRecord> {
        self.snapshot.read().unwrap().scene.clone()
    }

    /// The active combat, if any.
    pub fn combat(&self) -> Option<CombatRecord> {
        self.snapshot.read().unwrap().combat.clone()
    }

    /// The last `limit` chat entries, oldest first.
    pub fn recent_chat(&self, limit: usize) -> Vec<ChatRecord> {
        let snap = self.snapshot.read().unwrap();
        let skip = snap.chat_history.len().saturating_sub(limit);
        snap.chat_history.iter().skip(skip).cloned().collect()
    }

    /// Case-insensitive substring search over chat content, newest first,
    /// bounded by `limit`.
    pub fn search_chat(&self, query: &str, limit: usize) -> Vec<ChatRecord> {
        let needle = query.to_lowercase();
        let snap = self.snapshot.read().unwrap();
        snap.chat_history
            .iter()
            .rev()
            .filter(|m| {
                m.content
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&needle))
            })
            .take(limit)
            .cloned()
            .collect()
    }
}

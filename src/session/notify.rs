//! Change notification debouncing
//!
//! High-frequency, low-value mutations (rapid token moves, bookkeeping
//! updates) must not produce a notification storm toward subscribers, so
//! non-immediate signals coalesce into one batch per quiet window. Full
//! snapshots and disconnects are high-value and flush without delay.
//!
//! Delivery rides a `tokio::sync::broadcast` channel: fan-out never blocks
//! the store, and a subscriber that falls behind loses batches instead of
//! stalling mutation.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Serialize, Serializer};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Bound on undelivered batches per subscriber before it starts lagging.
const NOTIFY_CAPACITY: usize = 64;

/// Resource identifiers carried in change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Aggregate session state (connection status, world identity).
    State,
    /// The actor collection.
    Actors,
    /// A single actor.
    Actor(String),
    /// The active scene.
    Scene,
    /// The active combat.
    Combat,
    /// The chat log.
    Chat,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::State => write!(f, "state"),
            Resource::Actors => write!(f, "actors"),
            Resource::Actor(id) => write!(f, "actors/{id}"),
            Resource::Scene => write!(f, "scene"),
            Resource::Combat => write!(f, "combat"),
            Resource::Chat => write!(f, "chat"),
        }
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The full resource set, for events that invalidate every view.
pub fn all_resources() -> Vec<Resource> {
    vec![
        Resource::State,
        Resource::Actors,
        Resource::Scene,
        Resource::Combat,
        Resource::Chat,
    ]
}

/// One flushed notification: the union of resources touched since the last
/// flush. Consumers re-read whichever of these they care about.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeBatch {
    pub resources: Vec<Resource>,
}

struct Pending {
    resources: HashSet<Resource>,
    timer: Option<JoinHandle<()>>,
}

/// Coalesces change signals into rate-limited batches.
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeBatch>,
    pending: Mutex<Pending>,
    window: Duration,
}

impl ChangeNotifier {
    /// Create a notifier that flushes deferred signals once per quiet `window`.
    pub fn new(window: Duration) -> Arc<Self> {
        let (tx, _) = broadcast::channel(NOTIFY_CAPACITY);
        Arc::new(Self {
            tx,
            pending: Mutex::new(Pending {
                resources: HashSet::new(),
                timer: None,
            }),
            window,
        })
    }

    /// Subscribe to flushed batches. Register before the server starts to
    /// observe every flush.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeBatch> {
        self.tx.subscribe()
    }

    /// Queue resources and (re)start the quiet-window timer from now.
    pub fn notify_deferred(self: &Arc<Self>, resources: impl IntoIterator<Item = Resource>) {
        let mut pending = self.pending.lock().unwrap();
        pending.resources.extend(resources);
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }
        let notifier = Arc::clone(self);
        pending.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(notifier.window).await;
            notifier.flush();
        }));
    }

    /// Queue resources, cancel any pending timer, and flush synchronously.
    pub fn notify_immediate(self: &Arc<Self>, resources: impl IntoIterator<Item = Resource>) {
        {
            let mut pending = self.pending.lock().unwrap();
            pending.resources.extend(resources);
            if let Some(timer) = pending.timer.take() {
                timer.abort();
            }
        }
        self.flush();
    }

    /// Drain the pending set into one batch. The set clears atomically: a
    /// resource is never reported twice for one mutation.
    fn flush(&self) {
        let resources: Vec<Resource> = {
            let mut pending = self.pending.lock().unwrap();
            pending.timer = None;
            pending.resources.drain().collect()
        };
        if resources.is_empty() {
            return;
        }
        // No subscribers is not an error
        let _ = self.tx.send(ChangeBatch { resources });
    }
}

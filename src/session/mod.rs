//! Session state: authoritative snapshot, store, and change notification
//!
//! ```text
//!   peer messages ──► SessionStore ──┬─► SessionSnapshot (copy-on-read)
//!                                    │
//!                                    └─► ChangeNotifier ──► broadcast ──► subscribers
//!                                        (500 ms debounce, immediate for
//!                                         full snapshots and disconnects)
//! ```

pub mod notify;
pub mod snapshot;
pub mod store;

pub use notify::{ChangeBatch, ChangeNotifier, Resource};
pub use snapshot::{SessionSnapshot, CHAT_HISTORY_LIMIT};
pub use store::SessionStore;

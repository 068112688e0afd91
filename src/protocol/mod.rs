//! Wire protocol with the game client
//!
//! The peer speaks JSON text frames over one WebSocket. [`message`] defines
//! the closed sum types per direction; [`records`] the entity payloads they
//! carry. Unknown tags fail to parse and are dropped by the dispatcher
//! without affecting the connection.

pub mod message;
pub mod records;

pub use message::{ClientMessage, ServerMessage};
pub use records::{ActorRecord, ChatRecord, CombatRecord, RollRecord, SceneRecord};

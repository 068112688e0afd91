//! vtt-bridge: sidecar between a browser VTT game client and local tooling
//!
//! The bridge accepts exactly one WebSocket peer (the game client), keeps an
//! authoritative in-memory snapshot of the game session, pushes debounced
//! change notifications to subscribers, and persists the client's media
//! side-channel to WebM files on disk.
//!
//! # Architecture
//!
//! ```text
//!   game client ──ws──► server::connection ──┬─► session::SessionStore
//!                          │                 │        │
//!                          │ (heartbeat)     │        ▼
//!                          │                 │   ChangeNotifier ──► subscribers
//!                          │                 │
//!                          │                 └─► capture::MediaCapture ──► .webm
//!                          │
//!   tooling ◄──http/sse──┴── api::routes (reads snapshot, sends whispers)
//! ```
//!
//! Exactly one peer is live at any instant; a new connection forcibly
//! supersedes the old one, so a page reload reconnects transparently.

pub mod api;
pub mod capture;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;

pub use error::{BridgeError, Result};
pub use server::{build_router, run, Bridge, BridgeConfig};

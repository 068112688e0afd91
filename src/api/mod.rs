//! Downstream consumer surface
//!
//! Everything local tooling sees: resource views and actions (`routes`),
//! roll summaries with the adjective ladder (`rolls`), and image asset
//! browsing (`assets`). All of it reads the store through its synchronous
//! accessors; nothing here can block or mutate session state.

pub mod assets;
pub mod rolls;
pub mod routes;

pub use rolls::{describe, ladder_label, parse_rolls, RollSummary};

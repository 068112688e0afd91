//! Crate-level error types

use std::net::SocketAddr;

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Top-level bridge failures
///
/// Everything recoverable (malformed frames, missing resources, sink faults)
/// is handled and logged where it occurs; only failures that should stop the
/// process surface here.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The endpoint could not bind its address. Fatal at startup.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level failure while serving.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

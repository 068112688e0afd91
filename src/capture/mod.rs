//! Media capture: the base64 side-channel persisted to disk
//!
//! ```text
//!   videoChunk frames ──► MediaCapture ──try_send──► sink task ──► .webm files
//!                          (rotation on EBML magic,   (owns the
//!                           drop under backpressure)   open file)
//! ```

pub mod coordinator;
mod sink;

pub use coordinator::{CaptureStatus, MediaCapture, EBML_MAGIC};

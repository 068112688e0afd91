//! Media capture coordinator
//!
//! Demuxes the base64 media side-channel from the peer into WebM files on
//! disk. The producing client restarts its encoder on page reload, so a
//! fragment that begins with the EBML magic while a file is already receiving
//! data marks a new container instance: the current file is closed and a
//! fresh one started. Raw container fragments are only valid from the first
//! byte of a container, so a file is never appended across sessions and never
//! holds a second header.
//!
//! Media is best-effort training data, not an integrity-critical path: when
//! the sink cannot keep up, fragments are dropped rather than buffered.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::sink::{run_sink, SinkCommand};

/// First four bytes of an EBML (WebM/Matroska) container. The sole signal
/// used for rotation detection.
pub const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Suffix for capture output files.
const CAPTURE_SUFFIX: &str = ".webm";

/// Coordinator state reported to consumers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureStatus {
    pub active: bool,
    pub path: Option<PathBuf>,
    pub started_at: Option<DateTime<Utc>>,
    pub bytes_received: u64,
    pub fragments: u64,
    pub backpressure: bool,
}

/// Bookkeeping for the file currently being written.
#[derive(Debug)]
struct CaptureSession {
    path: PathBuf,
    started_at: DateTime<Utc>,
    bytes: u64,
    fragments: u64,
}

#[derive(Debug, Default)]
struct State {
    session: Option<CaptureSession>,
    backpressure: bool,
    dropped: u64,
}

/// Coordinates the media side-channel: container boundaries, file lifecycle
/// and backpressure toward the file sink.
pub struct MediaCapture {
    dir: PathBuf,
    tx: mpsc::Sender<SinkCommand>,
    state: Mutex<State>,
    sequence: AtomicU64,
    sink: Mutex<Option<JoinHandle<()>>>,
}

impl MediaCapture {
    /// Create a coordinator writing under `dir`, with a bounded sink queue of
    /// `queue_capacity` pending writes.
    pub fn new(dir: impl Into<PathBuf>, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let sink = tokio::spawn(run_sink(rx));
        Self {
            dir: dir.into(),
            tx,
            state: Mutex::new(State::default()),
            sequence: AtomicU64::new(0),
            sink: Mutex::new(Some(sink)),
        }
    }

    /// Test constructor: the caller owns the receiving end of the sink queue.
    #[cfg(test)]
    pub(crate) fn with_sink_channel(dir: impl Into<PathBuf>, tx: mpsc::Sender<SinkCommand>) -> Self {
        Self {
            dir: dir.into(),
            tx,
            state: Mutex::new(State::default()),
            sequence: AtomicU64::new(0),
            sink: Mutex::new(None),
        }
    }

    /// Ingest one base64-encoded fragment from the peer.
    pub fn handle_fragment(&self, encoded: &str, timestamp: f64) {
        let bytes: Bytes = match BASE64.decode(encoded) {
            Ok(raw) => raw.into(),
            Err(e) => {
                tracing::warn!(error = %e, timestamp, "undecodable media fragment dropped");
                return;
            }
        };

        let mut state = self.state.lock().unwrap();

        if state.backpressure {
            if self.tx.capacity() == self.tx.max_capacity() {
                tracing::info!(dropped = state.dropped, "capture sink drained, resuming");
                state.backpressure = false;
                state.dropped = 0;
            } else {
                state.dropped += 1;
                return;
            }
        }

        let header = bytes.starts_with(&EBML_MAGIC);
        let len = bytes.len() as u64;

        let rotate = match &state.session {
            // Lazily open the first file of a capture session.
            None => true,
            // A header after data already landed means the client restarted
            // its encoder mid-stream.
            Some(session) => header && session.fragments > 0,
        };

        if rotate {
            let path = self.next_path();
            match self.tx.try_send(SinkCommand::Rotate {
                path: path.clone(),
                first: bytes,
            }) {
                Ok(()) => {
                    match state.session.take() {
                        Some(previous) => tracing::info!(
                            previous = %previous.path.display(),
                            next = %path.display(),
                            "container restarted, rotating capture file"
                        ),
                        None => {
                            tracing::info!(path = %path.display(), timestamp, "capture file opened");
                        }
                    }
                    state.session = Some(CaptureSession {
                        path,
                        started_at: Utc::now(),
                        bytes: len,
                        fragments: 1,
                    });
                }
                Err(_) => self.enter_backpressure(&mut state),
            }
        } else {
            match self.tx.try_send(SinkCommand::Write(bytes)) {
                Ok(()) => {
                    if let Some(session) = state.session.as_mut() {
                        session.bytes += len;
                        session.fragments += 1;
                    }
                }
                Err(_) => self.enter_backpressure(&mut state),
            }
        }
    }

    /// Close the current file (if any) and clear counters. Idempotent.
    pub async fn stop(&self) {
        let previous = {
            let mut state = self.state.lock().unwrap();
            state.backpressure = false;
            state.dropped = 0;
            state.session.take()
        };
        if let Some(session) = previous {
            tracing::info!(
                path = %session.path.display(),
                bytes = session.bytes,
                fragments = session.fragments,
                "capture stopped"
            );
            if self.tx.send(SinkCommand::Close).await.is_err() {
                tracing::warn!("capture sink gone before close");
            }
        }
    }

    /// Stop capture and wait for the sink to finish flushing.
    pub async fn shutdown(&self) {
        self.stop().await;
        let handle = { self.sink.lock().unwrap().take() };
        if let Some(handle) = handle {
            let _ = self.tx.send(SinkCommand::Shutdown).await;
            let _ = handle.await;
        }
    }

    /// Current coordinator state.
    pub fn status(&self) -> CaptureStatus {
        let state = self.state.lock().unwrap();
        match &state.session {
            Some(session) => CaptureStatus {
                active: true,
                path: Some(session.path.clone()),
                started_at: Some(session.started_at),
                bytes_received: session.bytes,
                fragments: session.fragments,
                backpressure: state.backpressure,
            },
            None => CaptureStatus {
                active: false,
                path: None,
                started_at: None,
                bytes_received: 0,
                fragments: 0,
                backpressure: state.backpressure,
            },
        }
    }

    fn enter_backpressure(&self, state: &mut State) {
        if !state.backpressure {
            tracing::warn!("capture sink full, dropping fragments until it drains");
        }
        state.backpressure = true;
        state.dropped += 1;
    }

    /// Timestamp-named output path. The sequence number keeps rotations that
    /// land within one millisecond from colliding.
    fn next_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3f");
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!("{stamp}-{sequence:03}{CAPTURE_SUFFIX}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(bytes: &[u8]) -> String {
        BASE64.encode(bytes)
    }

    fn header_fragment(tail: &[u8]) -> Vec<u8> {
        let mut fragment = EBML_MAGIC.to_vec();
        fragment.extend_from_slice(tail);
        fragment
    }

    fn files_in(dir: &std::path::Path, count: usize) -> Vec<std::path::PathBuf> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(paths.len(), count);
        paths.sort();
        paths
    }

    #[tokio::test]
    async fn test_header_mid_stream_rotates_files() {
        let dir = tempfile::tempdir().unwrap();
        let capture = MediaCapture::new(dir.path(), 32);

        let h = header_fragment(b"one");
        let a = b"aaaa".to_vec();
        let b = b"bbbb".to_vec();
        let h2 = header_fragment(b"two");
        let c = b"cccc".to_vec();

        for fragment in [&h, &a, &b, &h2, &c] {
            capture.handle_fragment(&encode(fragment), 1.0);
        }

        let status = capture.status();
        assert!(status.active);
        assert_eq!(status.fragments, 2);
        assert_eq!(status.bytes_received, (h2.len() + c.len()) as u64);

        capture.shutdown().await;

        let paths = files_in(dir.path(), 2);
        let first = std::fs::read(&paths[0]).unwrap();
        let second = std::fs::read(&paths[1]).unwrap();
        assert_eq!(first, [h.clone(), a, b].concat());
        assert_eq!(second, [h2, c].concat());
    }

    #[tokio::test]
    async fn test_first_fragment_opens_file_even_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let capture = MediaCapture::new(dir.path(), 32);

        capture.handle_fragment(&encode(b"mid-stream"), 1.0);

        assert!(capture.status().active);
        capture.shutdown().await;

        let paths = files_in(dir.path(), 1);
        assert_eq!(std::fs::read(&paths[0]).unwrap(), b"mid-stream");
    }

    #[tokio::test]
    async fn test_header_as_first_fragment_does_not_rotate() {
        let dir = tempfile::tempdir().unwrap();
        let capture = MediaCapture::new(dir.path(), 32);

        capture.handle_fragment(&encode(&header_fragment(b"x")), 1.0);
        capture.handle_fragment(&encode(b"data"), 2.0);

        capture.shutdown().await;
        files_in(dir.path(), 1);
    }

    #[tokio::test]
    async fn test_backpressure_drops_then_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(2);
        let capture = MediaCapture::with_sink_channel(dir.path(), tx);

        capture.handle_fragment(&encode(b"one"), 1.0);
        capture.handle_fragment(&encode(b"two"), 2.0);
        // Queue full: this one is dropped, not buffered
        capture.handle_fragment(&encode(b"three"), 3.0);

        let status = capture.status();
        assert!(status.backpressure);
        assert_eq!(status.fragments, 2);

        // Partially drained is not enough to resume
        assert!(rx.try_recv().is_ok());
        capture.handle_fragment(&encode(b"still-dropped"), 3.5);
        assert!(capture.status().backpressure);

        // Fully drained: the next fragment resumes capture
        while rx.try_recv().is_ok() {}

        capture.handle_fragment(&encode(b"four"), 4.0);
        let status = capture.status();
        assert!(!status.backpressure);
        assert_eq!(status.fragments, 3);
        assert!(matches!(rx.try_recv(), Ok(SinkCommand::Write(_))));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let capture = MediaCapture::new(dir.path(), 32);

        capture.handle_fragment(&encode(b"data"), 1.0);
        capture.stop().await;
        capture.stop().await;

        let status = capture.status();
        assert!(!status.active);
        assert_eq!(status.bytes_received, 0);

        capture.shutdown().await;
    }

    #[tokio::test]
    async fn test_undecodable_fragment_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let capture = MediaCapture::new(dir.path(), 32);

        capture.handle_fragment("&&& not base64 &&&", 1.0);

        assert!(!capture.status().active);
        capture.shutdown().await;
    }
}

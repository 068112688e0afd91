//! Capture file sink
//!
//! A dedicated writer task owns the output file, so ingesting a fragment
//! never blocks on disk I/O beyond enqueueing a command. A write fault
//! abandons the current file and capture resumes at the next rotation; the
//! bridge keeps running either way.

use std::path::PathBuf;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Commands accepted by the sink task.
#[derive(Debug)]
pub(crate) enum SinkCommand {
    /// Close the current file (if any) and start `path` with `first` as its
    /// first bytes.
    Rotate { path: PathBuf, first: Bytes },
    /// Append bytes to the current file.
    Write(Bytes),
    /// Close the current file and wait for the next rotation.
    Close,
    /// Close and exit the task.
    Shutdown,
}

/// Run the sink loop until `Shutdown` or channel closure.
pub(crate) async fn run_sink(mut rx: mpsc::Receiver<SinkCommand>) {
    let mut current: Option<(PathBuf, File)> = None;

    while let Some(command) = rx.recv().await {
        match command {
            SinkCommand::Rotate { path, first } => {
                close_current(&mut current).await;
                match File::create(&path).await {
                    Ok(mut file) => match file.write_all(&first).await {
                        Ok(()) => current = Some((path, file)),
                        Err(e) => {
                            tracing::error!(
                                path = %path.display(),
                                error = %e,
                                "capture write failed, abandoning file"
                            );
                        }
                    },
                    Err(e) => {
                        tracing::error!(
                            path = %path.display(),
                            error = %e,
                            "failed to create capture file"
                        );
                    }
                }
            }
            SinkCommand::Write(bytes) => {
                if let Some((path, file)) = current.as_mut() {
                    if let Err(e) = file.write_all(&bytes).await {
                        tracing::error!(
                            path = %path.display(),
                            error = %e,
                            "capture write failed, abandoning file"
                        );
                        current = None;
                    }
                }
            }
            SinkCommand::Close => close_current(&mut current).await,
            SinkCommand::Shutdown => break,
        }
    }

    close_current(&mut current).await;
}

async fn close_current(current: &mut Option<(PathBuf, File)>) {
    if let Some((path, mut file)) = current.take() {
        if let Err(e) = file.flush().await {
            tracing::warn!(path = %path.display(), error = %e, "error flushing capture file");
        }
        tracing::info!(path = %path.display(), "capture file closed");
    }
}

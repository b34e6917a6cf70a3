// src/runner/tee.rs

//! Fan-out of subprocess output.
//!
//! Each child stream is copied chunk by chunk; every chunk is written to
//! the interactive console stream and also sent over a channel to a single
//! log-writer task, so the user sees live progress while a durable record
//! accumulates in the run directory. Forwarding happens at the byte level:
//! a prompt printed without a trailing newline still reaches the console
//! before the child blocks on stdin, and non-UTF-8 output passes through
//! verbatim.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Owner of the run log file. All writers go through the channel so that
/// stdout and stderr chunks are appended whole, never torn.
pub struct LogSink {
    tx: Option<mpsc::Sender<Vec<u8>>>,
    writer: Option<JoinHandle<()>>,
}

impl LogSink {
    /// Create the log file (truncating any previous one) and spawn the
    /// writer task behind it.
    pub async fn create(path: &Path) -> Result<Self> {
        let mut file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("creating log file {:?}", path))?;

        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
        let log_path = path.to_path_buf();
        let writer = tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                if let Err(err) = write_chunk(&mut file, &chunk).await {
                    warn!(path = ?log_path, error = %err, "dropping log output");
                }
            }
            if let Err(err) = file.sync_all().await {
                warn!(path = ?log_path, error = %err, "failed to sync log file");
            }
            debug!(path = ?log_path, "log writer finished");
        });

        Ok(Self {
            tx: Some(tx),
            writer: Some(writer),
        })
    }

    /// Sender handle for tee tasks.
    pub fn sender(&self) -> mpsc::Sender<Vec<u8>> {
        // Invariant: tx is Some until shutdown, and shutdown consumes the
        // runner's only reference to the sink.
        self.tx.as_ref().cloned().unwrap_or_else(|| {
            let (tx, _rx) = mpsc::channel(1);
            tx
        })
    }

    /// Append one line to the log.
    pub async fn write_line(&self, line: &str) -> Result<()> {
        if let Some(tx) = &self.tx {
            let mut chunk = Vec::with_capacity(line.len() + 1);
            chunk.extend_from_slice(line.as_bytes());
            chunk.push(b'\n');
            tx.send(chunk).await.context("log writer task is gone")?;
        }
        Ok(())
    }

    /// Close the channel and wait for the writer to flush and sync.
    pub async fn shutdown(&mut self) {
        self.tx.take();
        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }
    }
}

async fn write_chunk(file: &mut tokio::fs::File, chunk: &[u8]) -> std::io::Result<()> {
    file.write_all(chunk).await?;
    file.flush().await
}

/// Pump one child stream: duplicate every chunk of bytes to `console` and
/// to the log channel. Returns a handle the caller awaits after the child
/// exits so no trailing output is lost.
pub fn spawn_tee<R, W>(
    mut reader: R,
    mut console: W,
    log_tx: mpsc::Sender<Vec<u8>>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 8192];
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => {
                    debug!(error = %err, "output pump read failed");
                    break;
                }
            };
            if console.write_all(&buf[..n]).await.is_ok() {
                let _ = console.flush().await;
            }
            // Even if the log writer is gone, keep draining so the child
            // never blocks on a full pipe.
            let _ = log_tx.send(buf[..n].to_vec()).await;
        }
        debug!("output pump ended");
    })
}

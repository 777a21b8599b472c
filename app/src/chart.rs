// In app/src/chart.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use events::{BroadcastSink, ChartEvent, EventSink};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

const CHANNEL_CAPACITY: usize = 1024;

/// Streams chart events to a JSON-lines file from a background task.
pub struct ChartWriter {
    sink: Arc<BroadcastSink>,
    handle: JoinHandle<Result<u64>>,
}

impl ChartWriter {
    pub async fn start(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let file = File::create(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
        let sink = Arc::new(BroadcastSink::new(tx));
        let handle = tokio::spawn(write_events(rx, BufWriter::new(file), path.to_path_buf()));
        tracing::info!(path = %path.display(), "Writing chart events.");

        Ok(Self { sink, handle })
    }

    pub fn sink(&self) -> Arc<dyn EventSink> {
        self.sink.clone()
    }

    /// Waits for the writer once every other sink handle is dropped.
    pub async fn finish(self) -> Result<()> {
        drop(self.sink);
        let written = self.handle.await??;
        tracing::info!(written, "Chart events written.");
        Ok(())
    }
}

async fn write_events(
    mut rx: broadcast::Receiver<ChartEvent>,
    mut out: BufWriter<File>,
    path: PathBuf,
) -> Result<u64> {
    let mut written = 0;
    loop {
        match rx.recv().await {
            Ok(event) => {
                let mut line = events::to_json_line(&event)?;
                line.push('\n');
                out.write_all(line.as_bytes())
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                written += 1;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Chart writer fell behind, events dropped.");
            }
            Err(RecvError::Closed) => break,
        }
    }
    out.flush().await?;
    Ok(written)
}

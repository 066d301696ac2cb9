//! File-backed capture: replays a pre-encoded media file as recorder output,
//! one timeslice worth of bytes per tick.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use castwire_core::error::{CastwireError, Result};
use castwire_core::MediaConfig;

use super::{Constraints, LocalStream, MediaDevice, Recorder};

pub struct FileDevice {
    path: PathBuf,
}

impl FileDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MediaDevice for FileDevice {
    async fn acquire(&self, _constraints: Constraints) -> Result<Box<dyn LocalStream>> {
        let file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            CastwireError::Device(format!("open {} failed: {e}", self.path.display()))
        })?;
        Ok(Box::new(FileStream {
            id: self.path.display().to_string(),
            file: Some(file),
        }))
    }
}

struct FileStream {
    id: String,
    file: Option<tokio::fs::File>,
}

impl LocalStream for FileStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn record(&mut self, media: &MediaConfig) -> Result<Box<dyn Recorder>> {
        let file = self
            .file
            .take()
            .ok_or_else(|| CastwireError::Device(format!("{} is already recording", self.id)))?;
        Ok(Box::new(FileRecorder {
            file: Some(file),
            chunk_bytes: media.bytes_per_chunk().max(1),
            task: None,
        }))
    }
}

struct FileRecorder {
    file: Option<tokio::fs::File>,
    chunk_bytes: usize,
    task: Option<JoinHandle<()>>,
}

impl Recorder for FileRecorder {
    fn start(&mut self, timeslice: Duration) -> Result<mpsc::Receiver<Bytes>> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CastwireError::Internal("recorder already started".into()))?;
        let chunk_bytes = self.chunk_bytes;
        let (tx, rx) = mpsc::channel(4);

        self.task = Some(tokio::spawn(async move {
            let mut tick = interval_at(Instant::now() + timeslice, timeslice);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tick.tick().await;
                let mut buf = Vec::with_capacity(chunk_bytes);
                match (&mut file).take(chunk_bytes as u64).read_to_end(&mut buf).await {
                    Ok(0) => {
                        info!("capture source exhausted");
                        break;
                    }
                    Ok(n) => {
                        debug!(n, "chunk ready");
                        if tx.send(Bytes::from(buf)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "capture source read failed");
                        break;
                    }
                }
            }
        }));
        Ok(rx)
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for FileRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_a_device_fault() {
        let device = FileDevice::new("/nonexistent/castwire/capture.webm");
        let err = device.acquire(Constraints::default()).await.err().unwrap();
        assert_eq!(err.kind().as_str(), "DEVICE");
    }

    #[tokio::test(start_paused = true)]
    async fn file_is_sliced_per_timeslice() {
        let path = std::env::temp_dir().join(format!("castwire-src-{}.webm", std::process::id()));
        std::fs::write(&path, vec![7u8; 30_000]).unwrap();

        let device = FileDevice::new(&path);
        let mut stream = device.acquire(Constraints::default()).await.unwrap();
        let mut recorder = stream.record(&MediaConfig::default()).unwrap();
        let mut rx = recorder.start(Duration::from_millis(1000)).unwrap();

        let mut sizes = Vec::new();
        while let Some(chunk) = rx.recv().await {
            sizes.push(chunk.len());
        }
        // 13 250 bytes per 1s slice at the default bitrates
        assert_eq!(sizes, vec![13_250, 13_250, 3_500]);
        let _ = std::fs::remove_file(&path);
    }
}

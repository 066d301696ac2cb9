//! In-process capture backends.
//!
//! `ScriptedDevice` replays a fixed list of chunks, unpaced: the recorder
//! queues them all on start and keeps the channel open until stopped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use castwire_core::error::{CastwireError, Result};
use castwire_core::MediaConfig;

use super::{Constraints, LocalStream, MediaDevice, Preview, Recorder};

#[derive(Clone)]
pub struct ScriptedDevice {
    chunks: Arc<Vec<Bytes>>,
    failure: Option<String>,
    acquisitions: Arc<AtomicU64>,
}

impl ScriptedDevice {
    pub fn new(chunks: Vec<Bytes>) -> Self {
        Self {
            chunks: Arc::new(chunks),
            failure: None,
            acquisitions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Device that rejects every acquisition with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MediaDevice for ScriptedDevice {
    async fn acquire(&self, constraints: Constraints) -> Result<Box<dyn LocalStream>> {
        if let Some(reason) = &self.failure {
            return Err(CastwireError::Device(reason.clone()));
        }
        if !constraints.video && !constraints.audio {
            return Err(CastwireError::Device("no tracks requested".into()));
        }
        let n = self.acquisitions.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Box::new(ScriptedStream {
            id: format!("scripted-{n}"),
            chunks: Arc::clone(&self.chunks),
        }))
    }
}

struct ScriptedStream {
    id: String,
    chunks: Arc<Vec<Bytes>>,
}

impl LocalStream for ScriptedStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn record(&mut self, _media: &MediaConfig) -> Result<Box<dyn Recorder>> {
        Ok(Box::new(ScriptedRecorder {
            chunks: Arc::clone(&self.chunks),
            tx: None,
        }))
    }
}

struct ScriptedRecorder {
    chunks: Arc<Vec<Bytes>>,
    tx: Option<mpsc::Sender<Bytes>>,
}

impl Recorder for ScriptedRecorder {
    fn start(&mut self, _timeslice: Duration) -> Result<mpsc::Receiver<Bytes>> {
        let (tx, rx) = mpsc::channel(self.chunks.len().max(1));
        for chunk in self.chunks.iter() {
            tx.try_send(chunk.clone())
                .map_err(|e| CastwireError::Internal(format!("scripted recorder: {e}")))?;
        }
        self.tx = Some(tx);
        Ok(rx)
    }

    fn stop(&mut self) {
        self.tx = None;
    }
}

#[derive(Default)]
struct PreviewState {
    attached: Mutex<Option<String>>,
    pauses: AtomicU64,
    rewinds: AtomicU64,
}

/// Preview that records what happened to it.
#[derive(Clone, Default)]
pub struct MemoryPreview {
    state: Arc<PreviewState>,
}

impl MemoryPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached(&self) -> Option<String> {
        self.state
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn pauses(&self) -> u64 {
        self.state.pauses.load(Ordering::Relaxed)
    }

    pub fn rewinds(&self) -> u64 {
        self.state.rewinds.load(Ordering::Relaxed)
    }
}

impl Preview for MemoryPreview {
    fn attach(&mut self, stream_id: &str) {
        *self
            .state
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(stream_id.to_string());
    }

    fn pause(&mut self) {
        self.state.pauses.fetch_add(1, Ordering::Relaxed);
    }

    fn rewind(&mut self) {
        self.state.rewinds.fetch_add(1, Ordering::Relaxed);
    }
}

//! In-process playback backends.
//!
//! Clones share state, so a caller can keep one handle for inspection after
//! giving another to the playback buffer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;

use castwire_core::error::{CastwireError, Result};

use super::{MediaSource, PlaybackElement, SourceBuffer};

#[derive(Default)]
struct ElementState {
    playing: AtomicBool,
    play_calls: AtomicU64,
    rewinds: AtomicU64,
}

/// Element that only tracks its play state. Starts paused.
#[derive(Clone, Default)]
pub struct MemoryElement {
    state: Arc<ElementState>,
}

impl MemoryElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused_now(&self) -> bool {
        !self.state.playing.load(Ordering::Acquire)
    }

    pub fn play_calls(&self) -> u64 {
        self.state.play_calls.load(Ordering::Relaxed)
    }

    pub fn rewinds(&self) -> u64 {
        self.state.rewinds.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PlaybackElement for MemoryElement {
    fn is_paused(&self) -> bool {
        self.is_paused_now()
    }

    async fn play(&mut self) -> Result<()> {
        self.state.play_calls.fetch_add(1, Ordering::Relaxed);
        self.state.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&mut self) {
        self.state.playing.store(false, Ordering::Release);
    }

    fn rewind(&mut self) {
        self.state.rewinds.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct SourceState {
    supported: Option<String>,
    data: Mutex<Vec<u8>>,
    buffers: AtomicU64,
    reject_next: AtomicBool,
}

/// Source whose buffer concatenates every appended chunk.
#[derive(Clone, Default)]
pub struct MemorySource {
    state: Arc<SourceState>,
}

impl MemorySource {
    /// Accepts any mime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts only `mime`.
    pub fn supporting(mime: &str) -> Self {
        Self {
            state: Arc::new(SourceState {
                supported: Some(mime.to_string()),
                ..SourceState::default()
            }),
        }
    }

    pub fn data(&self) -> Vec<u8> {
        self.state
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn buffers_created(&self) -> u64 {
        self.state.buffers.load(Ordering::Relaxed)
    }

    /// Make the next append fail, as an overlapping or malformed range would.
    pub fn fail_next_append(&self) {
        self.state.reject_next.store(true, Ordering::Release);
    }
}

impl MediaSource for MemorySource {
    fn add_source_buffer(&mut self, mime: &str) -> Result<Box<dyn SourceBuffer>> {
        if let Some(supported) = &self.state.supported {
            if supported != mime {
                return Err(CastwireError::Decode(format!("unsupported mime: {mime}")));
            }
        }
        self.state.buffers.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemorySourceBuffer {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemorySourceBuffer {
    state: Arc<SourceState>,
}

#[async_trait]
impl SourceBuffer for MemorySourceBuffer {
    async fn append(&mut self, chunk: Bytes) -> Result<()> {
        if self.state.reject_next.swap(false, Ordering::AcqRel) {
            return Err(CastwireError::Decode("append rejected".into()));
        }
        self.state
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(&chunk);
        Ok(())
    }
}

//! Playback buffer: rebuilds a continuous stream from relayed chunks.
//!
//! The element and its media source are bound at construction. Once the
//! source opens, exactly one append-only `SourceBuffer` is created for the
//! session's mime; every successful append resumes the element if it is
//! paused, which is how playback keeps up as data streams in.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, error, info, warn};

use castwire_core::error::{CastwireError, Result};

/// The element the user watches.
#[async_trait]
pub trait PlaybackElement: Send {
    fn is_paused(&self) -> bool;
    async fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    /// Reset the playback position to the start.
    fn rewind(&mut self);
}

/// Append-only decoder input for one mime type.
#[async_trait]
pub trait SourceBuffer: Send {
    /// Resolves when the append has completed.
    async fn append(&mut self, chunk: Bytes) -> Result<()>;
}

/// Streaming source bound to the element.
pub trait MediaSource: Send {
    fn add_source_buffer(&mut self, mime: &str) -> Result<Box<dyn SourceBuffer>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub appended_chunks: u64,
    pub appended_bytes: u64,
    /// Chunks that arrived before the source opened.
    pub dropped_before_open: u64,
    pub decode_faults: u64,
    pub sequence_gaps: u64,
    /// Play calls issued because the element was paused after an append.
    pub resumes: u64,
}

pub struct PlaybackBuffer {
    element: Box<dyn PlaybackElement>,
    source: Box<dyn MediaSource>,
    buffer: Option<Box<dyn SourceBuffer>>,
    mime: Option<String>,
    last_seq: Option<u64>,
    stats: PlaybackStats,
}

impl PlaybackBuffer {
    pub fn new(element: Box<dyn PlaybackElement>, source: Box<dyn MediaSource>) -> Self {
        Self {
            element,
            source,
            buffer: None,
            mime: None,
            last_seq: None,
            stats: PlaybackStats::default(),
        }
    }

    /// Create the sub-buffer. Only the first call has an effect.
    pub fn on_source_open(&mut self, mime: &str) -> Result<()> {
        if let Some(current) = &self.mime {
            if current != mime {
                warn!(current = %current, requested = %mime, "source buffer already open, mime unchanged");
            }
            return Ok(());
        }
        let buffer = self.source.add_source_buffer(mime)?;
        info!(mime = %mime, "source buffer open");
        self.buffer = Some(buffer);
        self.mime = Some(mime.to_string());
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    /// Append one chunk, then resume the element if paused.
    /// Returns `false` if the chunk was dropped because the source is not open yet.
    pub async fn append(&mut self, chunk: Bytes, seq: Option<u64>) -> Result<bool> {
        let Some(buffer) = self.buffer.as_mut() else {
            self.stats.dropped_before_open += 1;
            debug!(len = chunk.len(), "source not open, chunk dropped");
            return Ok(false);
        };

        if let Some(seq) = seq {
            if let Some(last) = self.last_seq {
                if seq != last.wrapping_add(1) {
                    self.stats.sequence_gaps += 1;
                    warn!(expected = last.wrapping_add(1), got = seq, "chunk sequence gap");
                }
            }
            self.last_seq = Some(seq);
        }

        let len = chunk.len() as u64;
        if let Err(e) = buffer.append(chunk).await {
            self.stats.decode_faults += 1;
            error!(error = %e, len, "append failed, playback stalled");
            return Err(CastwireError::Decode(format!("append failed: {e}")));
        }

        self.stats.appended_chunks += 1;
        self.stats.appended_bytes += len;
        self.resume_if_paused().await?;
        Ok(true)
    }

    /// Play if paused. Harmless on a playing element.
    pub async fn resume_if_paused(&mut self) -> Result<bool> {
        if !self.element.is_paused() {
            return Ok(false);
        }
        self.element.play().await?;
        self.stats.resumes += 1;
        Ok(true)
    }

    /// Pause and rewind the element (capture stop resets the remote view too).
    pub fn stop(&mut self) {
        self.element.pause();
        self.element.rewind();
    }

    pub fn is_paused(&self) -> bool {
        self.element.is_paused()
    }

    pub fn stats(&self) -> PlaybackStats {
        self.stats.clone()
    }

    /// Count a chunk that never reached the source buffer because it could not be decoded.
    pub fn record_decode_fault(&mut self, err: &CastwireError) {
        self.stats.decode_faults += 1;
        error!(error = %err, "undecodable chunk, playback stalled");
    }
}

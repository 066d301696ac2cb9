//! Capture pipeline: local media -> timed chunks -> `stream` messages.
//!
//! `start` acquires an audio+video stream, attaches it to the muted local
//! preview, and opens a recorder that emits one chunk per timeslice. The
//! session loop pulls chunks with `next_chunk` and hands each to `forward`,
//! which skips empty chunks and sends the rest in production order. `stop`
//! halts the recorder without flushing the chunk in flight.

pub mod file;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use castwire_core::error::{CastwireError, Result};
use castwire_core::protocol::{paths, ChunkCodec, Envelope, MediaFrame, MediaKind};
use castwire_core::MediaConfig;

use crate::config::MediaLane;
use crate::transport::TransportHandle;

/// Tracks requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    pub video: bool,
    pub audio: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

/// Camera/microphone access.
#[async_trait]
pub trait MediaDevice: Send + Sync {
    async fn acquire(&self, constraints: Constraints) -> Result<Box<dyn LocalStream>>;
}

/// An acquired local stream.
pub trait LocalStream: Send + Sync {
    fn id(&self) -> &str;
    fn record(&mut self, media: &MediaConfig) -> Result<Box<dyn Recorder>>;
}

/// Chunked encoder over a local stream.
pub trait Recorder: Send + Sync {
    /// Begin emitting one chunk per `timeslice`. The channel closes when the recorder ends.
    fn start(&mut self, timeslice: Duration) -> Result<mpsc::Receiver<Bytes>>;
    fn stop(&mut self);
}

/// Muted local loopback of the captured stream.
pub trait Preview: Send + Sync {
    fn attach(&mut self, stream_id: &str);
    fn pause(&mut self);
    fn rewind(&mut self);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub sessions: u64,
    pub chunks_produced: u64,
    pub empty_skipped: u64,
    pub chunks_sent: u64,
    pub bytes_sent: u64,
    /// Chunks the transport refused (closed socket or full writer).
    pub chunks_dropped: u64,
}

struct ActiveCapture {
    stream: Box<dyn LocalStream>,
    recorder: Box<dyn Recorder>,
    chunks: mpsc::Receiver<Bytes>,
}

pub struct CapturePipeline {
    device: Option<Arc<dyn MediaDevice>>,
    preview: Option<Box<dyn Preview>>,
    media: MediaConfig,
    codec: Arc<dyn ChunkCodec>,
    lane: MediaLane,
    sequence: bool,
    next_seq: u64,
    active: Option<ActiveCapture>,
    stats: CaptureStats,
}

impl CapturePipeline {
    pub fn new(
        device: Option<Arc<dyn MediaDevice>>,
        preview: Option<Box<dyn Preview>>,
        media: MediaConfig,
        codec: Arc<dyn ChunkCodec>,
        lane: MediaLane,
        sequence: bool,
    ) -> Self {
        Self {
            device,
            preview,
            media,
            codec,
            lane,
            sequence,
            next_seq: 0,
            active: None,
            stats: CaptureStats::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats.clone()
    }

    /// Acquire, preview, and start recording. A failure leaves no capture session behind.
    pub async fn start(&mut self) -> Result<()> {
        if self.active.is_some() {
            warn!("capture already running");
            return Ok(());
        }

        let Some(device) = self.device.as_ref() else {
            let e = CastwireError::Device("no capture device configured".into());
            error!(error = %e, "error accessing media devices");
            return Err(e);
        };

        let mut stream = match device.acquire(Constraints::default()).await {
            Ok(s) => s,
            Err(e) => {
                let e = match e {
                    CastwireError::Device(_) => e,
                    other => CastwireError::Device(other.to_string()),
                };
                error!(error = %e, "error accessing media devices");
                return Err(e);
            }
        };

        if let Some(preview) = self.preview.as_mut() {
            preview.attach(stream.id());
        }

        let started = stream.record(&self.media).and_then(|mut recorder| {
            let chunks = recorder.start(Duration::from_millis(self.media.timeslice_ms))?;
            Ok((recorder, chunks))
        });
        let (recorder, chunks) = match started {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "recorder failed to start");
                self.release_preview();
                return Err(e);
            }
        };

        info!(
            stream = stream.id(),
            mime = %self.media.mime,
            timeslice_ms = self.media.timeslice_ms,
            "capture started"
        );
        self.stats.sessions += 1;
        self.active = Some(ActiveCapture {
            stream,
            recorder,
            chunks,
        });
        Ok(())
    }

    /// Halt the recorder, release the preview, drop the capture handle.
    pub fn stop(&mut self) -> bool {
        let Some(mut active) = self.active.take() else {
            return false;
        };
        active.recorder.stop();
        self.release_preview();
        info!(stream = active.stream.id(), "capture stopped");
        true
    }

    /// Next recorder chunk. Pending forever while idle; `None` when the recorder ended.
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        match self.active.as_mut() {
            Some(active) => active.chunks.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Send one chunk. Empty chunks are skipped. Returns whether a frame was sent.
    pub fn forward(&mut self, chunk: Bytes, transport: &TransportHandle) -> bool {
        self.stats.chunks_produced += 1;
        if chunk.is_empty() {
            self.stats.empty_skipped += 1;
            return false;
        }

        let seq = self.sequence.then(|| {
            let seq = self.next_seq;
            self.next_seq += 1;
            seq
        });
        let len = chunk.len() as u64;

        let sent = match self.lane {
            MediaLane::Json => {
                let env = Envelope::new(paths::STREAM)
                    .with_blob(self.codec.encode_chunk(&chunk))
                    .with_seq(seq);
                transport.send(&env)
            }
            MediaLane::Binary => transport.send_frame(&MediaFrame {
                kind: MediaKind::Stream,
                // the binary header carries 32 bits; wrap past that
                seq: seq.map(|s| s as u32),
                payload: chunk,
            }),
        };

        if sent {
            self.stats.chunks_sent += 1;
            self.stats.bytes_sent += len;
        } else {
            self.stats.chunks_dropped += 1;
        }
        sent
    }

    fn release_preview(&mut self) {
        if let Some(preview) = self.preview.as_mut() {
            preview.pause();
            preview.rewind();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::{MemoryPreview, ScriptedDevice};
    use super::*;
    use castwire_core::protocol::{codec_for, decode_media_frame, CodecKind, Envelope};
    use tokio_tungstenite::tungstenite::Message;

    fn pipeline(
        device: Option<ScriptedDevice>,
        preview: MemoryPreview,
        lane: MediaLane,
        sequence: bool,
    ) -> CapturePipeline {
        CapturePipeline::new(
            device.map(|d| Arc::new(d) as Arc<dyn MediaDevice>),
            Some(Box::new(preview)),
            MediaConfig::default(),
            codec_for(CodecKind::ByteArray),
            lane,
            sequence,
        )
    }

    fn chunks(sizes: &[usize]) -> Vec<Bytes> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, n)| Bytes::from(vec![i as u8; *n]))
            .collect()
    }

    #[tokio::test]
    async fn only_nonzero_chunks_are_sent_in_order() {
        let sizes = [1000, 0, 500, 0, 0, 20, 1, 0, 300, 7];
        let device = ScriptedDevice::new(chunks(&sizes));
        let mut capture = pipeline(Some(device), MemoryPreview::new(), MediaLane::Json, false);
        let (transport, mut wire) = TransportHandle::loopback(64);

        capture.start().await.unwrap();
        for _ in 0..sizes.len() {
            let chunk = capture.next_chunk().await.unwrap();
            capture.forward(chunk, &transport);
        }

        let mut sent = Vec::new();
        while let Ok(msg) = wire.try_recv() {
            let env = Envelope::parse(msg.to_text().unwrap()).unwrap();
            assert_eq!(env.path, "stream");
            assert!(env.seq.is_none());
            let bytes = decode_blob(&env);
            sent.push((bytes.len(), bytes.first().copied()));
        }

        let expected: Vec<(usize, Option<u8>)> = sizes
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(i, n)| (*n, Some(i as u8)))
            .collect();
        assert_eq!(sent, expected);

        let stats = capture.stats();
        assert_eq!(stats.chunks_produced, 10);
        assert_eq!(stats.empty_skipped, 4);
        assert_eq!(stats.chunks_sent, 6);
    }

    fn decode_blob(env: &Envelope) -> Bytes {
        codec_for(CodecKind::ByteArray)
            .decode_chunk(env.blob.as_ref().unwrap())
            .unwrap()
    }

    #[tokio::test]
    async fn device_failure_creates_no_session() {
        let preview = MemoryPreview::new();
        let device = ScriptedDevice::failing("permission denied");
        let mut capture = pipeline(Some(device), preview.clone(), MediaLane::Json, false);

        let err = capture.start().await.unwrap_err();
        assert_eq!(err.kind().as_str(), "DEVICE");
        assert!(!capture.is_active());
        assert!(preview.attached().is_none());
        assert_eq!(capture.stats().sessions, 0);
    }

    #[tokio::test]
    async fn missing_device_is_a_device_fault() {
        let mut capture = pipeline(None, MemoryPreview::new(), MediaLane::Json, false);
        let err = capture.start().await.unwrap_err();
        assert_eq!(err.kind().as_str(), "DEVICE");
    }

    #[tokio::test]
    async fn stop_releases_preview_and_handle() {
        let preview = MemoryPreview::new();
        let device = ScriptedDevice::new(chunks(&[3]));
        let mut capture = pipeline(Some(device.clone()), preview.clone(), MediaLane::Json, false);

        capture.start().await.unwrap();
        assert_eq!(preview.attached().as_deref(), Some("scripted-1"));
        // second start while running is ignored
        capture.start().await.unwrap();
        assert_eq!(device.acquisitions(), 1);

        assert!(capture.stop());
        assert!(!capture.is_active());
        assert_eq!(preview.pauses(), 1);
        assert_eq!(preview.rewinds(), 1);
        assert!(!capture.stop());

        capture.start().await.unwrap();
        assert_eq!(device.acquisitions(), 2);
        assert_eq!(capture.stats().sessions, 2);
    }

    #[tokio::test]
    async fn sequence_numbers_and_binary_lane() {
        let device = ScriptedDevice::new(chunks(&[2, 0, 3]));
        let mut capture = pipeline(Some(device), MemoryPreview::new(), MediaLane::Binary, true);
        let (transport, mut wire) = TransportHandle::loopback(8);

        capture.start().await.unwrap();
        for _ in 0..3 {
            let chunk = capture.next_chunk().await.unwrap();
            capture.forward(chunk, &transport);
        }

        let mut seqs = Vec::new();
        while let Ok(msg) = wire.try_recv() {
            let Message::Binary(raw) = msg else {
                panic!("expected binary frame");
            };
            let frame = decode_media_frame(raw).unwrap();
            assert_eq!(frame.kind, MediaKind::Stream);
            seqs.push((frame.seq, frame.payload.len()));
        }
        assert_eq!(seqs, vec![(Some(0), 2), (Some(1), 3)]);
    }

    #[tokio::test]
    async fn closed_transport_drops_chunks() {
        let device = ScriptedDevice::new(chunks(&[4, 4]));
        let mut capture = pipeline(Some(device), MemoryPreview::new(), MediaLane::Json, false);
        let (transport, mut wire) = TransportHandle::loopback(8);
        transport.mark_closed();

        capture.start().await.unwrap();
        for _ in 0..2 {
            let chunk = capture.next_chunk().await.unwrap();
            assert!(!capture.forward(chunk, &transport));
        }
        assert!(wire.try_recv().is_err());
        assert_eq!(capture.stats().chunks_dropped, 2);
    }
}

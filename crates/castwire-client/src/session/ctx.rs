use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use tokio::sync::Mutex;

use castwire_core::error::{CastwireError, Result};
use castwire_core::protocol::{ChunkCodec, Envelope};
use castwire_core::MediaConfig;

use crate::output::OutputLog;
use crate::playback::PlaybackBuffer;
use crate::presence::PresenceRegistry;
use crate::transport::TransportHandle;

/// Per-session context passed to handlers (borrow tools instead of owning).
#[derive(Clone)]
pub struct SessionCtx {
    transport: TransportHandle,
    output: Arc<OutputLog>,
    presence: Arc<PresenceRegistry>,
    playback: Option<Arc<Mutex<PlaybackBuffer>>>,
    codec: Arc<dyn ChunkCodec>,
    media: MediaConfig,
    announce_media: bool,
    remote_media: Arc<RwLock<Option<MediaConfig>>>,
}

impl SessionCtx {
    pub(crate) fn new(
        transport: TransportHandle,
        output: Arc<OutputLog>,
        presence: Arc<PresenceRegistry>,
        playback: Option<Arc<Mutex<PlaybackBuffer>>>,
        codec: Arc<dyn ChunkCodec>,
        media: MediaConfig,
        announce_media: bool,
    ) -> Self {
        Self {
            transport,
            output,
            presence,
            playback,
            codec,
            media,
            announce_media,
            remote_media: Arc::new(RwLock::new(None)),
        }
    }

    pub fn transport(&self) -> &TransportHandle {
        &self.transport
    }

    pub fn output(&self) -> &Arc<OutputLog> {
        &self.output
    }

    pub fn presence(&self) -> &Arc<PresenceRegistry> {
        &self.presence
    }

    pub fn playback(&self) -> Option<&Arc<Mutex<PlaybackBuffer>>> {
        self.playback.as_ref()
    }

    pub fn codec(&self) -> &Arc<dyn ChunkCodec> {
        &self.codec
    }

    /// Local media configuration (encoder and decoder side).
    pub fn media(&self) -> &MediaConfig {
        &self.media
    }

    pub fn announce_media(&self) -> bool {
        self.announce_media
    }

    /// Media configuration reported by the server, if it sent one.
    pub fn remote_media(&self) -> Option<MediaConfig> {
        self.remote_media
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_remote_media(&self, media: MediaConfig) {
        *self
            .remote_media
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(media);
    }

    /// Raw chunk bytes of a media envelope: binary-lane payload, else `data`, else `blob`.
    pub fn decode_chunk(&self, env: &Envelope) -> Result<Bytes> {
        if let Some(media) = &env.media {
            return Ok(media.clone());
        }
        let value = env
            .data
            .as_ref()
            .or(env.blob.as_ref())
            .ok_or_else(|| CastwireError::Decode(format!("{} carries no chunk", env.path)))?;
        self.codec.decode_chunk(value)
    }

    /// Context over a loopback transport, no playback.
    #[cfg(test)]
    pub(crate) fn detached() -> (
        Self,
        tokio::sync::mpsc::Receiver<tokio_tungstenite::tungstenite::Message>,
    ) {
        let (transport, wire) = TransportHandle::loopback(64);
        let ctx = Self::new(
            transport,
            Arc::new(OutputLog::new(64)),
            Arc::new(PresenceRegistry::new()),
            None,
            castwire_core::protocol::codec_for(Default::default()),
            MediaConfig::default(),
            false,
        );
        (ctx, wire)
    }

    #[cfg(test)]
    pub(crate) fn with_playback(mut self, playback: PlaybackBuffer) -> Self {
        self.playback = Some(Arc::new(Mutex::new(playback)));
        self
    }
}

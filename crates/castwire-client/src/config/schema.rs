use serde::Deserialize;

use castwire_core::error::{CastwireError, Result};
use castwire_core::protocol::CodecKind;
use castwire_core::MediaConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    #[serde(default)]
    pub transport: TransportSection,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub session: SessionSection,

    /// File-backed capture source for the headless binary.
    #[serde(default)]
    pub capture: Option<CaptureSection>,

    /// File-backed playback target; absent means no playback buffer.
    #[serde(default)]
    pub playback: Option<PlaybackSection>,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(CastwireError::UnsupportedVersion);
        }

        self.transport.validate()?;
        self.media.validate()?;
        self.session.validate()?;

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: 1,
            transport: TransportSection::default(),
            media: MediaConfig::default(),
            session: SessionSection::default(),
            capture: None,
            playback: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportSection {
    #[serde(default = "default_url")]
    pub url: String,

    /// Frames buffered in the socket writer before sends start dropping.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            outbound_queue: default_outbound_queue(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

impl TransportSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(CastwireError::Config(
                "transport.url must start with ws:// or wss://".into(),
            ));
        }
        if !(1..=65_536).contains(&self.outbound_queue) {
            return Err(CastwireError::Config(
                "transport.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        if self.max_message_bytes < 4096 {
            return Err(CastwireError::Config(
                "transport.max_message_bytes must be at least 4096".into(),
            ));
        }
        Ok(())
    }
}

fn default_url() -> String {
    "ws://127.0.0.1:8080/ws".into()
}
fn default_outbound_queue() -> usize {
    1024
}
fn default_max_message_bytes() -> usize {
    16 * 1024 * 1024
}

/// How media chunks travel over the socket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaLane {
    /// `stream` envelopes with an encoded `blob`.
    #[default]
    Json,
    /// Binary media frames.
    Binary,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    /// Output lines kept in memory; 0 keeps only the counter.
    #[serde(default = "default_output_capacity")]
    pub output_capacity: usize,

    #[serde(default)]
    pub codec: CodecKind,

    #[serde(default)]
    pub media_lane: MediaLane,

    /// Attach `seq` to outbound chunks and check it on inbound ones.
    #[serde(default)]
    pub chunk_sequence: bool,

    /// Send the media config to the server after `connected`.
    #[serde(default)]
    pub announce_media: bool,

    /// Commands buffered between handles and the session loop.
    #[serde(default = "default_command_queue")]
    pub command_queue: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            output_capacity: default_output_capacity(),
            codec: CodecKind::default(),
            media_lane: MediaLane::default(),
            chunk_sequence: false,
            announce_media: false,
            command_queue: default_command_queue(),
        }
    }
}

impl SessionSection {
    pub fn validate(&self) -> Result<()> {
        if self.output_capacity > 100_000 {
            return Err(CastwireError::Config(
                "session.output_capacity must be at most 100000".into(),
            ));
        }
        if !(1..=4096).contains(&self.command_queue) {
            return Err(CastwireError::Config(
                "session.command_queue must be between 1 and 4096".into(),
            ));
        }
        Ok(())
    }
}

fn default_output_capacity() -> usize {
    500
}
fn default_command_queue() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureSection {
    /// Pre-encoded media file replayed as if it came from the recorder.
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaybackSection {
    /// File receiving every appended chunk.
    pub sink: String,
}

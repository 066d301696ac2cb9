//! Media configuration shared by the capture encoder and the playback decoder.
//!
//! Both ends must use the same container/codec pair or the remote decode
//! stalls without an error, so the value travels as one object: it is read
//! from config, can be announced to the server, and can be compared against
//! what the server reports in its `connected` greeting.

use serde::{Deserialize, Serialize};

use crate::error::{CastwireError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Container + codecs, e.g. `video/webm; codecs="opus,vp8"`.
    #[serde(default = "default_mime")]
    pub mime: String,

    #[serde(default = "default_video_bps")]
    pub video_bits_per_second: u32,

    #[serde(default = "default_audio_bps")]
    pub audio_bits_per_second: u32,

    /// Recorder chunk interval.
    #[serde(default = "default_timeslice_ms")]
    pub timeslice_ms: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            mime: default_mime(),
            video_bits_per_second: default_video_bps(),
            audio_bits_per_second: default_audio_bps(),
            timeslice_ms: default_timeslice_ms(),
        }
    }
}

impl MediaConfig {
    pub fn validate(&self) -> Result<()> {
        if self.mime.trim().is_empty() {
            return Err(CastwireError::Config("media.mime must not be empty".into()));
        }
        if !(100..=60_000).contains(&self.timeslice_ms) {
            return Err(CastwireError::Config(
                "media.timeslice_ms must be between 100 and 60000".into(),
            ));
        }
        if self.video_bits_per_second == 0 && self.audio_bits_per_second == 0 {
            return Err(CastwireError::Config(
                "media bitrates must not both be zero".into(),
            ));
        }
        Ok(())
    }

    /// Encoder and decoder interoperate only when the container/codec pair is identical.
    pub fn is_compatible(&self, other: &MediaConfig) -> bool {
        self.mime == other.mime
    }

    /// Approximate encoded size of one chunk.
    pub fn bytes_per_chunk(&self) -> usize {
        let bits = (u64::from(self.video_bits_per_second) + u64::from(self.audio_bits_per_second))
            * self.timeslice_ms
            / 1000;
        usize::try_from(bits / 8).unwrap_or(usize::MAX)
    }
}

fn default_mime() -> String {
    r#"video/webm; codecs="opus,vp8""#.into()
}
fn default_video_bps() -> u32 {
    100_000
}
fn default_audio_bps() -> u32 {
    6_000
}
fn default_timeslice_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn defaults_match_the_relay_contract() {
        let cfg = MediaConfig::default();
        assert_eq!(cfg.mime, r#"video/webm; codecs="opus,vp8""#);
        assert_eq!(cfg.timeslice_ms, 1000);
        assert_eq!(cfg.bytes_per_chunk(), 13_250);
        cfg.validate().unwrap();
    }

    #[test]
    fn bitrate_changes_stay_compatible() {
        let a = MediaConfig::default();
        let b = MediaConfig {
            video_bits_per_second: 250_000,
            ..MediaConfig::default()
        };
        let c = MediaConfig {
            mime: r#"video/webm; codecs="vp9""#.into(),
            ..MediaConfig::default()
        };
        assert!(a.is_compatible(&b));
        assert!(!a.is_compatible(&c));
    }
}

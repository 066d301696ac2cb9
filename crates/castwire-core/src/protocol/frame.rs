//! Binary media lane.
//!
//! Layout: `v:u8 | kind:u8 | flags:u8 | [seq:u32 LE] | payload`. Decoding
//! reads through `Buf` after `remaining()` checks and never panics.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CastwireError, Result};
use crate::protocol::envelope::paths;

/// Frame flag: seq (u32) is present.
pub const FRAME_FLAG_SEQ_PRESENT: u8 = 0x01;

/// Current frame version.
pub const FRAME_VERSION: u8 = 1;

/// Which logical channel a media frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Client -> server capture chunk.
    Stream,
    /// Server -> client relayed chunk.
    StreamServer,
}

impl MediaKind {
    pub fn code(self) -> u8 {
        match self {
            MediaKind::Stream => 1,
            MediaKind::StreamServer => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(MediaKind::Stream),
            2 => Some(MediaKind::StreamServer),
            _ => None,
        }
    }

    /// Envelope path carrying the same chunk on the JSON lane.
    pub fn path(self) -> &'static str {
        match self {
            MediaKind::Stream => paths::STREAM,
            MediaKind::StreamServer => paths::STREAM_SERVER,
        }
    }
}

/// Parsed media frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFrame {
    pub kind: MediaKind,
    /// Optional chunk index.
    pub seq: Option<u32>,
    /// Encoded media (zero-copy).
    pub payload: Bytes,
}

/// Decode a media frame from bytes.
pub fn decode_media_frame(mut buf: Bytes) -> Result<MediaFrame> {
    // Minimum header: v, kind, flags
    if buf.remaining() < 3 {
        return Err(CastwireError::BadEnvelope("media frame too short".into()));
    }

    let v = buf.get_u8();
    if v != FRAME_VERSION {
        return Err(CastwireError::UnsupportedVersion);
    }

    let code = buf.get_u8();
    let kind = MediaKind::from_code(code)
        .ok_or_else(|| CastwireError::BadEnvelope(format!("unknown media kind: {code}")))?;
    let flags = buf.get_u8();

    let seq = if (flags & FRAME_FLAG_SEQ_PRESENT) != 0 {
        if buf.remaining() < 4 {
            return Err(CastwireError::BadEnvelope(
                "seq flag set but missing u32".into(),
            ));
        }
        Some(buf.get_u32_le())
    } else {
        None
    };

    let payload = buf.copy_to_bytes(buf.remaining());

    Ok(MediaFrame { kind, seq, payload })
}

/// Encode a media frame.
pub fn encode_media_frame(frame: &MediaFrame) -> Bytes {
    let mut out = BytesMut::with_capacity(7 + frame.payload.len());
    out.put_u8(FRAME_VERSION);
    out.put_u8(frame.kind.code());
    match frame.seq {
        Some(seq) => {
            out.put_u8(FRAME_FLAG_SEQ_PRESENT);
            out.put_u32_le(seq);
        }
        None => out.put_u8(0),
    }
    out.put_slice(&frame.payload);
    out.freeze()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn encoded_header_layout() {
        let frame = MediaFrame {
            kind: MediaKind::Stream,
            seq: Some(258),
            payload: Bytes::from_static(&[9, 9]),
        };
        let raw = encode_media_frame(&frame);
        assert_eq!(&raw[..], &[1, 1, 1, 2, 1, 0, 0, 9, 9]);
        assert_eq!(decode_media_frame(raw).unwrap(), frame);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = decode_media_frame(Bytes::from_static(&[1, 7, 0])).unwrap_err();
        assert_eq!(err.kind().as_str(), "BAD_ENVELOPE");
    }
}

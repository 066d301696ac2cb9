//! Protocol modules (JSON envelope + binary media frame).
//!
//! This module hosts the two wire formats that share one socket:
//! - Envelope: JSON text frames carrying a `path` selector and payload.
//! - Media frame: binary frames with a fixed header and optional sequence number.
//!
//! The chunk codec sits between them: it turns raw media bytes into the JSON
//! value carried by an envelope and back, so the encoding can change without
//! touching routing or playback.
//!
//! All parsers are panic-free: malformed input is reported as `CastwireError`.

pub mod codec;
pub mod envelope;
pub mod frame;

pub use codec::{codec_for, Base64Codec, ByteArrayCodec, ChunkCodec, CodecKind};
pub use envelope::{paths, DirectMessage, Envelope};
pub use frame::{decode_media_frame, encode_media_frame, MediaFrame, MediaKind};

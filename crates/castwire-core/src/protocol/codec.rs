//! Chunk codecs: raw media bytes <-> JSON value carried in an envelope.
//!
//! The default codec writes a plain array of byte values, which is what the
//! relay server expects. Base64 is offered for endpoints that accept it; both
//! ends must agree since nothing on the wire names the codec.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{CastwireError, Result};

/// Encoding used for media bytes inside JSON envelopes.
pub trait ChunkCodec: Send + Sync {
    fn name(&self) -> &'static str;
    fn encode_chunk(&self, chunk: &[u8]) -> Value;
    fn decode_chunk(&self, value: &Value) -> Result<Bytes>;
}

/// Codec selector (config-facing).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    #[default]
    ByteArray,
    Base64,
}

pub fn codec_for(kind: CodecKind) -> Arc<dyn ChunkCodec> {
    match kind {
        CodecKind::ByteArray => Arc::new(ByteArrayCodec),
        CodecKind::Base64 => Arc::new(Base64Codec),
    }
}

/// `[26, 69, 223, ...]`
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteArrayCodec;

impl ChunkCodec for ByteArrayCodec {
    fn name(&self) -> &'static str {
        "byte_array"
    }

    fn encode_chunk(&self, chunk: &[u8]) -> Value {
        Value::Array(chunk.iter().map(|b| Value::from(*b)).collect())
    }

    fn decode_chunk(&self, value: &Value) -> Result<Bytes> {
        let items = value
            .as_array()
            .ok_or_else(|| CastwireError::Decode("chunk must be an array of byte values".into()))?;

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let byte = item
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| CastwireError::Decode(format!("chunk[{i}] is not a byte: {item}")))?;
            out.push(byte);
        }
        Ok(Bytes::from(out))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Base64Codec;

impl ChunkCodec for Base64Codec {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn encode_chunk(&self, chunk: &[u8]) -> Value {
        Value::String(BASE64.encode(chunk))
    }

    fn decode_chunk(&self, value: &Value) -> Result<Bytes> {
        let s = value
            .as_str()
            .ok_or_else(|| CastwireError::Decode("chunk must be a base64 string".into()))?;
        BASE64
            .decode(s)
            .map(Bytes::from)
            .map_err(|e| CastwireError::Decode(format!("invalid base64 chunk: {e}")))
    }
}

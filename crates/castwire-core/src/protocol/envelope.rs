//! JSON envelope (text frame).
//!
//! `data` and `blob` are kept as `serde_json::Value`: their shape depends on
//! the path and the server may introduce new paths without a client schema.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CastwireError, Result};

/// Well-known path names.
pub mod paths {
    /// Server greeting after the upgrade.
    pub const CONNECTED: &str = "connected";
    /// Synthesized locally when the socket closes.
    pub const CLOSE: &str = "close";
    /// Server-pushed log line.
    pub const OUTPUT: &str = "output";
    /// Peer-list request (outbound) and snapshot (inbound).
    pub const CLIENTS: &str = "clients";
    /// Relayed media chunk from the server.
    pub const STREAM_SERVER: &str = "streamServer";
    /// Server clock request.
    pub const TIME: &str = "time";
    pub const FA: &str = "fa";
    /// Direct message to one peer.
    pub const TO_CLIENT: &str = "toclient";
    /// Captured media chunk.
    pub const STREAM: &str = "stream";
    /// Media configuration announce.
    pub const MEDIA: &str = "media";

    /// Paths only the client itself may raise. Wire envelopes carrying them are ignored.
    pub fn is_local(path: &str) -> bool {
        path == CLOSE
    }
}

/// One unit of wire exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Handler selector.
    pub path: String,
    /// Path-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Encoded media bytes (see `ChunkCodec`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<Value>,
    /// Chunk index, only present when sequencing is enabled on both ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// Raw media bytes when the chunk arrived on the binary lane.
    #[serde(skip)]
    pub media: Option<Bytes>,
}

impl Envelope {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_blob(mut self, blob: Value) -> Self {
        self.blob = Some(blob);
        self
    }

    pub fn with_seq(mut self, seq: Option<u64>) -> Self {
        self.seq = seq;
        self
    }

    /// Envelope for a chunk that arrived as a binary media frame.
    pub fn from_media(path: impl Into<String>, seq: Option<u64>, payload: Bytes) -> Self {
        Self {
            path: path.into(),
            seq,
            media: Some(payload),
            ..Self::default()
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| CastwireError::BadEnvelope(format!("invalid envelope json: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| CastwireError::Internal(format!("envelope encode failed: {e}")))
    }

    /// `data` as a string, if it is one.
    pub fn data_str(&self) -> Option<&str> {
        self.data.as_ref().and_then(Value::as_str)
    }

    /// `data` deserialized into a concrete payload type.
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let data = self
            .data
            .clone()
            .ok_or_else(|| CastwireError::BadEnvelope(format!("{} requires data", self.path)))?;
        serde_json::from_value(data)
            .map_err(|e| CastwireError::BadEnvelope(format!("{} invalid data: {e}", self.path)))
    }
}

/// Payload of a `toclient` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: String,
    pub message: String,
}

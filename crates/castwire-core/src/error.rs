//! Shared error type across castwire crates.

use thiserror::Error;

/// Fault taxonomy (stable, used in logs and output lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Socket closed, errored, or never opened.
    Transport,
    /// Local media acquisition was rejected.
    Device,
    /// A media chunk could not be decoded or appended.
    Decode,
    /// Malformed envelope or frame.
    BadEnvelope,
    /// Invalid configuration.
    Config,
    /// Unsupported protocol/config version.
    UnsupportedVersion,
    /// Internal failure (closed channel, io).
    Internal,
}

impl FaultKind {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            FaultKind::Transport => "TRANSPORT",
            FaultKind::Device => "DEVICE",
            FaultKind::Decode => "DECODE",
            FaultKind::BadEnvelope => "BAD_ENVELOPE",
            FaultKind::Config => "CONFIG",
            FaultKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            FaultKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, CastwireError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum CastwireError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("device: {0}")]
    Device(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("bad envelope: {0}")]
    BadEnvelope(String),
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl CastwireError {
    /// Map an error onto its fault class.
    pub fn kind(&self) -> FaultKind {
        match self {
            CastwireError::Transport(_) => FaultKind::Transport,
            CastwireError::Device(_) => FaultKind::Device,
            CastwireError::Decode(_) => FaultKind::Decode,
            CastwireError::BadEnvelope(_) => FaultKind::BadEnvelope,
            CastwireError::Config(_) => FaultKind::Config,
            CastwireError::UnsupportedVersion => FaultKind::UnsupportedVersion,
            CastwireError::Internal(_) => FaultKind::Internal,
        }
    }
}

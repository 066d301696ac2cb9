//! Transport layer (WebSocket client).
//!
//! Owns the single socket: a driver task splits it into a writer fed by
//! `TransportHandle` and a reader that decodes every frame once before the
//! session loop sees it.

pub mod codec;
pub mod ws;

pub use ws::{connect, from_stream, Transport, TransportEvent, TransportHandle};

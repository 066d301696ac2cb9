//! WebSocket transport.
//!
//! Responsibilities:
//! - Open one socket to the configured endpoint (no reconnect, ever)
//! - Writer: drain the outbound queue into the socket
//! - Reader: decode once, surface envelopes in delivery order
//! - Lifecycle: on close/error mark the handle closed and emit `Closed` exactly once
//!
//! Sends on a closed transport are no-ops. A full writer queue drops the
//! frame instead of blocking the caller.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use castwire_core::error::{CastwireError, Result};
use castwire_core::protocol::{Envelope, MediaFrame};

use crate::config::TransportSection;
use crate::transport::codec::{decode, encode_envelope, encode_frame, Inbound};

/// What the reader hands to the session loop.
#[derive(Debug)]
pub enum TransportEvent {
    Envelope(Envelope),
    Closed,
}

/// Cloneable send side of the socket.
#[derive(Clone)]
pub struct TransportHandle {
    tx: mpsc::Sender<Message>,
    open: Arc<AtomicBool>,
    sent: Arc<AtomicU64>,
}

impl TransportHandle {
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Serialize and send. Returns `false` when nothing was handed to the socket.
    pub fn send(&self, env: &Envelope) -> bool {
        if !self.is_open() {
            debug!(path = %env.path, "socket not open, envelope dropped");
            return false;
        }
        let msg = match encode_envelope(env) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %env.path, error = %e, "envelope encode failed");
                return false;
            }
        };
        debug!(path = %env.path, "send");
        self.push(msg)
    }

    /// Binary-lane counterpart of [`send`](Self::send).
    pub fn send_frame(&self, frame: &MediaFrame) -> bool {
        if !self.is_open() {
            debug!(path = frame.kind.path(), "socket not open, frame dropped");
            return false;
        }
        self.push(encode_frame(frame))
    }

    /// Frames handed to the socket writer so far.
    pub fn frames_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    fn push(&self, msg: Message) -> bool {
        match self.tx.try_send(msg) {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("socket writer queue full, frame dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.open.store(false, Ordering::Release);
                false
            }
        }
    }

    /// Handle whose frames land in the returned receiver instead of a socket.
    #[cfg(test)]
    pub(crate) fn loopback(queue: usize) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(queue);
        let handle = Self {
            tx,
            open: Arc::new(AtomicBool::new(true)),
            sent: Arc::new(AtomicU64::new(0)),
        };
        (handle, rx)
    }

    #[cfg(test)]
    pub(crate) fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }
}

/// Receive side of the socket.
pub struct Transport {
    events: mpsc::Receiver<TransportEvent>,
}

impl Transport {
    /// Next inbound event; `None` once `Closed` has been delivered.
    pub async fn next(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}

/// Open the socket described by `cfg`.
pub async fn connect(cfg: &TransportSection) -> Result<(TransportHandle, Transport)> {
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(cfg.max_message_bytes);

    let (ws, _) =
        tokio_tungstenite::connect_async_with_config(cfg.url.as_str(), Some(ws_config), false)
            .await
            .map_err(|e| CastwireError::Transport(format!("connect {} failed: {e}", cfg.url)))?;

    info!(url = %cfg.url, "socket open");
    Ok(from_stream(ws, cfg.outbound_queue))
}

/// Adopt an already-upgraded socket.
pub fn from_stream<S>(stream: S, queue: usize) -> (TransportHandle, Transport)
where
    S: Stream<Item = std::result::Result<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Send
        + Unpin
        + 'static,
{
    let (out_tx, out_rx) = mpsc::channel::<Message>(queue.max(1));
    let (ev_tx, ev_rx) = mpsc::channel::<TransportEvent>(queue.max(1));
    let open = Arc::new(AtomicBool::new(true));

    tokio::spawn(drive(stream, out_rx, ev_tx, Arc::clone(&open)));

    let handle = TransportHandle {
        tx: out_tx,
        open,
        sent: Arc::new(AtomicU64::new(0)),
    };
    (handle, Transport { events: ev_rx })
}

async fn drive<S>(
    stream: S,
    mut out_rx: mpsc::Receiver<Message>,
    ev_tx: mpsc::Sender<TransportEvent>,
    open: Arc<AtomicBool>,
) where
    S: Stream<Item = std::result::Result<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Send
        + Unpin
        + 'static,
{
    let (mut ws_tx, mut ws_rx) = stream.split();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                match maybe_out {
                    Some(m) => {
                        if let Err(e) = ws_tx.send(m).await {
                            warn!(error = %e, "socket write failed");
                            break;
                        }
                    }
                    None => {
                        // every handle dropped: the session is gone
                        let _ = ws_tx.close().await;
                        break;
                    }
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let msg = match incoming {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!(error = %e, "socket read failed");
                        break;
                    }
                    None => break,
                };

                let env = match decode(msg) {
                    Ok(Inbound::Envelope { env, bytes_len }) => {
                        debug!(path = %env.path, bytes_len, "recv");
                        env
                    }
                    Ok(Inbound::Media { frame, bytes_len }) => {
                        debug!(path = frame.kind.path(), bytes_len, "recv media frame");
                        Envelope::from_media(frame.kind.path(), frame.seq.map(u64::from), frame.payload)
                    }
                    Ok(Inbound::Control) => continue,
                    Ok(Inbound::Close) => break,
                    Err(e) => {
                        warn!(error = %e, kind = e.kind().as_str(), "undecodable frame discarded");
                        continue;
                    }
                };

                if ev_tx.send(TransportEvent::Envelope(env)).await.is_err() {
                    break;
                }
            }
        }
    }

    open.store(false, Ordering::Release);
    info!("socket closed");
    let _ = ev_tx.send(TransportEvent::Closed).await;
}

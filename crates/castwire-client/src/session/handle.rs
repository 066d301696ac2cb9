use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use castwire_core::error::{CastwireError, Result};
use castwire_core::protocol::{paths, Envelope};

use crate::capture::CaptureStats;
use crate::output::OutputLog;
use crate::playback::PlaybackStats;
use crate::presence::{PeerTarget, PresenceRegistry, DEFAULT_GREETING};
use crate::session::SessionCtx;

/// Work requested from outside the session loop.
pub enum SessionCommand {
    Send(Envelope),
    ToPeer {
        target: PeerTarget,
        message: String,
        reply: oneshot::Sender<Result<bool>>,
    },
    StartCapture {
        reply: oneshot::Sender<Result<()>>,
    },
    StopCapture {
        reply: oneshot::Sender<bool>,
    },
    CaptureStats {
        reply: oneshot::Sender<CaptureStats>,
    },
}

/// What the UI holds: user actions in, session state out.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    ctx: SessionCtx,
}

impl SessionHandle {
    pub(crate) fn new(tx: mpsc::Sender<SessionCommand>, ctx: SessionCtx) -> Self {
        Self { tx, ctx }
    }

    pub async fn time(&self) -> Result<()> {
        self.send(Envelope::new(paths::TIME)).await
    }

    pub async fn fa(&self) -> Result<()> {
        self.send(Envelope::new(paths::FA)).await
    }

    /// Ask the server for a fresh peer list.
    pub async fn request_clients(&self) -> Result<()> {
        self.send(Envelope::new(paths::CLIENTS)).await
    }

    /// Queue any envelope for sending.
    pub async fn send(&self, env: Envelope) -> Result<()> {
        self.command(SessionCommand::Send(env)).await
    }

    /// Direct message to a peer from the current snapshot.
    /// `Ok(false)`: accepted but the socket was not open.
    pub async fn send_to_peer(&self, target: &PeerTarget, message: Option<&str>) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.command(SessionCommand::ToPeer {
            target: target.clone(),
            message: message.unwrap_or(DEFAULT_GREETING).to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| session_gone())?
    }

    pub async fn start_capture(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.command(SessionCommand::StartCapture { reply }).await?;
        rx.await.map_err(|_| session_gone())?
    }

    /// `false` when no capture was running.
    pub async fn stop_capture(&self) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.command(SessionCommand::StopCapture { reply }).await?;
        rx.await.map_err(|_| session_gone())
    }

    pub async fn capture_stats(&self) -> Result<CaptureStats> {
        let (reply, rx) = oneshot::channel();
        self.command(SessionCommand::CaptureStats { reply }).await?;
        rx.await.map_err(|_| session_gone())
    }

    pub async fn playback_stats(&self) -> Option<PlaybackStats> {
        match self.ctx.playback() {
            Some(pb) => Some(pb.lock().await.stats()),
            None => None,
        }
    }

    pub fn presence(&self) -> Arc<PresenceRegistry> {
        Arc::clone(self.ctx.presence())
    }

    pub fn output(&self) -> Arc<OutputLog> {
        Arc::clone(self.ctx.output())
    }

    pub fn is_connected(&self) -> bool {
        self.ctx.transport().is_open()
    }

    pub fn frames_sent(&self) -> u64 {
        self.ctx.transport().frames_sent()
    }

    pub fn ctx(&self) -> &SessionCtx {
        &self.ctx
    }

    async fn command(&self, cmd: SessionCommand) -> Result<()> {
        self.tx.send(cmd).await.map_err(|_| session_gone())
    }
}

fn session_gone() -> CastwireError {
    CastwireError::Internal("session loop has ended".into())
}

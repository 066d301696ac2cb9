//! Session runtime.
//!
//! One task owns the router, the capture pipeline and the receive side of the
//! transport, and runs every piece of work (inbound envelope, command, capture
//! chunk) to completion before taking the next. Handlers therefore never
//! overlap and see inbound envelopes in delivery order.

mod ctx;
mod handle;

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, trace, warn};

use castwire_core::error::Result;
use castwire_core::protocol::{codec_for, paths, Envelope};

use crate::capture::{CapturePipeline, MediaDevice, Preview};
use crate::config::ClientConfig;
use crate::dispatch::Router;
use crate::output::OutputLog;
use crate::playback::PlaybackBuffer;
use crate::presence::PresenceRegistry;
use crate::services;
use crate::transport::{self, Transport, TransportEvent, TransportHandle};

pub use ctx::SessionCtx;
pub use handle::{SessionCommand, SessionHandle};

/// Local media plumbing handed to the session. Every part is optional.
#[derive(Default)]
pub struct MediaBackends {
    pub device: Option<Arc<dyn MediaDevice>>,
    pub preview: Option<Box<dyn Preview>>,
    pub playback: Option<PlaybackBuffer>,
}

pub struct Session {
    ctx: SessionCtx,
    router: Router,
    transport: Transport,
    capture: CapturePipeline,
    commands: mpsc::Receiver<SessionCommand>,
    closed: bool,
}

impl Session {
    /// Open the socket and build the session around it.
    pub async fn connect(
        cfg: &ClientConfig,
        backends: MediaBackends,
    ) -> Result<(Session, SessionHandle)> {
        let (handle, transport) = transport::connect(&cfg.transport).await?;
        Ok(Self::new(cfg, handle, transport, backends))
    }

    /// Build a session over an already-open transport.
    pub fn new(
        cfg: &ClientConfig,
        transport_handle: TransportHandle,
        transport: Transport,
        backends: MediaBackends,
    ) -> (Session, SessionHandle) {
        let output = Arc::new(OutputLog::new(cfg.session.output_capacity));
        let codec = codec_for(cfg.session.codec);

        let playback = backends.playback.map(|mut pb| {
            if let Err(e) = pb.on_source_open(&cfg.media.mime) {
                error!(error = %e, mime = %cfg.media.mime, "source buffer unavailable");
                output.push(format!("playback unavailable: {e}"));
            }
            Arc::new(Mutex::new(pb))
        });

        let ctx = SessionCtx::new(
            transport_handle,
            output,
            Arc::new(PresenceRegistry::new()),
            playback,
            Arc::clone(&codec),
            cfg.media.clone(),
            cfg.session.announce_media,
        );

        let router = Router::new();
        services::register_builtin(&router);

        let capture = CapturePipeline::new(
            backends.device,
            backends.preview,
            cfg.media.clone(),
            codec,
            cfg.session.media_lane,
            cfg.session.chunk_sequence,
        );

        let (tx, commands) = mpsc::channel(cfg.session.command_queue);
        let handle = SessionHandle::new(tx, ctx.clone());

        let session = Session {
            ctx,
            router,
            transport,
            capture,
            commands,
            closed: false,
        };
        (session, handle)
    }

    /// Register extra paths before `run`.
    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn ctx(&self) -> &SessionCtx {
        &self.ctx
    }

    /// Event loop. Ends when every `SessionHandle` has been dropped.
    pub async fn run(mut self) {
        info!(paths = ?self.router.registered_paths(), "session started");

        loop {
            tokio::select! {
                ev = self.transport.next(), if !self.closed => {
                    match ev {
                        Some(TransportEvent::Envelope(env)) => {
                            let path = env.path.clone();
                            let res = self.router.dispatch(&self.ctx, env).await;
                            report(&path, res);
                        }
                        Some(TransportEvent::Closed) | None => {
                            self.closed = true;
                            let res = self
                                .router
                                .dispatch_local(&self.ctx, Envelope::new(paths::CLOSE))
                                .await;
                            report(paths::CLOSE, res);
                        }
                    }
                }

                cmd = self.commands.recv() => {
                    match cmd {
                        Some(cmd) => self.apply(cmd).await,
                        None => break,
                    }
                }

                chunk = self.capture.next_chunk() => {
                    match chunk {
                        Some(chunk) => {
                            self.capture.forward(chunk, self.ctx.transport());
                        }
                        None => {
                            info!("recorder ended");
                            self.capture.stop();
                        }
                    }
                }
            }
        }

        self.capture.stop();
        info!("session ended");
    }

    async fn apply(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Send(env) => {
                self.ctx.transport().send(&env);
            }
            SessionCommand::ToPeer {
                target,
                message,
                reply,
            } => {
                let res = self
                    .ctx
                    .presence()
                    .direct_message(&target, &message)
                    .map(|env| self.ctx.transport().send(&env));
                let _ = reply.send(res);
            }
            SessionCommand::StartCapture { reply } => {
                let res = self.capture.start().await;
                let _ = reply.send(res);
            }
            SessionCommand::StopCapture { reply } => {
                let stopped = self.capture.stop();
                if let Some(playback) = self.ctx.playback() {
                    playback.lock().await.stop();
                }
                let _ = reply.send(stopped);
            }
            SessionCommand::CaptureStats { reply } => {
                let _ = reply.send(self.capture.stats());
            }
        }
    }
}

fn report(path: &str, res: Result<bool>) {
    match res {
        Ok(true) => {}
        Ok(false) => trace!(path = %path, "unhandled path"),
        Err(e) => warn!(path = %path, kind = e.kind().as_str(), error = %e, "handler failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::protocol::Role;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::WebSocketStream;

    use crate::capture::memory::{MemoryPreview, ScriptedDevice};

    async fn over_duplex(
        backends: MediaBackends,
    ) -> (Session, SessionHandle, WebSocketStream<tokio::io::DuplexStream>) {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let (transport_handle, transport) = transport::from_stream(client, 16);
        let (session, handle) =
            Session::new(&ClientConfig::default(), transport_handle, transport, backends);
        (session, handle, server)
    }

    async fn wait_for(output: &OutputLog, needle: &str) {
        for _ in 0..500 {
            if output.contains(needle) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no output line containing {needle:?}: {:?}", output.lines());
    }

    #[tokio::test]
    async fn run_is_spawnable_with_capture_backends() {
        let backends = MediaBackends {
            device: Some(Arc::new(ScriptedDevice::new(vec![bytes::Bytes::from_static(b"x")]))),
            preview: Some(Box::new(MemoryPreview::new())),
            playback: None,
        };
        let (session, handle, _server) = over_duplex(backends).await;
        let task = tokio::spawn(session.run());

        handle.start_capture().await.unwrap();
        assert!(handle.stop_capture().await.unwrap());

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn wire_close_envelope_does_not_mask_the_socket_close() {
        let (session, handle, mut server) = over_duplex(MediaBackends::default()).await;
        tokio::spawn(session.run());
        let output = handle.output();

        server
            .send(Message::text(r#"{"path":"close"}"#.to_string()))
            .await
            .unwrap();
        server
            .send(Message::text(r#"{"path":"output","data":"marker"}"#.to_string()))
            .await
            .unwrap();
        wait_for(&output, "marker").await;
        assert!(!output.contains("Web Socket closed"));
        assert!(handle.is_connected());

        let _ = server.close(None).await;
        wait_for(&output, "Web Socket closed").await;
        assert!(!handle.is_connected());
        assert_eq!(output.lines(), vec!["2.  Web Socket closed", "1.  marker"]);
    }
}

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{info, warn};

use castwire_core::error::{CastwireError, Result};
use castwire_core::protocol::{paths, Envelope};
use castwire_core::MediaConfig;

use crate::dispatch::PathHandler;
use crate::session::SessionCtx;

/// Server greeting. May carry the server's media configuration under `data.media`.
pub struct ConnectedHandler;

#[async_trait]
impl PathHandler for ConnectedHandler {
    fn path(&self) -> &str {
        paths::CONNECTED
    }

    async fn handle(&self, ctx: &SessionCtx, env: Envelope) -> Result<()> {
        ctx.output().push("Web Socket connected");
        info!("Web Socket connected");

        if let Some(raw) = env.data.as_ref().and_then(|d| d.get("media")) {
            match serde_json::from_value::<MediaConfig>(raw.clone()) {
                Ok(remote) => {
                    if !ctx.media().is_compatible(&remote) {
                        warn!(local = %ctx.media().mime, remote = %remote.mime, "media config mismatch");
                        ctx.output().push(format!(
                            "media mismatch: server uses {}, client uses {}",
                            remote.mime,
                            ctx.media().mime
                        ));
                    }
                    ctx.set_remote_media(remote);
                }
                Err(e) => warn!(error = %e, "ignoring malformed media config in greeting"),
            }
        }

        if ctx.announce_media() {
            let data = serde_json::to_value(ctx.media())
                .map_err(|e| CastwireError::Internal(format!("media config encode failed: {e}")))?;
            ctx.transport().send(&Envelope::new(paths::MEDIA).with_data(data));
        }
        Ok(())
    }
}

/// Socket closed. Raised by the session, never by the wire; fires once per session.
pub struct CloseHandler {
    fired: AtomicBool,
}

impl CloseHandler {
    pub fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }
}

impl Default for CloseHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PathHandler for CloseHandler {
    fn path(&self) -> &str {
        paths::CLOSE
    }

    async fn handle(&self, ctx: &SessionCtx, _env: Envelope) -> Result<()> {
        if self.fired.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        ctx.output().push("Web Socket closed");
        info!("Web Socket closed");
        Ok(())
    }
}

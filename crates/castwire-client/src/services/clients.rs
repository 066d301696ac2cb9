use async_trait::async_trait;
use tracing::debug;

use castwire_core::error::Result;
use castwire_core::protocol::{paths, Envelope};

use crate::dispatch::PathHandler;
use crate::session::SessionCtx;

/// Full peer-list snapshot: replaces the registry and lists every peer.
pub struct ClientsHandler;

#[async_trait]
impl PathHandler for ClientsHandler {
    fn path(&self) -> &str {
        paths::CLIENTS
    }

    async fn handle(&self, ctx: &SessionCtx, env: Envelope) -> Result<()> {
        let ids: Vec<String> = env.data_as()?;
        let targets = ctx.presence().replace(ids);
        debug!(peers = targets.len(), "presence replaced");

        for t in &targets {
            ctx.output().push_raw(format!("client {}: {}", t.index + 1, t.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn snapshot_replaces_and_lists() {
        let (ctx, _wire) = SessionCtx::detached();
        let first = Envelope::new("clients").with_data(json!(["a", "b"]));
        let second = Envelope::new("clients").with_data(json!(["peer-1", "peer-2"]));
        ClientsHandler.handle(&ctx, first).await.unwrap();
        ClientsHandler.handle(&ctx, second).await.unwrap();

        assert_eq!(ctx.presence().ids(), vec!["peer-1", "peer-2"]);
        assert_eq!(ctx.output().lines()[..2], ["client 2: peer-2", "client 1: peer-1"]);
        // listing peers is not a numbered event
        assert_eq!(ctx.output().counter(), 0);
    }

    #[tokio::test]
    async fn malformed_snapshot_keeps_previous_list() {
        let (ctx, _wire) = SessionCtx::detached();
        ClientsHandler
            .handle(&ctx, Envelope::new("clients").with_data(json!(["a"])))
            .await
            .unwrap();
        let err = ClientsHandler
            .handle(&ctx, Envelope::new("clients").with_data(json!({"not": "a list"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind().as_str(), "BAD_ENVELOPE");
        assert_eq!(ctx.presence().ids(), vec!["a"]);
    }
}

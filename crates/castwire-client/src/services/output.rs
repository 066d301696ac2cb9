use async_trait::async_trait;

use castwire_core::error::Result;
use castwire_core::protocol::{paths, Envelope};

use crate::dispatch::PathHandler;
use crate::session::SessionCtx;

/// Server-pushed log line (replies to `time`, `fa`, direct messages, ...).
pub struct OutputHandler;

#[async_trait]
impl PathHandler for OutputHandler {
    fn path(&self) -> &str {
        paths::OUTPUT
    }

    async fn handle(&self, ctx: &SessionCtx, env: Envelope) -> Result<()> {
        match &env.data {
            Some(serde_json::Value::String(s)) => ctx.output().push(s),
            Some(other) => ctx.output().push(other.to_string()),
            None => ctx.output().push(""),
        };
        Ok(())
    }
}

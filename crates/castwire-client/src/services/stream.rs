use async_trait::async_trait;
use tracing::trace;

use castwire_core::error::Result;
use castwire_core::protocol::{paths, Envelope};

use crate::dispatch::PathHandler;
use crate::session::SessionCtx;

/// Relayed media chunk -> playback buffer.
pub struct StreamServerHandler;

#[async_trait]
impl PathHandler for StreamServerHandler {
    fn path(&self) -> &str {
        paths::STREAM_SERVER
    }

    async fn handle(&self, ctx: &SessionCtx, env: Envelope) -> Result<()> {
        let Some(playback) = ctx.playback() else {
            trace!("no playback target, chunk ignored");
            return Ok(());
        };

        let appended = {
            let mut playback = playback.lock().await;
            match ctx.decode_chunk(&env) {
                Ok(chunk) => playback.append(chunk, env.seq).await,
                Err(e) => {
                    playback.record_decode_fault(&e);
                    Err(e)
                }
            }
        };

        if let Err(e) = appended {
            ctx.output().push(format!("playback stalled: {e}"));
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::memory::{MemoryElement, MemorySource};
    use crate::playback::PlaybackBuffer;
    use castwire_core::protocol::{codec_for, CodecKind};
    use serde_json::json;

    fn ctx_with_playback() -> (SessionCtx, MemoryElement, MemorySource) {
        let element = MemoryElement::new();
        let source = MemorySource::new();
        let mut pb = PlaybackBuffer::new(Box::new(element.clone()), Box::new(source.clone()));
        pb.on_source_open("video/webm").unwrap();
        let (ctx, _wire) = SessionCtx::detached();
        (ctx.with_playback(pb), element, source)
    }

    #[tokio::test]
    async fn capture_encoding_round_trips_into_playback() {
        let (ctx, element, source) = ctx_with_playback();
        let raw: Vec<u8> = (0..=255u8).rev().collect();
        let wire = codec_for(CodecKind::ByteArray).encode_chunk(&raw);

        let env = Envelope::new("streamServer").with_data(wire);
        StreamServerHandler.handle(&ctx, env).await.unwrap();

        assert_eq!(source.data(), raw);
        assert!(!element.is_paused_now());
    }

    #[tokio::test]
    async fn undecodable_chunk_surfaces_on_output() {
        let (ctx, element, source) = ctx_with_playback();
        let env = Envelope::new("streamServer").with_data(json!([1, 2, 300]));

        let err = StreamServerHandler.handle(&ctx, env).await.unwrap_err();
        assert_eq!(err.kind().as_str(), "DECODE");
        assert!(ctx.output().lines()[0].starts_with("1.  playback stalled"));
        assert!(source.data().is_empty());
        assert!(element.is_paused_now());

        let stats = ctx.playback().unwrap().lock().await.stats();
        assert_eq!(stats.decode_faults, 1);
        assert_eq!(stats.appended_chunks, 0);
    }

    #[tokio::test]
    async fn without_playback_chunks_are_ignored() {
        let (ctx, _wire) = SessionCtx::detached();
        let env = Envelope::new("streamServer").with_data(json!([1, 2, 3]));
        StreamServerHandler.handle(&ctx, env).await.unwrap();
        assert_eq!(ctx.output().counter(), 0);
    }
}

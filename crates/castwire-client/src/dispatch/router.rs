use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, trace};

use castwire_core::error::Result;
use castwire_core::protocol::{paths, Envelope};

use crate::session::SessionCtx;

/// Handler bound to one envelope path.
#[async_trait]
pub trait PathHandler: Send + Sync {
    fn path(&self) -> &str;
    async fn handle(&self, ctx: &SessionCtx, env: Envelope) -> Result<()>;
}

/// Path -> handler table, owned by the session and populated at construction.
#[derive(Default)]
pub struct Router {
    handlers: DashMap<String, Arc<dyn PathHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Bind `handler` to its path, returning the handler it replaced.
    pub fn register(&self, handler: Arc<dyn PathHandler>) -> Option<Arc<dyn PathHandler>> {
        self.handlers.insert(handler.path().to_string(), handler)
    }

    pub fn registered_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Run the handler for an inbound wire envelope to completion.
    /// Returns `false` without side effects when nothing is bound to the path
    /// or the path is reserved for local lifecycle events.
    pub async fn dispatch(&self, ctx: &SessionCtx, env: Envelope) -> Result<bool> {
        if paths::is_local(&env.path) {
            debug!(path = %env.path, "local-only path received from the wire, ignored");
            return Ok(false);
        }
        self.dispatch_local(ctx, env).await
    }

    /// Run a handler for an event raised by the session itself (socket close).
    pub async fn dispatch_local(&self, ctx: &SessionCtx, env: Envelope) -> Result<bool> {
        let Some(handler) = self.handlers.get(env.path.as_str()).map(|e| e.value().clone()) else {
            trace!(path = %env.path, "no handler");
            return Ok(false);
        };
        handler.handle(ctx, env).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        path: &'static str,
        hits: AtomicUsize,
    }

    impl Counting {
        fn new(path: &'static str) -> Arc<Self> {
            Arc::new(Self {
                path,
                hits: AtomicUsize::new(0),
            })
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PathHandler for Counting {
        fn path(&self) -> &str {
            self.path
        }

        async fn handle(&self, _ctx: &SessionCtx, _env: Envelope) -> Result<()> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn registered_path_hits_exactly_its_handler() {
        let (ctx, _wire) = SessionCtx::detached();
        let router = Router::new();
        let clients = Counting::new("clients");
        let stream = Counting::new("streamServer");
        router.register(clients.clone());
        router.register(stream.clone());

        assert!(router.dispatch(&ctx, Envelope::new("clients")).await.unwrap());
        assert_eq!((clients.hits(), stream.hits()), (1, 0));

        assert!(router.dispatch(&ctx, Envelope::new("streamServer")).await.unwrap());
        assert_eq!((clients.hits(), stream.hits()), (1, 1));
    }

    #[tokio::test]
    async fn unknown_path_is_ignored() {
        let (ctx, _wire) = SessionCtx::detached();
        let router = Router::new();
        let clients = Counting::new("clients");
        router.register(clients.clone());

        assert!(!router.dispatch(&ctx, Envelope::new("Clients")).await.unwrap());
        assert!(!router.dispatch(&ctx, Envelope::new("")).await.unwrap());
        assert_eq!(clients.hits(), 0);
    }

    #[tokio::test]
    async fn re_registering_replaces() {
        let (ctx, _wire) = SessionCtx::detached();
        let router = Router::new();
        let first = Counting::new("time");
        let second = Counting::new("time");
        assert!(router.register(first.clone()).is_none());
        assert!(router.register(second.clone()).is_some());

        router.dispatch(&ctx, Envelope::new("time")).await.unwrap();
        assert_eq!((first.hits(), second.hits()), (0, 1));
        assert_eq!(router.registered_paths(), vec!["time"]);
    }

    #[tokio::test]
    async fn close_only_reachable_from_the_session() {
        let (ctx, _wire) = SessionCtx::detached();
        let router = Router::new();
        let close = Counting::new("close");
        router.register(close.clone());

        assert!(!router.dispatch(&ctx, Envelope::new("close")).await.unwrap());
        assert_eq!(close.hits(), 0);

        assert!(router.dispatch_local(&ctx, Envelope::new("close")).await.unwrap());
        assert_eq!(close.hits(), 1);
    }
}

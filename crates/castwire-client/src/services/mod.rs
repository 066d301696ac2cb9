//! Built-in path handlers.

mod clients;
mod connection;
mod output;
mod stream;

use std::sync::Arc;

use crate::dispatch::Router;

pub use clients::ClientsHandler;
pub use connection::{CloseHandler, ConnectedHandler};
pub use output::OutputHandler;
pub use stream::StreamServerHandler;

/// Bind `connected`, `close`, `output`, `clients` and `streamServer`.
pub fn register_builtin(router: &Router) {
    router.register(Arc::new(ConnectedHandler));
    router.register(Arc::new(CloseHandler::new()));
    router.register(Arc::new(OutputHandler));
    router.register(Arc::new(ClientsHandler));
    router.register(Arc::new(StreamServerHandler));
}

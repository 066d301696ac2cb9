//! castwire session client.
//!
//! This crate wires the transport, router, presence registry, capture
//! pipeline, and playback buffer into one session that runs on a single task.
//! It is consumed by the `castwire-client` binary and by integration tests.

pub mod capture;
pub mod config;
pub mod dispatch;
pub mod output;
pub mod playback;
pub mod presence;
pub mod services;
pub mod session;
pub mod transport;

pub use session::{MediaBackends, Session, SessionCtx, SessionHandle};

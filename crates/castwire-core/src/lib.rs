//! castwire core: transport-agnostic protocol primitives, error types, and the
//! media configuration value object.
//!
//! This crate defines the wire-level contracts shared by the session client and
//! any endpoint that speaks the same envelope format. It carries no socket or
//! runtime dependencies so it can be reused on either side of the connection.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `CastwireError`/`Result` so a malformed frame
//! from the server never takes the client down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod media;
pub mod protocol;

/// Shared result type.
pub use error::{CastwireError, FaultKind, Result};
pub use media::MediaConfig;

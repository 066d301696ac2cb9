//! Dispatch module exports.
//!
//! Re-exports the path router and the handler trait so downstream consumers
//! can register their own paths.

pub mod router;

pub use router::{PathHandler, Router};

//! Top-level facade crate for castwire.
//!
//! Re-exports the protocol core and the session client so users can depend on a single crate.

pub mod core {
    pub use castwire_core::*;
}

pub mod client {
    pub use castwire_client::*;
}

//! Keeps the wallet on the network the toolkit needs.
//!
//! [`NetworkBootstrap::ensure_chain`] asks the wallet to switch to a chain
//! and, when the wallet does not know that chain, registers it once and
//! lets the wallet switch to it. [`ensure_active_chain`] skips the whole
//! handshake when the wallet already reports the right chain.

pub mod bootstrap;
pub mod verify;

pub use bootstrap::*;
pub use verify::*;

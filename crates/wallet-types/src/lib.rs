//! Shared types for the wallet toolkit.
//!
//! Everything in here is transient: chain descriptors, the RPC calls issued
//! against a wallet, the outcome of a network switch and the error taxonomy
//! every other crate reports through.

pub mod chain;
pub mod errors;
pub mod outcome;
pub mod rpc;

pub use chain::*;
pub use errors::*;
pub use outcome::*;
pub use rpc::*;

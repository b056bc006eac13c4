//! Wallet backends.
//!
//! Available implementations:
//! - `http`: forwards requests as JSON-RPC over HTTP (wallet proxy or dev node)
//! - `memory`: deterministic in-process wallet simulator

pub mod http;
pub mod memory;

pub use http::*;
pub use memory::*;

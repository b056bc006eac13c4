//! Wallet provider abstraction.
//!
//! Wallets come in two incompatible calling conventions: a modern unary
//! `request(call)` and an older callback-style `send(method, params, cb)`.
//! [`WalletHandle`] exposes whichever capability a wallet has and
//! [`invoke`] turns both into one async call returning `Result<Value>`.
//!
//! # Components
//!
//! - `handle`: capability traits implemented by wallet backends
//! - `adapter`: the single call entry point used by every caller
//! - `detection`: picking a wallet out of the injected environment
//! - `implementations`: HTTP and in-memory wallet backends

pub mod adapter;
pub mod detection;
pub mod handle;
pub mod implementations;

pub use adapter::*;
pub use detection::*;
pub use handle::*;

//! Library side of the `gm-wallet` binary.
//!
//! - `wallets`: builds the injected wallet environment from configuration
//! - `session`: connected-wallet state and the message transaction flow
//! - `receipt`: the summary shown after a send
//! - `board`: read-only queries against the message contract
//! - `transfer`: value transfer signed with a local private key

pub mod board;
pub mod receipt;
pub mod session;
pub mod transfer;
pub mod wallets;

pub use receipt::MessageReceipt;
pub use session::{SessionError, WalletSession};

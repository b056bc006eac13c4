//! Capability traits a wallet handle can expose.

use async_trait::async_trait;
use serde_json::Value;
use wallet_types::{ProviderRpcError, Result, RpcCall};

/// Modern calling convention: one async request per call.
#[async_trait]
pub trait RequestCapability: Send + Sync {
	async fn request(&self, call: &RpcCall) -> Result<Value>;
}

/// Completion callback handed to a legacy `send`.
pub type LegacyCallback = Box<dyn FnOnce(std::result::Result<Value, ProviderRpcError>) + Send>;

/// Legacy calling convention: `send(method, params, callback)`.
///
/// Implementations may invoke the callback immediately or later from
/// another task, but at most once.
pub trait LegacyCapability: Send + Sync {
	fn send(&self, method: &str, params: Value, callback: LegacyCallback);
}

/// A wallet as supplied by the host environment.
///
/// A handle exposes the modern capability, the legacy one, or neither.
/// When both are present the modern one is used.
pub trait WalletHandle: Send + Sync {
	/// Name used in logs.
	fn name(&self) -> &str {
		"wallet"
	}

	fn request_capability(&self) -> Option<&dyn RequestCapability> {
		None
	}

	fn legacy_capability(&self) -> Option<&dyn LegacyCapability> {
		None
	}
}

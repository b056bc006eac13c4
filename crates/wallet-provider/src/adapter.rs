//! Single entry point for talking to a wallet.

use crate::handle::{LegacyCapability, WalletHandle};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;
use wallet_types::{ProviderRpcError, Result, RpcCall, WalletError};

/// Issues `call` against `handle`, whichever calling convention it speaks.
///
/// Results and rejections of the modern capability are returned unchanged.
/// Legacy callback errors come back as [`WalletError::LegacyBridge`]. The
/// call is issued exactly once; retrying is up to the caller.
pub async fn invoke(handle: Option<&dyn WalletHandle>, call: &RpcCall) -> Result<Value> {
	let handle = handle.ok_or(WalletError::NoProvider)?;

	if let Some(modern) = handle.request_capability() {
		debug!(wallet = handle.name(), method = call.method(), "Sending wallet request");
		return modern.request(call).await;
	}

	if let Some(legacy) = handle.legacy_capability() {
		debug!(wallet = handle.name(), method = call.method(), "Sending legacy wallet request");
		return send_legacy(legacy, call).await;
	}

	Err(WalletError::UnsupportedProvider)
}

/// [`invoke`] followed by decoding the result into `T`.
pub async fn invoke_as<T: DeserializeOwned>(
	handle: Option<&dyn WalletHandle>,
	call: &RpcCall,
) -> Result<T> {
	let value = invoke(handle, call).await?;
	serde_json::from_value(value).map_err(|e| {
		WalletError::InvalidResponse(format!("Unexpected result for {}: {}", call.method(), e))
	})
}

async fn send_legacy(legacy: &dyn LegacyCapability, call: &RpcCall) -> Result<Value> {
	if call.method().trim().is_empty() {
		return Err(WalletError::UnsupportedCallShape(
			"call has no method".to_string(),
		));
	}

	let (tx, rx) = oneshot::channel();
	legacy.send(
		call.method(),
		call.params_value(),
		Box::new(move |outcome| {
			// The receiver only goes away if the caller stopped waiting.
			let _ = tx.send(outcome);
		}),
	);

	match rx.await {
		Ok(Ok(value)) => Ok(value),
		Ok(Err(err)) => Err(WalletError::LegacyBridge(err)),
		Err(_) => Err(WalletError::LegacyBridge(ProviderRpcError::from_message(
			"legacy provider dropped the callback without a response",
		))),
	}
}

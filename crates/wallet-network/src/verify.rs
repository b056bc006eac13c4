//! Active-chain checks performed before signing.

use crate::bootstrap::NetworkBootstrap;
use tracing::{debug, warn};
use wallet_provider::{invoke, WalletHandle};
use wallet_types::{methods, ChainDescriptor, ChainId, Result, RpcCall, WalletError};

/// Chain the wallet currently reports as active.
pub async fn active_chain(handle: Option<&dyn WalletHandle>) -> Result<ChainId> {
	let value = invoke(handle, &RpcCall::new(methods::CHAIN_ID)).await?;
	ChainId::from_json(&value).ok_or_else(|| {
		WalletError::InvalidResponse(format!("Unexpected {} result: {}", methods::CHAIN_ID, value))
	})
}

/// Switches the wallet to `descriptor` unless it is already active.
///
/// Returns `true` when a switch (and possibly an add) was performed.
pub async fn ensure_active_chain(
	bootstrap: &NetworkBootstrap,
	handle: Option<&dyn WalletHandle>,
	descriptor: &ChainDescriptor,
) -> Result<bool> {
	let current = active_chain(handle).await?;
	if current == descriptor.chain_id {
		debug!("Wallet already on {}", descriptor.chain_id);
		return Ok(false);
	}

	warn!(
		"Wrong network detected ({}), switching to {}",
		current, descriptor.chain_name
	);
	bootstrap.ensure_chain(handle, descriptor).await.into_result()?;
	Ok(true)
}

//! Builds the injected wallet environment from configuration.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use wallet_config::{WalletBackend, WalletSettings, WalletVendor};
use wallet_provider::implementations::{Capability, HttpWallet, InMemoryWallet};
use wallet_provider::{InjectedProvider, InjectedWallets, WalletHandle, WalletKind};
use wallet_types::{ChainId, Result, WalletError};

/// Account the in-memory backend connects with.
pub const DRY_RUN_ACCOUNT: &str = "0x00000000000000000000000000000000000000d7";
/// Balance the in-memory backend starts with: 1 native unit.
const DRY_RUN_BALANCE: u128 = 1_000_000_000_000_000_000;

/// Wallets the configured backend makes available.
pub fn injected_wallets(settings: &WalletSettings) -> Result<InjectedWallets> {
	let handle: Arc<dyn WalletHandle> = match settings.backend {
		WalletBackend::Http => {
			let endpoint = settings.endpoint.as_deref().ok_or_else(|| {
				WalletError::Transport("wallet.endpoint is required for the http backend".to_string())
			})?;
			if settings.legacy {
				warn!("wallet.legacy only applies to the memory backend");
			}
			Arc::new(HttpWallet::with_timeout(
				endpoint,
				Duration::from_secs(settings.request_timeout_secs),
			)?)
		}
		WalletBackend::Memory => {
			let capability = if settings.legacy {
				Capability::Legacy
			} else {
				Capability::Request
			};
			// Starts on mainnet so connecting exercises the switch/add handshake.
			Arc::new(
				InMemoryWallet::new(ChainId::ETHEREUM)
					.with_name("memory")
					.with_capability(capability)
					.with_accounts(vec![DRY_RUN_ACCOUNT.to_string()])
					.with_balance(DRY_RUN_ACCOUNT, DRY_RUN_BALANCE),
			)
		}
	};

	if settings.legacy_coinbase {
		if settings.vendor != WalletVendor::Coinbase {
			warn!("wallet.vendor is ignored for a legacy Coinbase injection");
		}
		return Ok(InjectedWallets::new().with_legacy_coinbase(handle));
	}

	let provider = match settings.vendor {
		WalletVendor::MetaMask => InjectedProvider::metamask(handle),
		WalletVendor::Coinbase => InjectedProvider::coinbase(handle),
		WalletVendor::Generic => InjectedProvider::generic(handle),
	};

	Ok(InjectedWallets::new().with_ethereum(provider))
}

/// Picks the wallet: explicit choice, then configured kind, then auto-detection.
pub fn select_wallet(
	wallets: &InjectedWallets,
	requested: Option<WalletKind>,
	configured: Option<WalletKind>,
) -> Result<(WalletKind, Arc<dyn WalletHandle>)> {
	let kind = requested.or(configured).or_else(|| wallets.auto_select());
	let handle = wallets.select(kind)?;
	// `select` only succeeds with a kind
	let kind = kind.unwrap_or(WalletKind::Browser);

	info!("Using {} ({})", kind.display_name(), handle.name());
	Ok((kind, handle))
}

//! Picking a wallet handle out of what the host environment injected.

use crate::handle::WalletHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use wallet_types::{Result, WalletError};

/// Wallet the user chose to connect with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
	MetaMask,
	Coinbase,
	Browser,
}

impl WalletKind {
	pub fn display_name(&self) -> &'static str {
		match self {
			WalletKind::MetaMask => "MetaMask",
			WalletKind::Coinbase => "Coinbase Wallet",
			WalletKind::Browser => "Browser Wallet",
		}
	}
}

impl fmt::Display for WalletKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let tag = match self {
			WalletKind::MetaMask => "metamask",
			WalletKind::Coinbase => "coinbase",
			WalletKind::Browser => "browser",
		};
		f.write_str(tag)
	}
}

impl FromStr for WalletKind {
	type Err = WalletError;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_ascii_lowercase().as_str() {
			"metamask" => Ok(WalletKind::MetaMask),
			"coinbase" => Ok(WalletKind::Coinbase),
			"browser" => Ok(WalletKind::Browser),
			_ => Err(WalletError::Selection(format!("Invalid wallet selection '{}'", s))),
		}
	}
}

/// The main injected provider and the vendor flags it advertises.
#[derive(Clone)]
pub struct InjectedProvider {
	pub handle: Arc<dyn WalletHandle>,
	pub is_metamask: bool,
	pub is_coinbase_wallet: bool,
}

impl InjectedProvider {
	pub fn generic(handle: Arc<dyn WalletHandle>) -> Self {
		Self {
			handle,
			is_metamask: false,
			is_coinbase_wallet: false,
		}
	}

	pub fn metamask(handle: Arc<dyn WalletHandle>) -> Self {
		Self {
			is_metamask: true,
			..Self::generic(handle)
		}
	}

	pub fn coinbase(handle: Arc<dyn WalletHandle>) -> Self {
		Self {
			is_coinbase_wallet: true,
			..Self::generic(handle)
		}
	}
}

/// Wallets available in the host environment.
#[derive(Clone, Default)]
pub struct InjectedWallets {
	/// The standard injected provider.
	pub ethereum: Option<InjectedProvider>,
	/// Older Coinbase injection living next to the standard one.
	pub coinbase: Option<Arc<dyn WalletHandle>>,
}

impl InjectedWallets {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_ethereum(mut self, provider: InjectedProvider) -> Self {
		self.ethereum = Some(provider);
		self
	}

	pub fn with_legacy_coinbase(mut self, handle: Arc<dyn WalletHandle>) -> Self {
		self.coinbase = Some(handle);
		self
	}

	/// Handle for the chosen wallet kind.
	pub fn select(&self, kind: Option<WalletKind>) -> Result<Arc<dyn WalletHandle>> {
		let kind = kind
			.ok_or_else(|| WalletError::Selection("Please select a wallet first".to_string()))?;

		let selected = match kind {
			WalletKind::MetaMask => self
				.ethereum
				.as_ref()
				.filter(|p| p.is_metamask)
				.map(|p| p.handle.clone()),
			WalletKind::Coinbase => self
				.ethereum
				.as_ref()
				.filter(|p| p.is_coinbase_wallet)
				.map(|p| p.handle.clone())
				.or_else(|| self.coinbase.clone()),
			WalletKind::Browser => self.ethereum.as_ref().map(|p| p.handle.clone()),
		};

		selected.ok_or_else(|| {
			WalletError::Selection(match kind {
				WalletKind::MetaMask => "MetaMask is not installed".to_string(),
				WalletKind::Coinbase => "Coinbase Wallet is not installed".to_string(),
				WalletKind::Browser => "No browser wallet detected".to_string(),
			})
		})
	}

	/// Wallet kind to preselect when the user has not picked one.
	pub fn auto_select(&self) -> Option<WalletKind> {
		let kind = match (&self.ethereum, &self.coinbase) {
			(Some(provider), _) if provider.is_metamask => WalletKind::MetaMask,
			(Some(_), _) => WalletKind::Browser,
			// Only the older standalone injection is present
			(None, Some(_)) => WalletKind::Coinbase,
			(None, None) => return None,
		};
		info!("{} detected", kind.display_name());
		Some(kind)
	}
}

//! Configuration types for the toolkit.

use serde::{Deserialize, Serialize};
use wallet_provider::WalletKind;
use wallet_types::ChainDescriptor;

/// Complete toolkit configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GmWalletConfig {
	/// Network the wallet must be on before anything is signed
	#[serde(default = "ChainDescriptor::irys_testnet")]
	pub chain: ChainDescriptor,
	/// Which wallet to talk to and how
	#[serde(default)]
	pub wallet: WalletSettings,
	/// Switch/add handshake tuning
	#[serde(default)]
	pub network: NetworkSettings,
	/// Message transaction settings
	#[serde(default)]
	pub message: MessageSettings,
	/// Key-signed transfer settings (optional)
	#[serde(default)]
	pub transfer: Option<TransferSettings>,
}

impl Default for GmWalletConfig {
	fn default() -> Self {
		Self {
			chain: ChainDescriptor::irys_testnet(),
			wallet: WalletSettings::default(),
			network: NetworkSettings::default(),
			message: MessageSettings::default(),
			transfer: None,
		}
	}
}

/// Wallet backend: "http" or "memory"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletBackend {
	Http,
	Memory,
}

/// Vendor flags the wallet advertises when injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletVendor {
	MetaMask,
	Coinbase,
	Generic,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletSettings {
	pub backend: WalletBackend,
	/// JSON-RPC endpoint for the http backend
	pub endpoint: Option<String>,
	pub vendor: WalletVendor,
	/// Preselected wallet; auto-detected when absent
	pub kind: Option<WalletKind>,
	/// Expose the wallet through the legacy `send` convention
	#[serde(default)]
	pub legacy: bool,
	/// Inject the wallet as the older standalone Coinbase provider instead
	/// of the standard one
	#[serde(default)]
	pub legacy_coinbase: bool,
	pub request_timeout_secs: u64,
}

impl Default for WalletSettings {
	fn default() -> Self {
		Self {
			backend: WalletBackend::Http,
			endpoint: Some("http://127.0.0.1:8545".to_string()),
			vendor: WalletVendor::Generic,
			kind: None,
			legacy: false,
			legacy_coinbase: false,
			request_timeout_secs: 30,
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkSettings {
	/// Error codes that count as "chain not registered" besides 4902
	#[serde(default)]
	pub extra_unregistered_codes: Vec<i64>,
	/// Give up waiting for the wallet after this many seconds
	pub switch_timeout_secs: Option<u64>,
}

impl Default for NetworkSettings {
	fn default() -> Self {
		Self {
			extra_unregistered_codes: Vec::new(),
			switch_timeout_secs: None,
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageSettings {
	/// Contract receiving the message calldata
	pub contract_address: String,
	/// Sent when the message is empty
	pub default_message: String,
	/// Minimum balance in native units, e.g. "0.001"
	pub min_balance: String,
	/// Gas limit used when the wallet fails to estimate
	pub fallback_gas_limit: u64,
	pub receipt_timeout_secs: u64,
	pub poll_interval_ms: u64,
	/// Where to get test tokens, quoted in balance errors
	pub faucet_url: Option<String>,
}

impl Default for MessageSettings {
	fn default() -> Self {
		Self {
			contract_address: "0x9fc9B8893F462B4B9a7c0B12b07d2F3C57C40a53".to_string(),
			default_message: "GM".to_string(),
			min_balance: "0.001".to_string(),
			fallback_gas_limit: 100_000,
			receipt_timeout_secs: 120,
			poll_interval_ms: 1_000,
			faucet_url: Some("https://irys.xyz/faucet".to_string()),
		}
	}
}

/// Plain value transfer signed with a local key
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferSettings {
	pub rpc_url: String,
	/// Private key (hex, 0x optional); prefer `${VAR}` or GM_WALLET_PRIVATE_KEY
	pub private_key: String,
	pub to_address: String,
	/// Amount in native units, e.g. "0.001"
	pub amount: String,
	pub gas_limit: Option<u64>,
	pub max_fee_per_gas_gwei: Option<String>,
	pub max_priority_fee_per_gas_gwei: Option<String>,
	pub explorer_url: Option<String>,
}

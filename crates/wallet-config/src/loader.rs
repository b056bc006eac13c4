//! Configuration loading from files and environment.

use crate::types::*;
use crate::ConfigError;
use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, B256};
use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use wallet_provider::WalletKind;

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "GM_WALLET_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	/// Loads, overrides and validates. Without a file the defaults are used.
	pub async fn load(&self) -> Result<GmWalletConfig, ConfigError> {
		// Load configuration
		let mut config = match &self.file_path {
			Some(path) => self.load_from_file(path).await?,
			None => {
				debug!("No configuration file given, using defaults");
				GmWalletConfig::default()
			}
		};

		// Apply environment variable overrides
		self.apply_env_overrides(&mut config)?;

		// Validate configuration
		validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file(&self, path: &Path) -> Result<GmWalletConfig, ConfigError> {
		if !path.exists() {
			return Err(ConfigError::FileNotFound(path.display().to_string()));
		}
		info!("Loading configuration from {:?}", path);

		let content = tokio::fs::read_to_string(path).await?;

		// Substitute environment variables
		let content = substitute_env_vars(&content)?;

		// Parse based on file extension
		match path.extension().and_then(|s| s.to_str()) {
			Some("json") => from_json(&content),
			Some("toml") | None => from_toml(&content),
			Some(other) => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {}",
				other
			))),
		}
	}

	fn apply_env_overrides(&self, config: &mut GmWalletConfig) -> Result<(), ConfigError> {
		let var = |name: &str| env::var(format!("{}{}", self.env_prefix, name)).ok();

		if let Some(endpoint) = var("ENDPOINT") {
			debug!("Overriding wallet endpoint from environment");
			config.wallet.endpoint = Some(endpoint);
		}

		if let Some(kind) = var("KIND") {
			config.wallet.kind = Some(
				kind.parse::<WalletKind>()
					.map_err(|e| ConfigError::ValidationError(format!("{}", e)))?,
			);
		}

		if let Some(address) = var("CONTRACT_ADDRESS") {
			debug!("Overriding contract address from environment");
			config.message.contract_address = address;
		}

		// Transfer overrides only apply when a transfer is configured
		if let Some(transfer) = config.transfer.as_mut() {
			if let Some(key) = var("PRIVATE_KEY") {
				debug!("Overriding private key from environment");
				transfer.private_key = key;
			}
			if let Some(url) = var("RPC_URL") {
				debug!("Overriding transfer RPC URL from environment");
				transfer.rpc_url = url;
			}
		}

		Ok(())
	}
}

/// Parses a TOML document.
pub fn from_toml(contents: &str) -> Result<GmWalletConfig, ConfigError> {
	toml::from_str(contents)
		.map_err(|e| ConfigError::ParseError(format!("Failed to parse TOML: {}", e)))
}

/// Parses a JSON document.
pub fn from_json(contents: &str) -> Result<GmWalletConfig, ConfigError> {
	serde_json::from_str(contents)
		.map_err(|e| ConfigError::ParseError(format!("Failed to parse JSON: {}", e)))
}

/// Replaces every `${VAR}` with the value of the environment variable.
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([^}]+)\}")
		.map_err(|e| ConfigError::ParseError(format!("Invalid substitution pattern: {}", e)))?;

	let mut result = content.to_string();
	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
		result = result.replace(full_match, &value);
	}

	Ok(result)
}

/// Checks the settings that would otherwise fail deep inside a wallet call.
pub fn validate_config(config: &GmWalletConfig) -> Result<(), ConfigError> {
	// Validate chain
	if config.chain.chain_name.trim().is_empty() {
		return Err(ConfigError::ValidationError(
			"chain.chain_name must not be empty".to_string(),
		));
	}
	if config.chain.rpc_urls.is_empty() {
		return Err(ConfigError::ValidationError(
			"chain.rpc_urls must list at least one URL".to_string(),
		));
	}
	for url in config
		.chain
		.rpc_urls
		.iter()
		.chain(config.chain.block_explorer_urls.iter())
	{
		ensure_http_url(url)?;
	}

	// Validate wallet
	if config.wallet.backend == WalletBackend::Http {
		match &config.wallet.endpoint {
			Some(endpoint) => ensure_http_url(endpoint)?,
			None => {
				return Err(ConfigError::ValidationError(
					"wallet.endpoint is required for the http backend".to_string(),
				))
			}
		}
	}

	// Validate message settings
	ensure_address("message.contract_address", &config.message.contract_address)?;
	ensure_amount("message.min_balance", &config.message.min_balance)?;
	if config.message.poll_interval_ms == 0 {
		return Err(ConfigError::ValidationError(
			"message.poll_interval_ms must be greater than zero".to_string(),
		));
	}

	// Validate transfer settings if present
	if let Some(transfer) = &config.transfer {
		ensure_http_url(&transfer.rpc_url)?;
		ensure_address("transfer.to_address", &transfer.to_address)?;
		ensure_amount("transfer.amount", &transfer.amount)?;

		if transfer.private_key.trim().parse::<B256>().is_err() {
			return Err(ConfigError::ValidationError(
				"transfer.private_key must be 32 bytes of hex".to_string(),
			));
		}
	}

	Ok(())
}

fn ensure_http_url(url: &str) -> Result<(), ConfigError> {
	if url.starts_with("http://") || url.starts_with("https://") {
		Ok(())
	} else {
		Err(ConfigError::ValidationError(format!(
			"URL must start with http:// or https://: {}",
			url
		)))
	}
}

fn ensure_address(field: &str, address: &str) -> Result<(), ConfigError> {
	if !address.starts_with("0x") {
		return Err(ConfigError::ValidationError(format!(
			"{} must start with 0x: {}",
			field, address
		)));
	}
	address.parse::<Address>().map(|_| ()).map_err(|e| {
		ConfigError::ValidationError(format!(
			"{} is not a valid address: {} ({})",
			field, address, e
		))
	})
}

/// Amounts are decimal strings in native units, read the same way they are
/// read when sending.
fn ensure_amount(field: &str, amount: &str) -> Result<(), ConfigError> {
	if amount.trim_start().starts_with('-') {
		return Err(ConfigError::ValidationError(format!(
			"{} must not be negative: {}",
			field, amount
		)));
	}
	parse_ether(amount).map(|_| ()).map_err(|e| {
		ConfigError::ValidationError(format!(
			"{} is not a valid amount: {} ({})",
			field, amount, e
		))
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;
	use wallet_types::ChainId;

	const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn write_config(suffix: &str, contents: &str) -> NamedTempFile {
		let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
		file.write_all(contents.as_bytes()).unwrap();
		file
	}

	#[test]
	fn test_default_config_is_valid() {
		let config = GmWalletConfig::default();
		assert_eq!(config.chain.chain_id, ChainId(1270));
		assert_eq!(config.message.default_message, "GM");
		assert_eq!(config.message.fallback_gas_limit, 100_000);
		assert!(validate_config(&config).is_ok());
	}

	#[test]
	fn test_toml_parsing() {
		let toml = r#"
[chain]
chainId = "0xaa36a7"
chainName = "Sepolia"
rpcUrls = ["https://rpc.sepolia.org"]
nativeCurrency = { name = "Ether", symbol = "ETH", decimals = 18 }

[wallet]
backend = "memory"
vendor = "metamask"
kind = "metamask"
request_timeout_secs = 10

[network]
extra_unregistered_codes = [-32603]
"#;

		let config = from_toml(toml).unwrap();
		assert_eq!(config.chain.chain_id, ChainId::SEPOLIA);
		assert!(config.chain.block_explorer_urls.is_empty());
		assert_eq!(config.wallet.backend, WalletBackend::Memory);
		assert_eq!(config.wallet.vendor, WalletVendor::MetaMask);
		assert_eq!(config.wallet.kind, Some(WalletKind::MetaMask));
		assert_eq!(config.network.extra_unregistered_codes, vec![-32603]);
		assert!(!config.wallet.legacy_coinbase);
		assert_eq!(config.message.min_balance, "0.001");
		assert!(config.transfer.is_none());
	}

	#[test]
	fn test_json_parsing() {
		let json = r#"{
			"chain": {
				"chainId": 1270,
				"chainName": "Irys Testnet",
				"nativeCurrency": { "name": "Irys", "symbol": "IRYS", "decimals": 18 },
				"rpcUrls": ["https://testnet-rpc.irys.xyz/v1/execution-rpc"]
			},
			"message": {
				"contract_address": "0x9fc9B8893F462B4B9a7c0B12b07d2F3C57C40a53",
				"default_message": "gm",
				"min_balance": "0.01",
				"fallback_gas_limit": 150000,
				"receipt_timeout_secs": 60,
				"poll_interval_ms": 500
			}
		}"#;

		let config = from_json(json).unwrap();
		assert_eq!(config.chain.chain_id, ChainId(1270));
		assert_eq!(config.message.fallback_gas_limit, 150_000);
		assert_eq!(config.message.faucet_url, None);
	}

	#[test]
	fn test_invalid_toml() {
		assert!(matches!(
			from_toml("[chain\nchainId = 1"),
			Err(ConfigError::ParseError(_))
		));
	}

	#[test]
	fn test_substitution() {
		env::set_var("GM_WALLET_TEST_SUBST_URL", "https://rpc.example");
		let out = substitute_env_vars("url = \"${GM_WALLET_TEST_SUBST_URL}/v1\"").unwrap();
		assert_eq!(out, "url = \"https://rpc.example/v1\"");

		assert!(matches!(
			substitute_env_vars("key = \"${GM_WALLET_TEST_SURELY_UNSET}\""),
			Err(ConfigError::EnvVarNotFound(name)) if name == "GM_WALLET_TEST_SURELY_UNSET"
		));
	}

	#[tokio::test]
	async fn test_load_from_file_with_substitution() {
		env::set_var("GM_WALLET_TEST_LOAD_KEY", KEY);
		let file = write_config(
			".toml",
			r#"
[wallet]
backend = "memory"
vendor = "generic"
request_timeout_secs = 5

[transfer]
rpc_url = "https://testnet-rpc.irys.xyz/v1/execution-rpc"
private_key = "${GM_WALLET_TEST_LOAD_KEY}"
to_address = "0x0000000000000000000000000000000000000001"
amount = "0.001"
"#,
		);

		let config = ConfigLoader::new()
			.with_file(file.path())
			.with_env_prefix("GM_WALLET_TEST_LOAD_")
			.load()
			.await
			.unwrap();
		let transfer = config.transfer.unwrap();
		assert_eq!(transfer.private_key, KEY);
		assert_eq!(transfer.gas_limit, None);
	}

	#[tokio::test]
	async fn test_missing_file() {
		let result = ConfigLoader::new()
			.with_file("/nonexistent/gm-wallet.toml")
			.load()
			.await;
		assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
	}

	#[tokio::test]
	async fn test_env_overrides() {
		env::set_var("GM_WALLET_TEST_OVR_ENDPOINT", "http://10.0.0.2:8545");
		env::set_var("GM_WALLET_TEST_OVR_KIND", "coinbase");
		env::set_var(
			"GM_WALLET_TEST_OVR_CONTRACT_ADDRESS",
			"0x0000000000000000000000000000000000000002",
		);

		let config = ConfigLoader::new()
			.with_env_prefix("GM_WALLET_TEST_OVR_")
			.load()
			.await
			.unwrap();
		assert_eq!(config.wallet.endpoint.as_deref(), Some("http://10.0.0.2:8545"));
		assert_eq!(config.wallet.kind, Some(WalletKind::Coinbase));
		assert_eq!(
			config.message.contract_address,
			"0x0000000000000000000000000000000000000002"
		);
	}

	#[tokio::test]
	async fn test_bad_kind_override() {
		env::set_var("GM_WALLET_TEST_BADKIND_KIND", "phantom");
		let result = ConfigLoader::new()
			.with_env_prefix("GM_WALLET_TEST_BADKIND_")
			.load()
			.await;
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}

	#[test]
	fn test_validation_errors() {
		let mut config = GmWalletConfig::default();
		config.wallet.endpoint = None;
		assert!(validate_config(&config)
			.unwrap_err()
			.to_string()
			.contains("wallet.endpoint"));

		let mut config = GmWalletConfig::default();
		config.wallet.backend = WalletBackend::Memory;
		config.wallet.endpoint = None;
		assert!(validate_config(&config).is_ok());

		let mut config = GmWalletConfig::default();
		config.message.contract_address = "0x1234".to_string();
		assert!(validate_config(&config)
			.unwrap_err()
			.to_string()
			.contains("contract_address"));

		let mut config = GmWalletConfig::default();
		config.message.min_balance = "lots".to_string();
		assert!(validate_config(&config).is_err());

		let mut config = GmWalletConfig::default();
		config.message.contract_address = "9fc9B8893F462B4B9a7c0B12b07d2F3C57C40a53".to_string();
		assert!(validate_config(&config).is_err());

		let mut config = GmWalletConfig::default();
		config.chain.rpc_urls = vec!["wss://rpc.example".to_string()];
		assert!(validate_config(&config).is_err());
	}

	#[test]
	fn test_amounts_must_parse_as_native_units() {
		for amount in ["1e-3", "-0.5", "0.5 IRYS"] {
			let mut config = GmWalletConfig::default();
			config.message.min_balance = amount.to_string();
			assert!(
				matches!(validate_config(&config), Err(ConfigError::ValidationError(_))),
				"min_balance {:?} should be rejected",
				amount
			);
		}

		for amount in ["0.001", "1", "0.000000000000000001"] {
			let mut config = GmWalletConfig::default();
			config.message.min_balance = amount.to_string();
			assert!(validate_config(&config).is_ok(), "min_balance {:?}", amount);
			assert!(parse_ether(amount).is_ok());
		}
	}

	#[test]
	fn test_transfer_key_validation() {
		let mut config = GmWalletConfig::default();
		config.transfer = Some(TransferSettings {
			rpc_url: "https://rpc.example".to_string(),
			private_key: "0x1234".to_string(),
			to_address: "0x0000000000000000000000000000000000000001".to_string(),
			amount: "0.001".to_string(),
			gas_limit: Some(21_000),
			max_fee_per_gas_gwei: None,
			max_priority_fee_per_gas_gwei: None,
			explorer_url: None,
		});
		assert!(validate_config(&config)
			.unwrap_err()
			.to_string()
			.contains("private_key"));

		if let Some(transfer) = config.transfer.as_mut() {
			transfer.private_key = KEY.trim_start_matches("0x").to_string();
		}
		assert!(validate_config(&config).is_ok());
	}
}

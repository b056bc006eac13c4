//! Chain identifiers and the descriptor handed to wallets when adding a network.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chain identifier.
///
/// Equality is numeric, so two hex renderings that only differ in case
/// (`0x4F6`, `0x4f6`) identify the same chain. Always displayed as `0x` +
/// lowercase hex without leading zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u64);

impl ChainId {
	pub const ETHEREUM: Self = Self(1);
	pub const SEPOLIA: Self = Self(11155111);
	pub const IRYS_TESTNET: Self = Self(1270);

	/// Hex form used on the wire, e.g. `0x4f6`.
	pub fn to_hex(&self) -> String {
		format!("{:#x}", self.0)
	}

	/// Reads a chain id out of a JSON-RPC result. Wallets normally answer
	/// with a hex string, a few answer with a plain number.
	pub fn from_json(value: &Value) -> Option<Self> {
		match value {
			Value::String(s) => s.parse().ok(),
			Value::Number(n) => n.as_u64().map(ChainId),
			_ => None,
		}
	}
}

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid chain ID '{0}'")]
pub struct ChainIdParseError(pub String);

impl FromStr for ChainId {
	type Err = ChainIdParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		let (digits, radix) = match trimmed
			.strip_prefix("0x")
			.or_else(|| trimmed.strip_prefix("0X"))
		{
			Some(hex) => (hex, 16),
			None => (trimmed, 10),
		};

		if digits.is_empty() {
			return Err(ChainIdParseError(s.to_string()));
		}

		u64::from_str_radix(digits, radix)
			.map(ChainId)
			.map_err(|_| ChainIdParseError(s.to_string()))
	}
}

impl Serialize for ChainId {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_hex())
	}
}

impl<'de> Deserialize<'de> for ChainId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Text(String),
			Number(u64),
		}

		match Raw::deserialize(deserializer)? {
			Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
			Raw::Number(n) => Ok(ChainId(n)),
		}
	}
}

/// Native currency of a chain as wallets display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
	pub name: String,
	pub symbol: String,
	pub decimals: u8,
}

/// Everything a wallet needs to register a network it does not know yet.
///
/// Field names follow the add-chain request shape (`chainId`, `chainName`,
/// `nativeCurrency`, `rpcUrls`, `blockExplorerUrls`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
	pub chain_id: ChainId,
	pub chain_name: String,
	pub native_currency: NativeCurrency,
	pub rpc_urls: Vec<String>,
	#[serde(default)]
	pub block_explorer_urls: Vec<String>,
}

impl ChainDescriptor {
	/// The Irys testnet the message contract lives on.
	pub fn irys_testnet() -> Self {
		Self {
			chain_id: ChainId::IRYS_TESTNET,
			chain_name: "Irys Testnet".to_string(),
			native_currency: NativeCurrency {
				name: "IRYS".to_string(),
				symbol: "IRYS".to_string(),
				decimals: 18,
			},
			rpc_urls: vec!["https://testnet-rpc.irys.xyz/v1/execution-rpc".to_string()],
			block_explorer_urls: vec!["https://testnet-explorer.irys.xyz".to_string()],
		}
	}

	/// First explorer URL, if any.
	pub fn explorer(&self) -> Option<&str> {
		self.block_explorer_urls.first().map(String::as_str)
	}

	/// Explorer link for a transaction hash.
	pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
		self.explorer()
			.map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
	}

	/// The descriptor as the single parameter object of an add-chain call.
	pub fn to_add_chain_param(&self) -> Value {
		json!({
			"chainId": self.chain_id.to_hex(),
			"chainName": self.chain_name,
			"nativeCurrency": {
				"name": self.native_currency.name,
				"symbol": self.native_currency.symbol,
				"decimals": self.native_currency.decimals,
			},
			"rpcUrls": self.rpc_urls,
			"blockExplorerUrls": self.block_explorer_urls,
		})
	}
}

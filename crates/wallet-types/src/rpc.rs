//! RPC call shape shared by every wallet capability.

use crate::chain::{ChainDescriptor, ChainId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Method names issued against wallets.
pub mod methods {
	pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
	pub const ADD_CHAIN: &str = "wallet_addEthereumChain";
	pub const CHAIN_ID: &str = "eth_chainId";
	pub const ACCOUNTS: &str = "eth_accounts";
	pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
	pub const GET_BALANCE: &str = "eth_getBalance";
	pub const GAS_PRICE: &str = "eth_gasPrice";
	pub const SEND_TRANSACTION: &str = "eth_sendTransaction";
	pub const GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
}

/// Well-known wallet error codes.
pub mod codes {
	/// The user declined the wallet prompt.
	pub const USER_REJECTED: i64 = 4001;
	/// The wallet does not know the requested chain.
	pub const UNRECOGNIZED_CHAIN: i64 = 4902;
	/// Generic JSON-RPC internal error.
	pub const INTERNAL_ERROR: i64 = -32603;
	/// JSON-RPC method not found.
	pub const METHOD_NOT_FOUND: i64 = -32601;
}

/// Parameters of an RPC call: positional arguments or one parameter object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcParams {
	Positional(Vec<Value>),
	Object(Map<String, Value>),
}

impl RpcParams {
	pub fn to_value(&self) -> Value {
		match self {
			RpcParams::Positional(args) => Value::Array(args.clone()),
			RpcParams::Object(map) => Value::Object(map.clone()),
		}
	}
}

/// A single request issued against a wallet handle.
///
/// Built once per call and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcCall {
	method: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	params: Option<RpcParams>,
}

impl RpcCall {
	pub fn new(method: impl Into<String>) -> Self {
		Self {
			method: method.into(),
			params: None,
		}
	}

	pub fn with_params(mut self, params: Vec<Value>) -> Self {
		self.params = Some(RpcParams::Positional(params));
		self
	}

	pub fn with_object(mut self, params: Map<String, Value>) -> Self {
		self.params = Some(RpcParams::Object(params));
		self
	}

	pub fn method(&self) -> &str {
		&self.method
	}

	pub fn params(&self) -> Option<&RpcParams> {
		self.params.as_ref()
	}

	/// Params as JSON, `[]` when absent.
	pub fn params_value(&self) -> Value {
		self.params
			.as_ref()
			.map(RpcParams::to_value)
			.unwrap_or_else(|| Value::Array(Vec::new()))
	}

	/// Positional argument at `index`, if the call has positional params.
	pub fn arg(&self, index: usize) -> Option<&Value> {
		match &self.params {
			Some(RpcParams::Positional(args)) => args.get(index),
			_ => None,
		}
	}

	pub fn switch_chain(chain_id: ChainId) -> Self {
		Self::new(methods::SWITCH_CHAIN).with_params(vec![json!({ "chainId": chain_id.to_hex() })])
	}

	pub fn add_chain(descriptor: &ChainDescriptor) -> Self {
		Self::new(methods::ADD_CHAIN).with_params(vec![descriptor.to_add_chain_param()])
	}
}

//! In-memory wallet simulator.
//!
//! Behaves like a browser wallet for the calls this toolkit issues: it keeps
//! an active chain and the set of chains it knows, answers account and
//! balance queries, and "mines" sent transactions instantly. It can present
//! itself through the modern capability, the legacy one, or neither, which
//! makes it usable both for dry runs and for exercising every adapter path.

use crate::handle::{LegacyCallback, LegacyCapability, RequestCapability, WalletHandle};
use async_trait::async_trait;
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use wallet_types::{
	codes, methods, ChainDescriptor, ChainId, ProviderRpcError, Result, RpcCall, WalletError,
};

const DEFAULT_ACCOUNT: &str = "0x1000000000000000000000000000000000000001";
const DEFAULT_GAS_PRICE: u128 = 1_000_000_000;
const INVALID_PARAMS: i64 = -32602;
const UNAUTHORIZED: i64 = 4100;

/// Which calling convention the simulator exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
	Request,
	Legacy,
	None,
}

/// A transaction accepted by the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct SentTransaction {
	pub hash: String,
	pub from: String,
	pub to: Option<String>,
	pub data: Option<String>,
	pub gas: Option<String>,
	pub block_number: u64,
	pub gas_used: u64,
}

struct State {
	active_chain: ChainId,
	known_chains: HashSet<ChainId>,
	added_chains: Vec<Value>,
	accounts: Vec<String>,
	authorized: bool,
	balances: HashMap<String, u128>,
	gas_price: u128,
	block_number: u64,
	transactions: Vec<SentTransaction>,
	calls: Vec<RpcCall>,
	failures: HashMap<String, VecDeque<ProviderRpcError>>,
}

pub struct InMemoryWallet {
	name: String,
	capability: Capability,
	state: Mutex<State>,
}

impl InMemoryWallet {
	/// A wallet sitting on `active_chain`, which is the only chain it knows.
	pub fn new(active_chain: ChainId) -> Self {
		let mut known_chains = HashSet::new();
		known_chains.insert(active_chain);

		Self {
			name: "memory".to_string(),
			capability: Capability::Request,
			state: Mutex::new(State {
				active_chain,
				known_chains,
				added_chains: Vec::new(),
				accounts: vec![DEFAULT_ACCOUNT.to_string()],
				authorized: false,
				balances: HashMap::new(),
				gas_price: DEFAULT_GAS_PRICE,
				block_number: 0,
				transactions: Vec::new(),
				calls: Vec::new(),
				failures: HashMap::new(),
			}),
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	pub fn with_capability(mut self, capability: Capability) -> Self {
		self.capability = capability;
		self
	}

	pub fn with_known_chain(self, chain_id: ChainId) -> Self {
		self.lock().known_chains.insert(chain_id);
		self
	}

	pub fn with_accounts(self, accounts: Vec<String>) -> Self {
		self.lock().accounts = accounts;
		self
	}

	/// Marks the accounts as already authorised for this site.
	pub fn authorized(self) -> Self {
		self.lock().authorized = true;
		self
	}

	pub fn with_balance(self, address: &str, wei: u128) -> Self {
		self.lock().balances.insert(address.to_ascii_lowercase(), wei);
		self
	}

	pub fn with_gas_price(self, wei: u128) -> Self {
		self.lock().gas_price = wei;
		self
	}

	/// Makes the next call to `method` fail with `error`. Failures queue up.
	pub fn fail_next(&self, method: &str, error: ProviderRpcError) {
		self.lock()
			.failures
			.entry(method.to_string())
			.or_default()
			.push_back(error);
	}

	pub fn active_chain(&self) -> ChainId {
		self.lock().active_chain
	}

	pub fn knows_chain(&self, chain_id: ChainId) -> bool {
		self.lock().known_chains.contains(&chain_id)
	}

	/// Parameters of every successful add-chain call, in order.
	pub fn added_chains(&self) -> Vec<Value> {
		self.lock().added_chains.clone()
	}

	/// Every call received, in order.
	pub fn calls(&self) -> Vec<RpcCall> {
		self.lock().calls.clone()
	}

	pub fn call_count(&self, method: &str) -> usize {
		self.lock()
			.calls
			.iter()
			.filter(|call| call.method() == method)
			.count()
	}

	pub fn sent_transactions(&self) -> Vec<SentTransaction> {
		self.lock().transactions.clone()
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn handle(&self, call: &RpcCall) -> std::result::Result<Value, ProviderRpcError> {
		let mut state = self.lock();
		state.calls.push(call.clone());
		debug!(wallet = %self.name, method = call.method(), "In-memory wallet call");

		if let Some(error) = state
			.failures
			.get_mut(call.method())
			.and_then(VecDeque::pop_front)
		{
			return Err(error);
		}

		match call.method() {
			methods::CHAIN_ID => Ok(json!(state.active_chain.to_hex())),
			methods::ACCOUNTS => {
				if state.authorized {
					Ok(json!(state.accounts))
				} else {
					Ok(json!([]))
				}
			}
			methods::REQUEST_ACCOUNTS => {
				state.authorized = true;
				Ok(json!(state.accounts))
			}
			methods::SWITCH_CHAIN => {
				let chain_id = call
					.arg(0)
					.and_then(|p| p.get("chainId"))
					.and_then(ChainId::from_json)
					.ok_or_else(|| invalid_params("expected [{ chainId }]"))?;

				if !state.known_chains.contains(&chain_id) {
					return Err(ProviderRpcError::new(
						codes::UNRECOGNIZED_CHAIN,
						format!(
							"Unrecognized chain ID \"{}\". Try adding the chain using {} first.",
							chain_id,
							methods::ADD_CHAIN
						),
					));
				}

				state.active_chain = chain_id;
				Ok(Value::Null)
			}
			methods::ADD_CHAIN => {
				let param = call
					.arg(0)
					.cloned()
					.ok_or_else(|| invalid_params("expected [descriptor]"))?;
				let descriptor: ChainDescriptor = serde_json::from_value(param.clone())
					.map_err(|e| invalid_params(&format!("invalid chain descriptor: {}", e)))?;

				if descriptor.rpc_urls.is_empty() {
					return Err(invalid_params("rpcUrls must not be empty"));
				}

				state.known_chains.insert(descriptor.chain_id);
				state.active_chain = descriptor.chain_id;
				state.added_chains.push(param);
				Ok(Value::Null)
			}
			methods::GET_BALANCE => {
				let address = call
					.arg(0)
					.and_then(Value::as_str)
					.ok_or_else(|| invalid_params("expected [address, block]"))?
					.to_ascii_lowercase();
				let balance = state.balances.get(&address).copied().unwrap_or(0);
				Ok(json!(format!("{:#x}", balance)))
			}
			methods::GAS_PRICE => Ok(json!(format!("{:#x}", state.gas_price))),
			methods::SEND_TRANSACTION => {
				if !state.authorized {
					return Err(ProviderRpcError::new(
						UNAUTHORIZED,
						"The requested account has not been authorized by the user",
					));
				}

				let tx = call
					.arg(0)
					.filter(|p| p.is_object())
					.ok_or_else(|| invalid_params("expected [transaction]"))?;
				let field = |name: &str| tx.get(name).and_then(Value::as_str).map(str::to_string);

				let from = field("from")
					.or_else(|| state.accounts.first().cloned())
					.unwrap_or_default();
				let data = field("data");
				let data_len = data
					.as_deref()
					.map(|d| d.trim_start_matches("0x").len() / 2)
					.unwrap_or(0) as u64;

				state.block_number += 1;
				let nonce = state.transactions.len() as u64;
				let mut hasher = Keccak256::new();
				hasher.update(nonce.to_be_bytes());
				hasher.update(from.as_bytes());
				hasher.update(data.as_deref().unwrap_or_default().as_bytes());
				let hash = format!("0x{}", hex::encode(hasher.finalize()));

				let sent = SentTransaction {
					hash: hash.clone(),
					from,
					to: field("to"),
					data,
					gas: field("gas"),
					block_number: state.block_number,
					gas_used: 21_000 + 16 * data_len,
				};
				state.transactions.push(sent);
				Ok(json!(hash))
			}
			methods::GET_TRANSACTION_RECEIPT => {
				let hash = call
					.arg(0)
					.and_then(Value::as_str)
					.ok_or_else(|| invalid_params("expected [hash]"))?;

				let receipt = state
					.transactions
					.iter()
					.find(|tx| tx.hash.eq_ignore_ascii_case(hash))
					.map(|tx| {
						let block_hash = Keccak256::digest(tx.block_number.to_be_bytes());
						json!({
							"type": "0x2",
							"status": "0x1",
							"transactionHash": tx.hash,
							"transactionIndex": "0x0",
							"blockHash": format!("0x{}", hex::encode(block_hash)),
							"blockNumber": format!("{:#x}", tx.block_number),
							"from": tx.from,
							"to": tx.to,
							"contractAddress": null,
							"gasUsed": format!("{:#x}", tx.gas_used),
							"cumulativeGasUsed": format!("{:#x}", tx.gas_used),
							"effectiveGasPrice": format!("{:#x}", state.gas_price),
							"logs": [],
							"logsBloom": format!("0x{}", "00".repeat(256)),
						})
					});
				Ok(receipt.unwrap_or(Value::Null))
			}
			other => Err(ProviderRpcError::new(
				codes::METHOD_NOT_FOUND,
				format!("The method \"{}\" does not exist / is not available", other),
			)),
		}
	}
}

fn invalid_params(detail: &str) -> ProviderRpcError {
	ProviderRpcError::new(INVALID_PARAMS, format!("Invalid params: {}", detail))
}

#[async_trait]
impl RequestCapability for InMemoryWallet {
	async fn request(&self, call: &RpcCall) -> Result<Value> {
		self.handle(call).map_err(WalletError::Rpc)
	}
}

impl LegacyCapability for InMemoryWallet {
	fn send(&self, method: &str, params: Value, callback: LegacyCallback) {
		let call = match params {
			Value::Array(args) => RpcCall::new(method).with_params(args),
			Value::Object(map) => RpcCall::new(method).with_object(map),
			_ => RpcCall::new(method),
		};
		callback(self.handle(&call));
	}
}

impl WalletHandle for InMemoryWallet {
	fn name(&self) -> &str {
		&self.name
	}

	fn request_capability(&self) -> Option<&dyn RequestCapability> {
		match self.capability {
			Capability::Request => Some(self),
			_ => None,
		}
	}

	fn legacy_capability(&self) -> Option<&dyn LegacyCapability> {
		match self.capability {
			Capability::Legacy => Some(self),
			_ => None,
		}
	}
}

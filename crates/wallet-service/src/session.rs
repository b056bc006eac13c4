//! Connected-wallet session and the message transaction flow.

use crate::receipt::MessageReceipt;
use alloy::primitives::utils::{format_ether, parse_ether};
use alloy::primitives::U256;
use alloy::rpc::types::TransactionReceipt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use wallet_config::{GmWalletConfig, MessageSettings};
use wallet_network::{ensure_active_chain, NetworkBootstrap};
use wallet_provider::{invoke_as, WalletHandle};
use wallet_types::{methods, ChainDescriptor, RpcCall, WalletError};

/// Price assumed when the wallet does not report one.
const FALLBACK_GAS_PRICE: u64 = 1_000_000_000;
/// Gas a typical message transaction uses, for cost estimates.
pub const ESTIMATED_MESSAGE_GAS: u64 = 50_000;

/// Rough cost in wei of one message at `gas_price`.
pub fn estimated_message_cost(gas_price: U256) -> U256 {
	gas_price * U256::from(ESTIMATED_MESSAGE_GAS)
}

#[derive(Error, Debug)]
pub enum SessionError {
	#[error(transparent)]
	Wallet(#[from] WalletError),

	#[error("Please connect wallet first")]
	NotConnected,

	#[error("Wallet returned no accounts")]
	NoAccounts,

	#[error("Insufficient balance. Need at least {required} {symbol} for gas, but have {balance} {symbol}.{hint}")]
	InsufficientBalance {
		balance: String,
		required: String,
		symbol: String,
		hint: String,
	},

	#[error("Transaction {hash} was not mined within {secs}s")]
	ReceiptTimeout { hash: String, secs: u64 },

	#[error("Transaction {0} reverted")]
	Reverted(String),

	#[error("Invalid setting: {0}")]
	InvalidSetting(String),
}

impl SessionError {
	/// Whether the user declined the request in the wallet.
	pub fn is_user_rejection(&self) -> bool {
		match self {
			SessionError::Wallet(e) => e.is_user_rejection(),
			_ => false,
		}
	}
}

/// A wallet handle plus the account the user connected with.
///
/// Owns what a browser dApp would keep in globals: the selected handle, the
/// connected account, the required chain and the message settings.
pub struct WalletSession {
	handle: Arc<dyn WalletHandle>,
	chain: ChainDescriptor,
	bootstrap: NetworkBootstrap,
	settings: MessageSettings,
	account: Option<String>,
}

impl WalletSession {
	pub fn new(
		handle: Arc<dyn WalletHandle>,
		chain: ChainDescriptor,
		settings: MessageSettings,
	) -> Self {
		Self {
			handle,
			chain,
			bootstrap: NetworkBootstrap::new(),
			settings,
			account: None,
		}
	}

	pub fn from_config(handle: Arc<dyn WalletHandle>, config: &GmWalletConfig) -> Self {
		let mut bootstrap = NetworkBootstrap::new()
			.with_unregistered_codes(config.network.extra_unregistered_codes.iter().copied());
		if let Some(secs) = config.network.switch_timeout_secs {
			bootstrap = bootstrap.with_switch_timeout(Duration::from_secs(secs));
		}

		Self::new(handle, config.chain.clone(), config.message.clone()).with_bootstrap(bootstrap)
	}

	pub fn with_bootstrap(mut self, bootstrap: NetworkBootstrap) -> Self {
		self.bootstrap = bootstrap;
		self
	}

	pub fn account(&self) -> Option<&str> {
		self.account.as_deref()
	}

	pub fn chain(&self) -> &ChainDescriptor {
		&self.chain
	}

	pub fn bootstrap(&self) -> &NetworkBootstrap {
		&self.bootstrap
	}

	pub fn handle(&self) -> &dyn WalletHandle {
		self.handle.as_ref()
	}

	fn wallet(&self) -> Option<&dyn WalletHandle> {
		Some(self.handle.as_ref())
	}

	/// Requests account access, then puts the wallet on the required chain.
	pub async fn connect(&mut self) -> Result<String, SessionError> {
		let accounts: Vec<String> =
			invoke_as(self.wallet(), &RpcCall::new(methods::REQUEST_ACCOUNTS)).await?;
		let account = accounts.into_iter().next().ok_or(SessionError::NoAccounts)?;

		info!("Connected {} via {}", account, self.handle.name());
		self.account = Some(account.clone());

		self.bootstrap
			.ensure_chain(self.wallet(), &self.chain)
			.await
			.into_result()?;

		Ok(account)
	}

	/// Reconnects silently when the wallet already authorised an account.
	///
	/// Failures are logged, never returned.
	pub async fn check_connection(&mut self) -> Option<String> {
		let accounts: Vec<String> =
			match invoke_as(self.wallet(), &RpcCall::new(methods::ACCOUNTS)).await {
				Ok(accounts) => accounts,
				Err(e) => {
					error!("Error checking connection: {}", e);
					return None;
				}
			};

		if accounts.is_empty() {
			debug!("No authorised accounts");
			return None;
		}

		match self.connect().await {
			Ok(account) => Some(account),
			Err(e) => {
				error!("Error reconnecting wallet: {}", e);
				None
			}
		}
	}

	/// Sends `text` as calldata to the message contract and waits for it to be mined.
	pub async fn send_message(&self, text: &str) -> Result<MessageReceipt, SessionError> {
		let account = self.account.clone().ok_or(SessionError::NotConnected)?;

		let message = match text.trim() {
			"" => self.settings.default_message.clone(),
			trimmed => trimmed.to_string(),
		};

		if let Err(e) = ensure_active_chain(&self.bootstrap, self.wallet(), &self.chain).await {
			warn!("Network check failed, sending anyway: {}", e);
		}

		self.check_balance(&account).await?;

		let data = format!("0x{}", hex::encode(message.as_bytes()));
		let tx = json!({
			"from": account,
			"to": self.settings.contract_address,
			"data": data,
			"value": "0x0",
		});

		info!("Sending \"{}\" to {}", message, self.settings.contract_address);
		let hash = match self.send_transaction(tx.clone()).await {
			Ok(hash) => hash,
			Err(e) if e.is_user_rejection() => return Err(e),
			Err(e) => {
				warn!(
					"Transaction failed ({}), retrying with gas limit {}",
					e, self.settings.fallback_gas_limit
				);
				let mut retry = tx;
				retry["gas"] = json!(format!("{:#x}", self.settings.fallback_gas_limit));
				self.send_transaction(retry).await?
			}
		};
		info!(tx_hash = %hash, "Transaction sent, waiting for confirmation");

		let receipt = self.wait_for_receipt(&hash).await?;
		let hash = format!("{:#x}", receipt.transaction_hash);

		if !receipt.status() {
			return Err(SessionError::Reverted(hash));
		}

		let block_number = receipt.block_number.unwrap_or_default();
		let cost = U256::from(receipt.gas_used) * U256::from(receipt.effective_gas_price);

		info!(
			block = block_number,
			gas_used = receipt.gas_used,
			"Transaction confirmed"
		);

		Ok(MessageReceipt {
			explorer_url: self.chain.explorer_tx_url(&hash),
			hash,
			block_number,
			gas_used: receipt.gas_used,
			cost,
			symbol: self.chain.native_currency.symbol.clone(),
			contract: self.settings.contract_address.clone(),
			message,
		})
	}

	/// Current balance of `account` in wei.
	pub async fn balance(&self, account: &str) -> Result<U256, SessionError> {
		let call =
			RpcCall::new(methods::GET_BALANCE).with_params(vec![json!(account), json!("latest")]);
		Ok(invoke_as(self.wallet(), &call).await?)
	}

	/// Gas price the wallet reports, 1 gwei when it cannot tell.
	pub async fn gas_price(&self) -> U256 {
		match invoke_as::<U256>(self.wallet(), &RpcCall::new(methods::GAS_PRICE)).await {
			Ok(price) if !price.is_zero() => price,
			Ok(_) => U256::from(FALLBACK_GAS_PRICE),
			Err(e) => {
				debug!("Gas price unavailable ({}), assuming 1 gwei", e);
				U256::from(FALLBACK_GAS_PRICE)
			}
		}
	}

	async fn check_balance(&self, account: &str) -> Result<(), SessionError> {
		let required = parse_ether(&self.settings.min_balance).map_err(|e| {
			SessionError::InvalidSetting(format!(
				"min_balance '{}': {}",
				self.settings.min_balance, e
			))
		})?;

		let balance = self.balance(account).await?;
		debug!("Balance of {}: {}", account, format_ether(balance));

		if balance < required {
			return Err(SessionError::InsufficientBalance {
				balance: format_ether(balance),
				required: self.settings.min_balance.clone(),
				symbol: self.chain.native_currency.symbol.clone(),
				hint: self
					.settings
					.faucet_url
					.as_ref()
					.map(|url| format!(" Get more tokens from: {}", url))
					.unwrap_or_default(),
			});
		}
		Ok(())
	}

	async fn send_transaction(&self, tx: Value) -> Result<String, SessionError> {
		let call = RpcCall::new(methods::SEND_TRANSACTION).with_params(vec![tx]);
		Ok(invoke_as(self.wallet(), &call).await?)
	}

	async fn wait_for_receipt(&self, hash: &str) -> Result<TransactionReceipt, SessionError> {
		let timeout = Duration::from_secs(self.settings.receipt_timeout_secs);
		let poll_interval = Duration::from_millis(self.settings.poll_interval_ms);
		let deadline = tokio::time::Instant::now() + timeout;
		let call = RpcCall::new(methods::GET_TRANSACTION_RECEIPT).with_params(vec![json!(hash)]);

		loop {
			let receipt: Option<TransactionReceipt> = invoke_as(self.wallet(), &call).await?;
			if let Some(receipt) = receipt {
				return Ok(receipt);
			}

			if tokio::time::Instant::now() >= deadline {
				return Err(SessionError::ReceiptTimeout {
					hash: hash.to_string(),
					secs: timeout.as_secs(),
				});
			}

			debug!(tx_hash = %hash, "Receipt not available yet");
			tokio::time::sleep(poll_interval).await;
		}
	}
}

//! Native-token transfer signed with a local private key.
//!
//! Unlike the message flow this does not go through a wallet: the key is read
//! from configuration and the transaction is submitted straight to an RPC node.

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::utils::{format_ether, parse_ether, parse_units};
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{bail, Context, Result};
use std::fmt;
use tracing::info;
use wallet_config::TransferSettings;

/// Outcome of a mined transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
	pub hash: String,
	pub from: Address,
	pub to: Address,
	pub value: U256,
	pub block_number: Option<u64>,
	pub gas_used: u64,
	pub success: bool,
	pub explorer_url: Option<String>,
}

impl fmt::Display for TransferReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Sent {} from {} to {}", format_ether(self.value), self.from, self.to)?;
		writeln!(f, "  Transaction hash: {}", self.hash)?;
		match self.block_number {
			Some(block) => writeln!(f, "  Block number:     {}", block)?,
			None => writeln!(f, "  Block number:     pending")?,
		}
		writeln!(f, "  Gas used:         {}", self.gas_used)?;
		write!(
			f,
			"  Status:           {}",
			if self.success { "success" } else { "failed" }
		)?;
		if let Some(url) = &self.explorer_url {
			write!(f, "\n  Explorer:         {}", url)?;
		}
		Ok(())
	}
}

/// Parsed and checked transfer parameters.
struct TransferPlan {
	signer: PrivateKeySigner,
	to: Address,
	value: U256,
	gas_limit: Option<u64>,
	max_fee_per_gas: Option<u128>,
	max_priority_fee_per_gas: Option<u128>,
}

impl TransferPlan {
	fn from_settings(settings: &TransferSettings) -> Result<Self> {
		let signer: PrivateKeySigner = settings
			.private_key
			.parse()
			.context("Invalid transfer.private_key")?;
		let to: Address = settings
			.to_address
			.parse()
			.with_context(|| format!("Invalid transfer.to_address: {}", settings.to_address))?;
		let value = parse_ether(&settings.amount)
			.with_context(|| format!("Invalid transfer.amount: {}", settings.amount))?;

		Ok(Self {
			signer,
			to,
			value,
			gas_limit: settings.gas_limit,
			max_fee_per_gas: settings
				.max_fee_per_gas_gwei
				.as_deref()
				.map(gwei_to_wei)
				.transpose()?,
			max_priority_fee_per_gas: settings
				.max_priority_fee_per_gas_gwei
				.as_deref()
				.map(gwei_to_wei)
				.transpose()?,
		})
	}
}

/// Converts a decimal gwei amount ("1.5") into wei.
pub fn gwei_to_wei(gwei: &str) -> Result<u128> {
	let wei: U256 = parse_units(gwei, "gwei")
		.with_context(|| format!("Invalid gwei amount: {}", gwei))?
		.into();
	if wei > U256::from(u128::MAX) {
		bail!("Fee too large: {} gwei", gwei);
	}
	Ok(wei.to::<u128>())
}

/// Signs and submits the configured transfer, then waits for its receipt.
pub async fn transfer(settings: &TransferSettings) -> Result<TransferReport> {
	let plan = TransferPlan::from_settings(settings)?;
	let from = plan.signer.address();

	let url: reqwest::Url = settings
		.rpc_url
		.parse()
		.with_context(|| format!("Invalid transfer.rpc_url: {}", settings.rpc_url))?;
	let provider = ProviderBuilder::new()
		.wallet(EthereumWallet::from(plan.signer))
		.connect_http(url);

	let balance = provider
		.get_balance(from)
		.await
		.context("Failed to fetch balance")?;
	info!("Balance of {}: {}", from, format_ether(balance));
	if balance < plan.value {
		bail!(
			"Insufficient balance: have {}, need {}",
			format_ether(balance),
			format_ether(plan.value)
		);
	}

	let mut tx = TransactionRequest::default()
		.with_from(from)
		.with_to(plan.to)
		.with_value(plan.value);

	let gas_limit = match plan.gas_limit {
		Some(limit) => limit,
		None => provider
			.estimate_gas(tx.clone())
			.await
			.context("Failed to estimate gas")?,
	};
	tx = tx.with_gas_limit(gas_limit);

	if let Some(fee) = plan.max_fee_per_gas {
		tx = tx.with_max_fee_per_gas(fee);
	}
	if let Some(tip) = plan.max_priority_fee_per_gas {
		tx = tx.with_max_priority_fee_per_gas(tip);
	}

	info!(
		gas_limit,
		"Sending {} to {}",
		format_ether(plan.value),
		plan.to
	);
	let pending = provider
		.send_transaction(tx)
		.await
		.context("Failed to send transaction")?;
	let hash = format!("{:#x}", pending.tx_hash());
	info!(tx_hash = %hash, "Transaction sent, waiting for receipt");

	let receipt = pending
		.get_receipt()
		.await
		.context("Failed to get transaction receipt")?;

	Ok(TransferReport {
		explorer_url: settings
			.explorer_url
			.as_deref()
			.map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), hash)),
		hash,
		from,
		to: plan.to,
		value: plan.value,
		block_number: receipt.block_number,
		gas_used: receipt.gas_used,
		success: receipt.status(),
	})
}

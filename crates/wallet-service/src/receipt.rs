//! Summary of a mined message transaction.

use alloy::primitives::utils::format_ether;
use alloy::primitives::U256;
use std::fmt;

/// Result of a successful message transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageReceipt {
	pub hash: String,
	pub block_number: u64,
	pub gas_used: u64,
	/// Wei spent on gas
	pub cost: U256,
	pub symbol: String,
	pub contract: String,
	pub message: String,
	pub explorer_url: Option<String>,
}

impl MessageReceipt {
	/// Gas cost in native units.
	pub fn cost_formatted(&self) -> String {
		format_ether(self.cost)
	}
}

impl fmt::Display for MessageReceipt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Message \"{}\" sent to {}", self.message, self.contract)?;
		writeln!(f, "  Transaction hash: {}", self.hash)?;
		writeln!(f, "  Block number:     {}", self.block_number)?;
		writeln!(f, "  Gas used:         {}", self.gas_used)?;
		write!(f, "  Cost:             {} {}", self.cost_formatted(), self.symbol)?;
		if let Some(url) = &self.explorer_url {
			write!(f, "\n  Explorer:         {}", url)?;
		}
		Ok(())
	}
}

//! Outcome of a network switch attempt.

use crate::errors::{ProviderRpcError, Result, WalletError};

#[derive(Debug)]
pub enum SwitchOutcome {
	/// The wallet is now on the requested chain.
	Switched,
	/// The wallet rejected the switch because it does not know the chain.
	NotRegistered(i64),
	/// Terminal failure; carries the error the wallet reported.
	Failed(WalletError),
}

impl SwitchOutcome {
	pub fn is_switched(&self) -> bool {
		matches!(self, SwitchOutcome::Switched)
	}

	pub fn into_result(self) -> Result<()> {
		match self {
			SwitchOutcome::Switched => Ok(()),
			SwitchOutcome::NotRegistered(code) => Err(WalletError::Rpc(ProviderRpcError::new(
				code,
				"Chain is not registered in the wallet",
			))),
			SwitchOutcome::Failed(err) => Err(err),
		}
	}
}

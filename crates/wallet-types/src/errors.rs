//! Error types for wallet interaction.

use crate::chain::ChainId;
use crate::rpc::codes;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WalletError>;

/// A rejection reported by a wallet.
///
/// Keeps the raw payload because wallets disagree on where the error code
/// lives: top-level `code`, nested `error.code`, or `status`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ProviderRpcError {
	message: String,
	payload: Value,
}

impl ProviderRpcError {
	pub fn new(code: i64, message: impl Into<String>) -> Self {
		let message = message.into();
		Self {
			payload: json!({ "code": code, "message": message }),
			message,
		}
	}

	/// An error that carries no code at all.
	pub fn from_message(message: impl Into<String>) -> Self {
		let message = message.into();
		Self {
			payload: json!({ "message": message }),
			message,
		}
	}

	pub fn from_payload(payload: Value) -> Self {
		let message = payload
			.get("message")
			.and_then(Value::as_str)
			.or_else(|| {
				payload
					.get("error")
					.and_then(|e| e.get("message"))
					.and_then(Value::as_str)
			})
			.map(str::to_string)
			.unwrap_or_else(|| payload.to_string());

		Self { message, payload }
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn payload(&self) -> &Value {
		&self.payload
	}

	/// Error code, looked up in `code`, then `error.code`, then `status`.
	pub fn code(&self) -> Option<i64> {
		self.payload
			.get("code")
			.and_then(Value::as_i64)
			.or_else(|| {
				self.payload
					.get("error")
					.and_then(|e| e.get("code"))
					.and_then(Value::as_i64)
			})
			.or_else(|| self.payload.get("status").and_then(Value::as_i64))
	}

	fn data_code(&self) -> Option<i64> {
		self.payload
			.get("data")
			.and_then(|d| d.get("code"))
			.and_then(Value::as_i64)
	}

	pub fn is_user_rejection(&self) -> bool {
		self.code() == Some(codes::USER_REJECTED) || self.data_code() == Some(codes::USER_REJECTED)
	}
}

#[derive(Error, Debug)]
pub enum WalletError {
	#[error("No wallet provider available")]
	NoProvider,

	#[error("Wallet provider does not support request/send")]
	UnsupportedProvider,

	#[error("Unsupported call shape for legacy provider: {0}")]
	UnsupportedCallShape(String),

	#[error("Legacy wallet send failed: {0}")]
	LegacyBridge(ProviderRpcError),

	#[error(transparent)]
	Rpc(#[from] ProviderRpcError),

	#[error("Failed to add chain {chain_id}: {source}. Please add it manually in your wallet.")]
	ChainAddFailed {
		chain_id: ChainId,
		#[source]
		source: Box<WalletError>,
	},

	#[error("Wallet did not respond within {0:?}")]
	Timeout(Duration),

	#[error("Wallet selection error: {0}")]
	Selection(String),

	#[error("Transport error: {0}")]
	Transport(String),

	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

impl WalletError {
	/// The wallet error carried by this error, if it came from a wallet.
	pub fn rpc_error(&self) -> Option<&ProviderRpcError> {
		match self {
			WalletError::Rpc(e) | WalletError::LegacyBridge(e) => Some(e),
			_ => None,
		}
	}

	/// Error code reported by the wallet, if any.
	pub fn code(&self) -> Option<i64> {
		self.rpc_error().and_then(ProviderRpcError::code)
	}

	/// Whether the user declined the wallet prompt.
	pub fn is_user_rejection(&self) -> bool {
		match self {
			WalletError::ChainAddFailed { source, .. } => source.is_user_rejection(),
			other => other
				.rpc_error()
				.map(ProviderRpcError::is_user_rejection)
				.unwrap_or(false),
		}
	}
}

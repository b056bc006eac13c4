//! JSON-RPC over HTTP wallet backend.
//!
//! Speaks the modern calling convention. Useful against an EIP-1193 proxy
//! in front of a browser wallet or against a dev node with unlocked accounts.

use crate::handle::{RequestCapability, WalletHandle};
use alloy::rpc::client::RpcClient;
use alloy::transports::http::Http;
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use wallet_types::{ProviderRpcError, Result, RpcCall, WalletError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Wallet reached through a JSON-RPC endpoint.
pub struct HttpWallet {
	name: String,
	endpoint: String,
	client: RpcClient,
}

impl HttpWallet {
	pub fn new(endpoint: impl Into<String>) -> Result<Self> {
		Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
	}

	pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
		let endpoint = endpoint.into();
		if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
			return Err(WalletError::Transport(format!(
				"Wallet endpoint must start with http:// or https://: {}",
				endpoint
			)));
		}

		let url: reqwest::Url = endpoint
			.parse()
			.map_err(|e| WalletError::Transport(format!("Invalid wallet endpoint {}: {}", endpoint, e)))?;
		let http = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| WalletError::Transport(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			name: format!("http({})", endpoint),
			endpoint,
			client: RpcClient::new(Http::with_client(http, url), false),
		})
	}
}

/// Maps an alloy transport failure onto the wallet error taxonomy.
fn map_rpc_error(endpoint: &str, error: RpcError<TransportErrorKind>) -> WalletError {
	match error {
		RpcError::ErrorResp(payload) => match serde_json::to_value(&payload) {
			Ok(value) => WalletError::Rpc(ProviderRpcError::from_payload(value)),
			Err(_) => WalletError::Rpc(ProviderRpcError::new(payload.code, payload.message)),
		},
		RpcError::Transport(TransportErrorKind::HttpError(http)) => {
			// Some endpoints answer errors with a non-2xx status and a JSON body
			match serde_json::from_str::<Value>(&http.body)
				.ok()
				.and_then(|body| body.get("error").cloned())
			{
				Some(error) => WalletError::Rpc(ProviderRpcError::from_payload(error)),
				None => WalletError::Transport(format!(
					"Wallet endpoint {} returned status {}",
					endpoint, http.status
				)),
			}
		}
		RpcError::DeserError { err, text } => {
			WalletError::InvalidResponse(format!("Failed to decode response ({}): {}", err, text))
		}
		other => WalletError::Transport(format!("Request to {} failed: {}", endpoint, other)),
	}
}

#[async_trait]
impl RequestCapability for HttpWallet {
	async fn request(&self, call: &RpcCall) -> Result<Value> {
		debug!(endpoint = %self.endpoint, method = call.method(), "POST wallet request");

		let result = self
			.client
			.request::<_, Value>(call.method().to_string(), call.params_value())
			.await;

		match result {
			Ok(value) => Ok(value),
			// A `null` result is a valid answer (e.g. a successful add-chain)
			Err(RpcError::NullResp) => Ok(Value::Null),
			Err(e) => Err(map_rpc_error(&self.endpoint, e)),
		}
	}
}

impl WalletHandle for HttpWallet {
	fn name(&self) -> &str {
		&self.name
	}

	fn request_capability(&self) -> Option<&dyn RequestCapability> {
		Some(self)
	}
}

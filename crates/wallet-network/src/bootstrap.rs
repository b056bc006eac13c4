//! Switch-or-add handshake against a wallet.

use std::time::Duration;
use tracing::{error, info, warn};
use wallet_provider::{invoke, WalletHandle};
use wallet_types::{codes, ChainDescriptor, RpcCall, SwitchOutcome, WalletError};

/// Drives a wallet onto a required chain.
///
/// ```text
/// START -> SWITCH_PENDING -> DONE
///                         -> ADD_PENDING -> DONE | FAILED   (unregistered code)
///                         -> FAILED                          (any other error)
/// ```
///
/// Only codes in the unregistered set trigger the add step. By default that
/// set is just `4902`; `-32603` is a generic internal error and has to be
/// opted into for wallets that are known to report missing chains with it.
///
/// With a switch timeout the whole handshake is raced against the clock; a
/// wallet that answers later is ignored.
#[derive(Debug, Clone)]
pub struct NetworkBootstrap {
	unregistered_codes: Vec<i64>,
	switch_timeout: Option<Duration>,
}

impl Default for NetworkBootstrap {
	fn default() -> Self {
		Self {
			unregistered_codes: vec![codes::UNRECOGNIZED_CHAIN],
			switch_timeout: None,
		}
	}
}

impl NetworkBootstrap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds codes that also mean "chain not registered".
	pub fn with_unregistered_codes(mut self, extra: impl IntoIterator<Item = i64>) -> Self {
		for code in extra {
			if !self.unregistered_codes.contains(&code) {
				self.unregistered_codes.push(code);
			}
		}
		self
	}

	pub fn unregistered_codes(&self) -> &[i64] {
		&self.unregistered_codes
	}

	/// Gives up on the wallet after `limit`.
	pub fn with_switch_timeout(mut self, limit: Duration) -> Self {
		self.switch_timeout = Some(limit);
		self
	}

	pub fn switch_timeout(&self) -> Option<Duration> {
		self.switch_timeout
	}

	/// Classifies a failed switch. Never returns `Switched`.
	pub fn classify(&self, error: WalletError) -> SwitchOutcome {
		match error.code() {
			Some(code) if self.unregistered_codes.contains(&code) => {
				SwitchOutcome::NotRegistered(code)
			}
			_ => SwitchOutcome::Failed(error),
		}
	}

	/// Makes `descriptor` the wallet's active chain.
	///
	/// Issues one switch request; if the wallet reports the chain as
	/// unregistered, issues one add request with the full descriptor. The
	/// switch always resolves before the add is sent. Errors other than an
	/// unregistered chain are returned untouched inside `Failed`. When the
	/// switch timeout elapses first the outcome is `Failed(Timeout)`.
	pub async fn ensure_chain(
		&self,
		handle: Option<&dyn WalletHandle>,
		descriptor: &ChainDescriptor,
	) -> SwitchOutcome {
		let limit = match self.switch_timeout {
			Some(limit) => limit,
			None => return self.handshake(handle, descriptor).await,
		};

		match tokio::time::timeout(limit, self.handshake(handle, descriptor)).await {
			Ok(outcome) => outcome,
			Err(_) => {
				error!(
					"Wallet did not finish switching to {} within {:?}",
					descriptor.chain_name, limit
				);
				SwitchOutcome::Failed(WalletError::Timeout(limit))
			}
		}
	}

	async fn handshake(
		&self,
		handle: Option<&dyn WalletHandle>,
		descriptor: &ChainDescriptor,
	) -> SwitchOutcome {
		let chain_id = descriptor.chain_id;

		let switch_error = match invoke(handle, &RpcCall::switch_chain(chain_id)).await {
			Ok(_) => {
				info!("Switched to {} ({})", descriptor.chain_name, chain_id);
				return SwitchOutcome::Switched;
			}
			Err(e) => e,
		};

		let code = match self.classify(switch_error) {
			SwitchOutcome::NotRegistered(code) => code,
			outcome => {
				if let SwitchOutcome::Failed(e) = &outcome {
					error!("Failed to switch network to {}: {}", chain_id, e);
				}
				return outcome;
			}
		};

		warn!(
			code,
			"Wallet does not know {} ({}), adding it", descriptor.chain_name, chain_id
		);

		match invoke(handle, &RpcCall::add_chain(descriptor)).await {
			Ok(_) => {
				info!("Added and switched to {} ({})", descriptor.chain_name, chain_id);
				SwitchOutcome::Switched
			}
			Err(add_error) => {
				error!("Failed to add {}: {}", descriptor.chain_name, add_error);
				SwitchOutcome::Failed(WalletError::ChainAddFailed {
					chain_id,
					source: Box::new(add_error),
				})
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use serde_json::{json, Value};
	use std::sync::atomic::{AtomicBool, Ordering};
	use wallet_provider::implementations::{Capability, InMemoryWallet};
	use wallet_provider::RequestCapability;
	use wallet_types::{methods, ChainId, ProviderRpcError};

	fn descriptor() -> ChainDescriptor {
		ChainDescriptor {
			rpc_urls: vec!["https://testnet-rpc.example/rpc".to_string()],
			..ChainDescriptor::irys_testnet()
		}
	}

	#[tokio::test]
	async fn test_already_on_chain_never_adds() {
		let wallet = InMemoryWallet::new(ChainId(1270));
		let outcome = NetworkBootstrap::new()
			.ensure_chain(Some(&wallet), &descriptor())
			.await;

		assert!(outcome.is_switched());
		assert_eq!(wallet.call_count(methods::SWITCH_CHAIN), 1);
		assert_eq!(wallet.call_count(methods::ADD_CHAIN), 0);
	}

	#[tokio::test]
	async fn test_known_chain_switches_without_add() {
		let wallet = InMemoryWallet::new(ChainId::ETHEREUM).with_known_chain(ChainId(1270));
		let outcome = NetworkBootstrap::new()
			.ensure_chain(Some(&wallet), &descriptor())
			.await;

		assert!(outcome.is_switched());
		assert_eq!(wallet.active_chain(), ChainId(1270));
		assert_eq!(wallet.call_count(methods::ADD_CHAIN), 0);
	}

	#[tokio::test]
	async fn test_unregistered_chain_is_added_once() {
		let wallet = InMemoryWallet::new(ChainId::ETHEREUM);
		let descriptor = descriptor();

		let outcome = NetworkBootstrap::new()
			.ensure_chain(Some(&wallet), &descriptor)
			.await;

		assert!(outcome.is_switched());
		assert_eq!(wallet.active_chain(), ChainId(1270));

		let calls = wallet.calls();
		assert_eq!(calls.len(), 2);
		assert_eq!(calls[0].method(), methods::SWITCH_CHAIN);
		assert_eq!(calls[0].params_value(), json!([{ "chainId": "0x4f6" }]));
		assert_eq!(calls[1].method(), methods::ADD_CHAIN);
		assert_eq!(
			calls[1].params_value(),
			json!([descriptor.to_add_chain_param()])
		);
	}

	#[tokio::test]
	async fn test_add_failure_is_surfaced_with_guidance() {
		let wallet = InMemoryWallet::new(ChainId::ETHEREUM);
		let add_error = ProviderRpcError::new(4001, "User rejected the request.");
		wallet.fail_next(methods::ADD_CHAIN, add_error.clone());

		let outcome = NetworkBootstrap::new()
			.ensure_chain(Some(&wallet), &descriptor())
			.await;

		match outcome {
			SwitchOutcome::Failed(WalletError::ChainAddFailed { chain_id, source }) => {
				assert_eq!(chain_id, ChainId(1270));
				match *source {
					WalletError::Rpc(ref e) => assert_eq!(e, &add_error),
					ref other => panic!("Expected rpc add error, got {:?}", other),
				}
			}
			other => panic!("Expected ChainAddFailed, got {:?}", other),
		}
		assert_eq!(wallet.call_count(methods::ADD_CHAIN), 1);
		assert_eq!(wallet.active_chain(), ChainId::ETHEREUM);
	}

	#[tokio::test]
	async fn test_other_switch_error_propagates_unchanged() {
		let wallet = InMemoryWallet::new(ChainId::ETHEREUM);
		let original = ProviderRpcError::new(-32603, "Internal JSON-RPC error.");
		wallet.fail_next(methods::SWITCH_CHAIN, original.clone());

		let outcome = NetworkBootstrap::new()
			.ensure_chain(Some(&wallet), &descriptor())
			.await;

		match outcome {
			SwitchOutcome::Failed(WalletError::Rpc(e)) => assert_eq!(e, original),
			other => panic!("Expected original switch error, got {:?}", other),
		}
		assert_eq!(wallet.call_count(methods::ADD_CHAIN), 0);
	}

	#[tokio::test]
	async fn test_internal_error_code_can_be_opted_in() {
		let wallet = InMemoryWallet::new(ChainId::ETHEREUM);
		wallet.fail_next(
			methods::SWITCH_CHAIN,
			ProviderRpcError::new(codes::INTERNAL_ERROR, "Internal JSON-RPC error."),
		);

		let bootstrap = NetworkBootstrap::new().with_unregistered_codes([codes::INTERNAL_ERROR]);
		let outcome = bootstrap.ensure_chain(Some(&wallet), &descriptor()).await;

		assert!(outcome.is_switched());
		assert_eq!(wallet.call_count(methods::ADD_CHAIN), 1);
	}

	#[tokio::test]
	async fn test_code_in_nested_error_or_status() {
		for payload in [
			json!({ "error": { "code": 4902, "message": "Unknown chain" } }),
			json!({ "status": 4902, "message": "Unknown chain" }),
		] {
			let wallet = InMemoryWallet::new(ChainId::ETHEREUM);
			wallet.fail_next(methods::SWITCH_CHAIN, ProviderRpcError::from_payload(payload));

			let outcome = NetworkBootstrap::new()
				.ensure_chain(Some(&wallet), &descriptor())
				.await;

			assert!(outcome.is_switched());
			assert_eq!(wallet.call_count(methods::ADD_CHAIN), 1);
		}
	}

	#[tokio::test]
	async fn test_legacy_wallet_unregistered_chain() {
		let wallet = InMemoryWallet::new(ChainId::ETHEREUM).with_capability(Capability::Legacy);
		let outcome = NetworkBootstrap::new()
			.ensure_chain(Some(&wallet), &descriptor())
			.await;

		assert!(outcome.is_switched());
		assert_eq!(wallet.active_chain(), ChainId(1270));
		assert_eq!(wallet.call_count(methods::ADD_CHAIN), 1);
	}

	#[tokio::test]
	async fn test_missing_handle_fails() {
		let outcome = NetworkBootstrap::new().ensure_chain(None, &descriptor()).await;
		assert!(matches!(
			outcome,
			SwitchOutcome::Failed(WalletError::NoProvider)
		));
	}

	#[tokio::test]
	async fn test_unsupported_wallet_never_adds() {
		let wallet = InMemoryWallet::new(ChainId::ETHEREUM).with_capability(Capability::None);
		let outcome = NetworkBootstrap::new()
			.ensure_chain(Some(&wallet), &descriptor())
			.await;

		assert!(matches!(
			outcome,
			SwitchOutcome::Failed(WalletError::UnsupportedProvider)
		));
	}

	#[tokio::test]
	async fn test_second_call_is_a_plain_switch() {
		let wallet = InMemoryWallet::new(ChainId::ETHEREUM);
		let bootstrap = NetworkBootstrap::new();
		let descriptor = descriptor();

		assert!(bootstrap.ensure_chain(Some(&wallet), &descriptor).await.is_switched());
		assert!(bootstrap.ensure_chain(Some(&wallet), &descriptor).await.is_switched());

		assert_eq!(wallet.call_count(methods::SWITCH_CHAIN), 2);
		assert_eq!(wallet.call_count(methods::ADD_CHAIN), 1);
	}

	/// Wallet that takes `delay` to answer a switch and records whether it did.
	struct SlowWallet {
		delay: Duration,
		answered: AtomicBool,
	}

	#[async_trait]
	impl RequestCapability for SlowWallet {
		async fn request(&self, _call: &RpcCall) -> wallet_types::Result<Value> {
			tokio::time::sleep(self.delay).await;
			self.answered.store(true, Ordering::SeqCst);
			Ok(Value::Null)
		}
	}

	impl WalletHandle for SlowWallet {
		fn request_capability(&self) -> Option<&dyn RequestCapability> {
			Some(self)
		}
	}

	/// Wallet whose prompt is never answered.
	struct Unanswered;

	#[async_trait]
	impl RequestCapability for Unanswered {
		async fn request(&self, _call: &RpcCall) -> wallet_types::Result<Value> {
			std::future::pending().await
		}
	}

	impl WalletHandle for Unanswered {
		fn request_capability(&self) -> Option<&dyn RequestCapability> {
			Some(self)
		}
	}

	#[tokio::test]
	async fn test_unanswered_switch_times_out() {
		let limit = Duration::from_millis(50);
		let bootstrap = NetworkBootstrap::new().with_switch_timeout(limit);

		match bootstrap.ensure_chain(Some(&Unanswered), &descriptor()).await {
			SwitchOutcome::Failed(WalletError::Timeout(elapsed)) => assert_eq!(elapsed, limit),
			other => panic!("Expected timeout, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_late_answer_is_dropped() {
		let wallet = SlowWallet {
			delay: Duration::from_millis(200),
			answered: AtomicBool::new(false),
		};
		let bootstrap = NetworkBootstrap::new().with_switch_timeout(Duration::from_millis(20));

		let outcome = bootstrap.ensure_chain(Some(&wallet), &descriptor()).await;
		assert!(matches!(
			outcome,
			SwitchOutcome::Failed(WalletError::Timeout(_))
		));

		tokio::time::sleep(Duration::from_millis(300)).await;
		assert!(!wallet.answered.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn test_answer_within_timeout() {
		let wallet = SlowWallet {
			delay: Duration::from_millis(10),
			answered: AtomicBool::new(false),
		};
		let bootstrap = NetworkBootstrap::new().with_switch_timeout(Duration::from_secs(5));

		assert!(bootstrap.ensure_chain(Some(&wallet), &descriptor()).await.is_switched());
		assert!(wallet.answered.load(Ordering::SeqCst));
		assert_eq!(bootstrap.switch_timeout(), Some(Duration::from_secs(5)));
	}

	#[test]
	fn test_classify() {
		let bootstrap = NetworkBootstrap::new();
		assert!(matches!(
			bootstrap.classify(WalletError::Rpc(ProviderRpcError::new(4902, "x"))),
			SwitchOutcome::NotRegistered(4902)
		));
		assert!(matches!(
			bootstrap.classify(WalletError::Rpc(ProviderRpcError::new(-32603, "x"))),
			SwitchOutcome::Failed(_)
		));
		assert!(matches!(
			bootstrap.classify(WalletError::NoProvider),
			SwitchOutcome::Failed(WalletError::NoProvider)
		));

		let widened = NetworkBootstrap::new().with_unregistered_codes([4902, -32603]);
		assert_eq!(widened.unregistered_codes(), &[4902, -32603]);
	}
}

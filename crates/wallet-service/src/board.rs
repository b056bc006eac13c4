//! Read-only view of the message contract.
//!
//! Reads go straight to the chain's RPC node; no wallet is involved.

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::sol;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, warn};

sol! {
	/// Message log kept by the GM contract.
	#[sol(rpc)]
	interface IGmMessages {
		function getMessageCount() external view returns (uint256);
		function getMessage(uint256 index) external view returns (address sender, string message, uint256 timestamp, uint256 blockNumber);
		function getSenderMessageCount(address sender) external view returns (uint256);
	}
}

/// Messages shown by default, newest first.
pub const HISTORY_LIMIT: usize = 10;

/// One stored message.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardMessage {
	pub index: u64,
	pub sender: Address,
	pub text: String,
	pub timestamp: u64,
	pub block_number: u64,
}

impl BoardMessage {
	pub fn sent_at(&self) -> Option<DateTime<Utc>> {
		i64::try_from(self.timestamp)
			.ok()
			.and_then(|secs| DateTime::from_timestamp(secs, 0))
	}
}

impl fmt::Display for BoardMessage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "#{} {}", self.index, self.text)?;
		let sent_at = self
			.sent_at()
			.map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
			.unwrap_or_else(|| self.timestamp.to_string());
		write!(
			f,
			"    From: {} | {} | Block: {}",
			short_address(&self.sender),
			sent_at,
			self.block_number
		)
	}
}

/// `0x1234...abcd`
pub fn short_address(address: &Address) -> String {
	let full = address.to_string();
	format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

fn clamp_u64(value: U256) -> u64 {
	if value > U256::from(u64::MAX) {
		u64::MAX
	} else {
		value.to::<u64>()
	}
}

/// Message contract bound to a provider.
pub struct MessageBoard<P> {
	contract: IGmMessages::IGmMessagesInstance<P>,
}

/// Board reading through the HTTP node at `rpc_url`.
pub fn connect_board(rpc_url: &str, contract: &str) -> Result<MessageBoard<impl Provider>> {
	let url: reqwest::Url = rpc_url
		.parse()
		.with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;
	let contract: Address = contract
		.parse()
		.with_context(|| format!("Invalid contract address: {}", contract))?;

	debug!("Reading message contract {} via {}", contract, rpc_url);
	Ok(MessageBoard::new(contract, ProviderBuilder::new().connect_http(url)))
}

impl<P: Provider> MessageBoard<P> {
	pub fn new(contract: Address, provider: P) -> Self {
		Self {
			contract: IGmMessages::new(contract, provider),
		}
	}

	pub async fn message_count(&self) -> Result<U256> {
		self.contract
			.getMessageCount()
			.call()
			.await
			.context("Failed to read message count")
	}

	pub async fn sender_message_count(&self, sender: Address) -> Result<U256> {
		self.contract
			.getSenderMessageCount(sender)
			.call()
			.await
			.with_context(|| format!("Failed to read message count of {}", sender))
	}

	pub async fn message(&self, index: u64) -> Result<BoardMessage> {
		let stored = self
			.contract
			.getMessage(U256::from(index))
			.call()
			.await
			.with_context(|| format!("Failed to read message {}", index))?;

		Ok(BoardMessage {
			index,
			sender: stored.sender,
			text: stored.message,
			timestamp: clamp_u64(stored.timestamp),
			block_number: clamp_u64(stored.blockNumber),
		})
	}

	/// The last `limit` messages, newest first. Unreadable entries are skipped.
	pub async fn recent_messages(&self, limit: usize) -> Result<Vec<BoardMessage>> {
		let count = clamp_u64(self.message_count().await?);
		let start = count.saturating_sub(limit as u64);

		let mut messages = Vec::new();
		for index in (start..count).rev() {
			match self.message(index).await {
				Ok(message) => messages.push(message),
				Err(e) => warn!("Skipping message {}: {:#}", index, e),
			}
		}
		Ok(messages)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::sol_types::{SolCall, SolValue};
	use serde_json::{json, Value};
	use wiremock::matchers::method;
	use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

	const CONTRACT: &str = "0x9fc9B8893F462B4B9a7c0B12b07d2F3C57C40a53";
	const SENDER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

	/// Node answering `eth_call` for a contract holding `count` messages.
	/// Reading message `broken` reverts.
	struct Node {
		count: u64,
		sender_count: u64,
		broken: Option<u64>,
	}

	impl Node {
		fn answer(&self, data: &[u8]) -> std::result::Result<Vec<u8>, Value> {
			let selector: [u8; 4] = data[..4].try_into().unwrap();
			if selector == IGmMessages::getMessageCountCall::SELECTOR {
				Ok(U256::from(self.count).abi_encode())
			} else if selector == IGmMessages::getSenderMessageCountCall::SELECTOR {
				Ok(U256::from(self.sender_count).abi_encode())
			} else if selector == IGmMessages::getMessageCall::SELECTOR {
				let index = U256::from_be_slice(&data[4..36]).to::<u64>();
				if Some(index) == self.broken {
					return Err(json!({ "code": 3, "message": "execution reverted" }));
				}
				let sender: Address = SENDER.parse().unwrap();
				Ok((
					sender,
					format!("gm #{}", index),
					U256::from(1_700_000_000u64 + index),
					U256::from(100 + index),
				)
					.abi_encode_params())
			} else {
				Err(json!({ "code": 3, "message": "execution reverted" }))
			}
		}
	}

	impl Respond for Node {
		fn respond(&self, request: &Request) -> ResponseTemplate {
			let body: Value = serde_json::from_slice(&request.body).unwrap();
			let reply = match body["method"].as_str() {
				Some("eth_call") => {
					let tx = &body["params"][0];
					let input = tx["input"].as_str().or_else(|| tx["data"].as_str()).unwrap();
					let data = hex::decode(input.trim_start_matches("0x")).unwrap();
					match self.answer(&data) {
						Ok(output) => json!({ "result": format!("0x{}", hex::encode(output)) }),
						Err(error) => json!({ "error": error }),
					}
				}
				Some("eth_chainId") => json!({ "result": "0x4f6" }),
				_ => json!({ "result": null }),
			};

			let mut reply = reply;
			reply["jsonrpc"] = json!("2.0");
			reply["id"] = body["id"].clone();
			ResponseTemplate::new(200).set_body_json(reply)
		}
	}

	async fn board(node: Node) -> (MockServer, MessageBoard<impl Provider>) {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(node)
			.mount(&server)
			.await;
		let board = connect_board(&server.uri(), CONTRACT).unwrap();
		(server, board)
	}

	#[tokio::test]
	async fn test_counts() {
		let (_server, board) = board(Node {
			count: 42,
			sender_count: 3,
			broken: None,
		})
		.await;

		assert_eq!(board.message_count().await.unwrap(), U256::from(42));
		assert_eq!(
			board
				.sender_message_count(SENDER.parse().unwrap())
				.await
				.unwrap(),
			U256::from(3)
		);
	}

	#[tokio::test]
	async fn test_recent_messages_newest_first() {
		let (_server, board) = board(Node {
			count: 12,
			sender_count: 0,
			broken: None,
		})
		.await;

		let messages = board.recent_messages(HISTORY_LIMIT).await.unwrap();
		assert_eq!(messages.len(), 10);
		assert_eq!(messages[0].index, 11);
		assert_eq!(messages[0].text, "gm #11");
		assert_eq!(messages[0].block_number, 111);
		assert_eq!(messages[9].index, 2);
		assert_eq!(messages[0].sender, SENDER.parse::<Address>().unwrap());
	}

	#[tokio::test]
	async fn test_unreadable_message_is_skipped() {
		let (_server, board) = board(Node {
			count: 3,
			sender_count: 0,
			broken: Some(1),
		})
		.await;

		let indexes: Vec<u64> = board
			.recent_messages(HISTORY_LIMIT)
			.await
			.unwrap()
			.iter()
			.map(|m| m.index)
			.collect();
		assert_eq!(indexes, vec![2, 0]);
	}

	#[tokio::test]
	async fn test_empty_board() {
		let (_server, board) = board(Node {
			count: 0,
			sender_count: 0,
			broken: None,
		})
		.await;

		assert!(board.recent_messages(HISTORY_LIMIT).await.unwrap().is_empty());
	}

	#[test]
	fn test_connect_rejects_bad_input() {
		assert!(connect_board("not a url", CONTRACT).is_err());
		assert!(connect_board("http://127.0.0.1:8545", "0x1234").is_err());
	}

	#[test]
	fn test_message_display() {
		let message = BoardMessage {
			index: 7,
			sender: SENDER.parse().unwrap(),
			text: "GM".to_string(),
			timestamp: 1_700_000_000,
			block_number: 1234,
		};

		let text = message.to_string();
		assert!(text.starts_with("#7 GM"));
		assert!(text.contains("From: 0x7099...79C8"));
		assert!(text.contains("2023-11-14 22:13:20 UTC"));
		assert!(text.ends_with("Block: 1234"));
	}
}

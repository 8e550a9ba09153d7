//! Types for the transaction stream transport

use serde::{Deserialize, Serialize};

/// Where a subscription starts. Exactly one of hash or height is ever sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockLocator {
	/// Start from the block with this hash (display order hex).
	Hash(String),
	/// Start from this absolute height.
	Height(u32),
}

/// Options sent along with a subscription request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionOptions {
	/// The first block to stream.
	pub from: BlockLocator,
	/// Number of blocks to stream starting at `from`.
	pub count: u32,
}

/// A transaction the transport matched against the subscription filter.
///
/// The filter layer is probabilistic, so `addresses` must still be checked against the
/// watched address set before the transaction is considered part of the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
	/// Transaction id in display order hex.
	pub txid: String,
	/// Raw serialized transaction as hex.
	pub raw: String,
	/// Addresses touched by the transaction inputs and outputs.
	#[serde(default)]
	pub addresses: Vec<String>,
}

/// Header of a merkle block as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
	/// Hash of this block (display order hex).
	pub hash: String,
	/// Hash of the previous block, in wire (little-endian) byte order.
	pub prev_hash: String,
	/// Merkle root, in wire byte order.
	#[serde(default)]
	pub merkle_root: String,
	#[serde(default)]
	pub version: u32,
	#[serde(default)]
	pub time: u32,
	#[serde(default)]
	pub bits: u32,
	#[serde(default)]
	pub nonce: u32,
}

/// A compact block: header plus the transaction hashes it proves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleBlock {
	pub header: BlockHeader,
	/// Claimed transaction hashes, in wire byte order.
	#[serde(default)]
	pub hashes: Vec<String>,
}

/// One data frame of the stream. A frame may carry transactions, a merkle block, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
	#[serde(default)]
	pub transactions: Vec<WalletTransaction>,
	#[serde(default)]
	pub merkle_block: Option<MerkleBlock>,
}

/// A transaction inside a full block fetched by hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTransaction {
	pub txid: String,
	/// Special transaction type, 0 for classic transactions.
	#[serde(rename = "type", default)]
	pub tx_type: u16,
	/// Special payload. Coinbase payloads carry the block height.
	#[serde(default)]
	pub extra_payload: Option<serde_json::Value>,
}

/// A full block fetched by hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
	pub hash: String,
	#[serde(default)]
	pub transactions: Vec<BlockTransaction>,
}

/// Events pushed by a transaction stream, delivered in arrival order.
#[derive(Debug)]
pub enum StreamEvent {
	/// A data frame.
	Data(StreamResponse),
	/// The transport failed. No further events follow.
	Error(TransportError),
	/// The stream finished, either naturally or after a cancellation request.
	End,
}

/// Error types for transport operations
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	#[error("No data returned")]
	NoData,

	#[error("WebSocket error: {0}")]
	WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("Stream closed: {0}")]
	StreamClosed(String),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stream_response_accepts_partial_frames() {
		let only_block: StreamResponse = serde_json::from_str(
			r#"{"merkleBlock":{"header":{"hash":"aa","prevHash":"bb"},"hashes":["cc"]}}"#,
		)
		.unwrap();
		assert!(only_block.transactions.is_empty());
		let block = only_block.merkle_block.unwrap();
		assert_eq!(block.header.prev_hash, "bb");
		assert_eq!(block.hashes, vec!["cc".to_string()]);

		let only_txs: StreamResponse =
			serde_json::from_str(r#"{"transactions":[{"txid":"01","raw":"00"}]}"#).unwrap();
		assert_eq!(only_txs.transactions.len(), 1);
		assert!(only_txs.transactions[0].addresses.is_empty());
		assert!(only_txs.merkle_block.is_none());
	}

	#[test]
	fn block_transaction_reads_special_payload() {
		let block: Block = serde_json::from_str(
			r#"{"hash":"ff","transactions":[{"txid":"01","type":5,"extraPayload":{"version":2,"height":42}}]}"#,
		)
		.unwrap();
		let tx = &block.transactions[0];
		assert_eq!(tx.tx_type, 5);
		assert_eq!(
			tx.extra_payload.as_ref().and_then(|p| p.get("height")).and_then(|h| h.as_u64()),
			Some(42)
		);
	}
}

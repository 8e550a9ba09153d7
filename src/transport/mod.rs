//! Transport integration for filtered transaction streams
//!
//! This module defines the seam between the sync session and the remote service that streams
//! filtered transactions and merkle blocks for a set of watched addresses. It also ships a
//! WebSocket/HTTP client implementing that seam.

/// WebSocket and JSON-RPC client for the remote transport
mod client;
/// Cancellable stream handles
mod stream;
/// Wire types shared by every transport implementation
mod types;

pub use client::RemoteTransportClient;
pub use stream::{CancelToken, ChannelStream, TransactionStream};
pub use types::*;

/// Calls the sync session makes against the remote transport.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
	/// Open a subscription streaming transactions touching `addresses` plus merkle proofs.
	async fn subscribe_to_transactions_with_proofs(
		&self,
		addresses: &[String],
		options: &SubscriptionOptions,
	) -> Result<Box<dyn TransactionStream>, TransportError>;

	/// Fetch a full block by its display order hash.
	async fn get_block_by_hash(&self, hash: &str) -> Result<Block, TransportError>;
}

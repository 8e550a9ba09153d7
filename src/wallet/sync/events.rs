//! Event classification for wallet synchronization.
//!
//! A single stream frame may carry a batch of transactions, a merkle block, or both. This module
//! turns a frame into the ordered list of sync events the session handles, dropping filter false
//! positives on the way. Transactions always come before the merkle block of the same frame so
//! that the relevance check sees the freshly imported ids.

use crate::transport::{MerkleBlock, StreamResponse, WalletTransaction};

use std::collections::HashSet;

/// Events that occur during wallet synchronization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Transactions touching at least one watched address
    TransactionsReceived(Vec<WalletTransaction>),
    /// A merkle block, not yet checked for relevance
    MerkleBlockReceived(MerkleBlock),
}

/// Keep only transactions that touch a watched address.
pub fn filter_wallet_transactions(
    transactions: Vec<WalletTransaction>,
    addresses: &HashSet<String>,
) -> Vec<WalletTransaction> {
    transactions
        .into_iter()
        .filter(|tx| tx.addresses.iter().any(|address| addresses.contains(address)))
        .collect()
}

/// Convert a stream frame to sync events.
///
/// An empty (or fully filtered) transaction batch produces no event.
pub fn classify_response(response: StreamResponse, addresses: &HashSet<String>) -> Vec<SyncEvent> {
    let mut sync_events = Vec::new();

    let wallet_transactions = filter_wallet_transactions(response.transactions, addresses);
    if !wallet_transactions.is_empty() {
        sync_events.push(SyncEvent::TransactionsReceived(wallet_transactions));
    }

    if let Some(merkle_block) = response.merkle_block {
        sync_events.push(SyncEvent::MerkleBlockReceived(merkle_block));
    }

    sync_events
}

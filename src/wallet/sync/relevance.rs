//! Merkle block relevance.
//!
//! A merkle block is only worth importing when it proves a transaction the wallet already holds.
//! The claimed hashes travel in wire byte order while stored ids are display order.

use crate::transport::MerkleBlock;
use crate::utils::reverse_hex;

use std::collections::HashSet;
use tracing::debug;

/// Whether `merkle_block` claims at least one transaction the wallet already stores.
///
/// Claimed hashes arrive in wire byte order and are reversed before the lookup, `known_ids`
/// holds display order hex ids. Hashes that are not valid hex can never match and are skipped.
pub fn is_relevant(merkle_block: &MerkleBlock, known_ids: &HashSet<String>) -> bool {
	if known_ids.is_empty() {
		return false;
	}

	merkle_block.hashes.iter().any(|wire_hash| match reverse_hex(wire_hash) {
		Ok(txid) => known_ids.contains(&txid),
		Err(e) => {
			debug!(
				"Skipping malformed transaction hash {} in block {}: {}",
				wire_hash, merkle_block.header.hash, e
			);
			false
		}
	})
}

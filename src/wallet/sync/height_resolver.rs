//! Block height derivation.
//!
//! Merkle block headers do not carry their height. The height is recovered from the previous
//! block: its coinbase special payload embeds that block's height, and the header sits one above.
//! The payload is normally found on the transaction at index 0, some blocks carry it at index 1.

use crate::transport::{Block, BlockHeader, Transport};
use crate::utils::reverse_hex;
use crate::wallet::WalletSyncError;

use std::collections::HashMap;
use tracing::debug;

/// One way of reading a height out of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightSource {
	/// `extraPayload.height` of the transaction at this index.
	SpecialPayloadAt(usize),
}

/// Sources tried in order until one yields a height.
pub const DEFAULT_HEIGHT_SOURCES: [HeightSource; 2] = [
	HeightSource::SpecialPayloadAt(0),
	HeightSource::SpecialPayloadAt(1),
];

impl HeightSource {
	pub fn extract(&self, block: &Block) -> Option<u32> {
		match self {
			HeightSource::SpecialPayloadAt(index) => block
				.transactions
				.get(*index)?
				.extra_payload
				.as_ref()?
				.get("height")?
				.as_u64()
				.and_then(|height| u32::try_from(height).ok()),
		}
	}
}

/// Read the embedded height of `block`, trying `sources` in order.
pub fn embedded_height(block: &Block, sources: &[HeightSource]) -> Result<u32, WalletSyncError> {
	sources
		.iter()
		.find_map(|source| source.extract(block))
		.ok_or_else(|| WalletSyncError::MalformedBlockError {
			block_hash: block.hash.clone(),
			reason: format!("no height payload found using {:?}", sources),
		})
}

/// Resolves header heights through previous-block lookups, memoized for one session.
pub struct HeightResolver<'a> {
	transport: &'a dyn Transport,
	sources: Vec<HeightSource>,
	/// Embedded heights keyed by display order block hash
	resolved: HashMap<String, u32>,
}

impl<'a> HeightResolver<'a> {
	pub fn new(transport: &'a dyn Transport) -> Self {
		Self::with_sources(transport, DEFAULT_HEIGHT_SOURCES.to_vec())
	}

	pub fn with_sources(transport: &'a dyn Transport, sources: Vec<HeightSource>) -> Self {
		Self {
			transport,
			sources,
			resolved: HashMap::new(),
		}
	}

	/// Absolute height of `header`: the previous block's embedded height plus one.
	pub async fn resolve_height(&mut self, header: &BlockHeader) -> Result<u32, WalletSyncError> {
		let prev_hash = reverse_hex(&header.prev_hash).map_err(|e| {
			WalletSyncError::ParseError(format!(
				"Invalid previous block hash in header {}: {}",
				header.hash, e
			))
		})?;

		let prev_height = match self.resolved.get(&prev_hash) {
			Some(height) => *height,
			None => {
				let prev_block = self.transport.get_block_by_hash(&prev_hash).await?;
				let height = embedded_height(&prev_block, &self.sources)?;
				debug!("Block {} carries height {}", prev_hash, height);
				self.resolved.insert(prev_hash.clone(), height);
				height
			}
		};

		prev_height
			.checked_add(1)
			.ok_or_else(|| WalletSyncError::MalformedBlockError {
				block_hash: prev_hash,
				reason: format!("height {} cannot be followed", prev_height),
			})
	}
}

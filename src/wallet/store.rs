//! Storage collaborator used by the sync session.
//!
//! The session never owns wallet data. It reads the watched addresses and known transaction ids
//! through [`WalletStore`] and writes imports and the last synced height back through it.

use crate::transport::{BlockHeader, WalletTransaction};
use crate::wallet::WalletSyncError;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Wallet storage and import pipeline as seen by the sync session.
#[async_trait::async_trait]
pub trait WalletStore: Send + Sync {
	/// Addresses the next subscription should watch.
	async fn addresses_to_sync(&self) -> Result<Vec<String>, WalletSyncError>;

	/// Snapshot of the transaction ids already stored, in display order hex.
	async fn known_transaction_ids(&self) -> Result<HashSet<String>, WalletSyncError>;

	/// Import wallet transactions and return how many addresses were generated as a result.
	async fn import_transactions(
		&self,
		transactions: &[WalletTransaction],
	) -> Result<usize, WalletSyncError>;

	async fn import_block_header(&self, header: &BlockHeader) -> Result<(), WalletSyncError>;

	async fn last_synced_block_height(&self) -> Result<Option<u32>, WalletSyncError>;

	async fn set_last_synced_block_height(&self, height: u32) -> Result<(), WalletSyncError>;
}

/// Derives fresh addresses after an import, given the imported transactions and the
/// currently watched addresses.
pub type AddressDeriver = Arc<dyn Fn(&[WalletTransaction], &[String]) -> Vec<String> + Send + Sync>;

#[derive(Default)]
struct MemoryState {
	addresses: Vec<String>,
	transactions: HashMap<String, WalletTransaction>,
	headers: HashMap<String, BlockHeader>,
	last_synced_height: Option<u32>,
}

/// In-memory wallet store.
///
/// Address generation is delegated to an [`AddressDeriver`]; without one, imports never
/// generate addresses.
#[derive(Clone)]
pub struct MemoryWalletStore {
	state: Arc<Mutex<MemoryState>>,
	deriver: Option<AddressDeriver>,
}

impl MemoryWalletStore {
	pub fn new(addresses: Vec<String>) -> Self {
		Self {
			state: Arc::new(Mutex::new(MemoryState {
				addresses,
				..Default::default()
			})),
			deriver: None,
		}
	}

	pub fn with_address_deriver(mut self, deriver: AddressDeriver) -> Self {
		self.deriver = Some(deriver);
		self
	}

	pub fn with_last_synced_height(self, height: Option<u32>) -> Self {
		self.lock().last_synced_height = height;
		self
	}

	/// Insert a transaction without going through the import pipeline.
	pub fn insert_transaction(&self, transaction: WalletTransaction) {
		self.lock()
			.transactions
			.insert(transaction.txid.to_lowercase(), transaction);
	}

	pub fn has_header(&self, hash: &str) -> bool {
		self.lock().headers.contains_key(hash)
	}

	pub fn header_count(&self) -> usize {
		self.lock().headers.len()
	}

	pub fn transaction_count(&self) -> usize {
		self.lock().transactions.len()
	}

	pub fn addresses(&self) -> Vec<String> {
		self.lock().addresses.clone()
	}

	pub fn last_synced_height(&self) -> Option<u32> {
		self.lock().last_synced_height
	}

	fn lock(&self) -> MutexGuard<'_, MemoryState> {
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

#[async_trait::async_trait]
impl WalletStore for MemoryWalletStore {
	async fn addresses_to_sync(&self) -> Result<Vec<String>, WalletSyncError> {
		Ok(self.addresses())
	}

	async fn known_transaction_ids(&self) -> Result<HashSet<String>, WalletSyncError> {
		Ok(self.lock().transactions.keys().cloned().collect())
	}

	async fn import_transactions(
		&self,
		transactions: &[WalletTransaction],
	) -> Result<usize, WalletSyncError> {
		let mut state = self.lock();
		for transaction in transactions {
			state
				.transactions
				.insert(transaction.txid.to_lowercase(), transaction.clone());
		}

		let Some(deriver) = &self.deriver else {
			return Ok(0);
		};

		let mut generated = 0;
		for address in deriver(transactions, &state.addresses) {
			if !state.addresses.contains(&address) {
				state.addresses.push(address);
				generated += 1;
			}
		}

		debug!(
			"Imported {} transactions, generated {} addresses",
			transactions.len(),
			generated
		);
		Ok(generated)
	}

	async fn import_block_header(&self, header: &BlockHeader) -> Result<(), WalletSyncError> {
		self.lock()
			.headers
			.insert(header.hash.clone(), header.clone());
		Ok(())
	}

	async fn last_synced_block_height(&self) -> Result<Option<u32>, WalletSyncError> {
		Ok(self.last_synced_height())
	}

	async fn set_last_synced_block_height(&self, height: u32) -> Result<(), WalletSyncError> {
		self.lock().last_synced_height = Some(height);
		Ok(())
	}
}

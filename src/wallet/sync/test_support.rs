//! Scripted transport collaborators shared by the sync tests.

use crate::transport::{
	Block, BlockHeader, BlockTransaction, MerkleBlock, StreamEvent, StreamResponse,
	SubscriptionOptions, TransactionStream, Transport, TransportError, WalletTransaction,
};
use crate::utils::reverse_hex;
use crate::wallet::{MemoryWalletStore, WalletStore, WalletSyncError};

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Called each time a stream hands out `End`.
pub type EndHook = Arc<dyn Fn() + Send + Sync>;

/// A stream replaying a fixed list of events, then `End` forever.
pub struct ScriptedStream {
	events: VecDeque<StreamEvent>,
	cancels: Arc<AtomicUsize>,
	ends: Arc<AtomicUsize>,
	on_end: Option<EndHook>,
}

#[async_trait::async_trait]
impl TransactionStream for ScriptedStream {
	async fn next_event(&mut self) -> StreamEvent {
		let event = self.events.pop_front().unwrap_or(StreamEvent::End);
		if matches!(event, StreamEvent::End) {
			self.ends.fetch_add(1, Ordering::SeqCst);
			if let Some(hook) = &self.on_end {
				hook();
			}
		}
		event
	}

	fn cancel(&mut self) {
		self.cancels.fetch_add(1, Ordering::SeqCst);
	}
}

/// Transport whose subscriptions replay queued scripts and whose blocks come from a map.
#[derive(Default)]
pub struct MockTransport {
	scripts: Mutex<VecDeque<Vec<StreamEvent>>>,
	blocks: Mutex<HashMap<String, Block>>,
	subscriptions: Mutex<Vec<(Vec<String>, SubscriptionOptions)>>,
	fetches: Mutex<Vec<String>>,
	cancels: Arc<AtomicUsize>,
	ends: Arc<AtomicUsize>,
	on_end: Mutex<Option<EndHook>>,
}

impl MockTransport {
	/// Queue the events of the next subscription.
	pub fn push_script(&self, events: Vec<StreamEvent>) {
		self.scripts.lock().unwrap().push_back(events);
	}

	pub fn insert_block(&self, block: Block) {
		self.blocks.lock().unwrap().insert(block.hash.clone(), block);
	}

	pub fn subscriptions(&self) -> Vec<(Vec<String>, SubscriptionOptions)> {
		self.subscriptions.lock().unwrap().clone()
	}

	pub fn block_fetches(&self) -> Vec<String> {
		self.fetches.lock().unwrap().clone()
	}

	/// Cancellation requests across every stream handed out.
	pub fn cancel_requests(&self) -> usize {
		self.cancels.load(Ordering::SeqCst)
	}

	/// `End` events consumed across every stream handed out.
	pub fn end_events(&self) -> usize {
		self.ends.load(Ordering::SeqCst)
	}

	/// Run `hook` whenever a stream hands out `End`.
	pub fn set_on_end(&self, hook: EndHook) {
		*self.on_end.lock().unwrap() = Some(hook);
	}
}

#[async_trait::async_trait]
impl Transport for MockTransport {
	async fn subscribe_to_transactions_with_proofs(
		&self,
		addresses: &[String],
		options: &SubscriptionOptions,
	) -> Result<Box<dyn TransactionStream>, TransportError> {
		self.subscriptions
			.lock()
			.unwrap()
			.push((addresses.to_vec(), options.clone()));
		let events = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
		Ok(Box::new(ScriptedStream {
			events: events.into(),
			cancels: self.cancels.clone(),
			ends: self.ends.clone(),
			on_end: self.on_end.lock().unwrap().clone(),
		}))
	}

	async fn get_block_by_hash(&self, hash: &str) -> Result<Block, TransportError> {
		self.fetches.lock().unwrap().push(hash.to_string());
		self.blocks
			.lock()
			.unwrap()
			.get(hash)
			.cloned()
			.ok_or(TransportError::NoData)
	}
}

/// Which store call [`FailingStore`] rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailingCall {
	ImportTransactions,
	ImportBlockHeader,
}

/// Memory store whose chosen import call fails with `StorageError("disk full")`.
pub struct FailingStore {
	pub inner: MemoryWalletStore,
	pub failing: FailingCall,
}

impl FailingStore {
	fn disk_full() -> WalletSyncError {
		WalletSyncError::StorageError("disk full".to_string())
	}
}

#[async_trait::async_trait]
impl WalletStore for FailingStore {
	async fn addresses_to_sync(&self) -> Result<Vec<String>, WalletSyncError> {
		self.inner.addresses_to_sync().await
	}

	async fn known_transaction_ids(&self) -> Result<HashSet<String>, WalletSyncError> {
		self.inner.known_transaction_ids().await
	}

	async fn import_transactions(
		&self,
		transactions: &[WalletTransaction],
	) -> Result<usize, WalletSyncError> {
		if self.failing == FailingCall::ImportTransactions {
			return Err(Self::disk_full());
		}
		self.inner.import_transactions(transactions).await
	}

	async fn import_block_header(&self, header: &BlockHeader) -> Result<(), WalletSyncError> {
		if self.failing == FailingCall::ImportBlockHeader {
			return Err(Self::disk_full());
		}
		self.inner.import_block_header(header).await
	}

	async fn last_synced_block_height(&self) -> Result<Option<u32>, WalletSyncError> {
		self.inner.last_synced_block_height().await
	}

	async fn set_last_synced_block_height(&self, height: u32) -> Result<(), WalletSyncError> {
		self.inner.set_last_synced_block_height(height).await
	}
}

/// A deterministic 32 byte hash in wire order whose bytes are not a palindrome.
pub fn wire_hash(seed: u8) -> String {
	let bytes: Vec<u8> = (0..32u8).map(|i| seed.wrapping_mul(31).wrapping_add(i)).collect();
	hex::encode(bytes)
}

/// Display order form of [`wire_hash`].
pub fn display_hash(seed: u8) -> String {
	reverse_hex(&wire_hash(seed)).unwrap()
}

/// A block whose transactions carry the given special payloads, in order.
pub fn block_with_payloads(hash: &str, payloads: Vec<Option<serde_json::Value>>) -> Block {
	Block {
		hash: hash.to_string(),
		transactions: payloads
			.into_iter()
			.enumerate()
			.map(|(index, extra_payload)| BlockTransaction {
				txid: format!("{:064x}", index),
				tx_type: if extra_payload.is_some() { 5 } else { 0 },
				extra_payload,
			})
			.collect(),
	}
}

/// A merkle block whose previous block is `display_hash(prev_seed)`, claiming the given
/// display order transaction ids.
pub fn merkle_block(hash_seed: u8, prev_seed: u8, claimed_ids: &[String]) -> MerkleBlock {
	MerkleBlock {
		header: BlockHeader {
			hash: display_hash(hash_seed),
			prev_hash: wire_hash(prev_seed),
			..Default::default()
		},
		hashes: claimed_ids
			.iter()
			.map(|id| reverse_hex(id).unwrap())
			.collect(),
	}
}

pub fn wallet_tx(txid: &str, address: &str) -> WalletTransaction {
	WalletTransaction {
		txid: txid.to_string(),
		raw: "0300".to_string(),
		addresses: vec![address.to_string()],
	}
}

pub fn data(transactions: Vec<WalletTransaction>, merkle_block: Option<MerkleBlock>) -> StreamEvent {
	StreamEvent::Data(StreamResponse {
		transactions,
		merkle_block,
	})
}

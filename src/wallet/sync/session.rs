//! Stream session state machine.
//!
//! A `SyncSession` owns one subscription from open to its terminal event. It consumes events
//! strictly in arrival order: transactions of a frame are imported before the frame's merkle
//! block is checked, and a merkle block is only imported once its height is known. When an import
//! generates new addresses the gap limit has been crossed and the session asks the transport to
//! stop; the session still finishes only on the transport's `End` or `Error` event.

use crate::transport::{
	MerkleBlock, StreamEvent, StreamResponse, SubscriptionOptions, TransactionStream, Transport,
	WalletTransaction,
};
use crate::wallet::sync::events::{SyncEvent, classify_response};
use crate::wallet::sync::height_resolver::HeightResolver;
use crate::wallet::sync::progress_tracker::{SyncProgressTracker, SyncStats};
use crate::wallet::sync::relevance::is_relevant;
use crate::wallet::{SyncState, WalletStore, WalletSyncError};

use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Idle,
	Subscribing,
	Active,
	/// Cancellation was requested, waiting for the terminal event.
	Cancelling,
	Terminated,
}

/// What a session leaves behind once its stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
	pub sync_state: SyncState,
	pub stats: SyncStats,
}

impl SessionOutcome {
	pub fn gap_limit_reached(&self) -> bool {
		self.sync_state.gap_limit_reached
	}
}

pub struct SyncSession<'a> {
	transport: &'a dyn Transport,
	store: &'a dyn WalletStore,
	height_resolver: HeightResolver<'a>,
	state: SessionState,
	sync_state: SyncState,
	progress: SyncProgressTracker,
}

impl<'a> SyncSession<'a> {
	pub fn new(
		transport: &'a dyn Transport,
		store: &'a dyn WalletStore,
		last_synced_height: Option<u32>,
	) -> Self {
		Self {
			transport,
			store,
			height_resolver: HeightResolver::new(transport),
			state: SessionState::Idle,
			sync_state: SyncState::new(last_synced_height),
			progress: SyncProgressTracker::new(last_synced_height),
		}
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	/// Open the stream and process it until the transport ends it.
	pub async fn run(
		mut self,
		addresses: &[String],
		options: &SubscriptionOptions,
	) -> Result<SessionOutcome, WalletSyncError> {
		self.transition(SessionState::Subscribing);
		let mut stream = match self
			.transport
			.subscribe_to_transactions_with_proofs(addresses, options)
			.await
		{
			Ok(stream) => stream,
			Err(e) => {
				error!("Failed to open transaction stream: {}", e);
				self.transition(SessionState::Terminated);
				return Err(e.into());
			}
		};
		self.transition(SessionState::Active);

		let watched: HashSet<String> = addresses.iter().cloned().collect();

		loop {
			match stream.next_event().await {
				StreamEvent::Data(response) => {
					self.progress.record_frame();
					if let Err(e) = self.handle_response(response, &watched, &mut *stream).await {
						error!("Sync session aborted while handling stream data: {}", e);
						self.request_cancel(&mut *stream);
						Self::await_terminal_event(&mut *stream).await;
						self.transition(SessionState::Terminated);
						return Err(e);
					}
				}
				StreamEvent::Error(e) => {
					warn!("Transaction stream ended on error: {}", e);
					self.transition(SessionState::Terminated);
					return Err(e.into());
				}
				StreamEvent::End => {
					self.transition(SessionState::Terminated);
					let stats = self.progress.get_stats();
					info!(
						"Transaction stream ended (gap limit reached: {}). {}",
						self.sync_state.gap_limit_reached,
						stats.summary()
					);
					return Ok(SessionOutcome {
						sync_state: self.sync_state,
						stats,
					});
				}
			}
		}
	}

	async fn handle_response(
		&mut self,
		response: StreamResponse,
		watched: &HashSet<String>,
		stream: &mut dyn TransactionStream,
	) -> Result<(), WalletSyncError> {
		for event in classify_response(response, watched) {
			match event {
				SyncEvent::TransactionsReceived(transactions) => {
					self.handle_transactions(transactions, stream).await?
				}
				SyncEvent::MerkleBlockReceived(merkle_block) => {
					self.handle_merkle_block(merkle_block).await?
				}
			}
		}
		Ok(())
	}

	async fn handle_transactions(
		&mut self,
		transactions: Vec<WalletTransaction>,
		stream: &mut dyn TransactionStream,
	) -> Result<(), WalletSyncError> {
		let generated = self.store.import_transactions(&transactions).await?;
		self.progress.record_transactions(transactions.len(), generated);

		if self.sync_state.record_generated_addresses(generated) {
			// New addresses mean the subscription filter is stale; a new session must pick them up.
			info!(
				"Gap limit reached: {} new addresses generated, ending stream",
				generated
			);
		}
		if self.sync_state.gap_limit_reached {
			self.request_cancel(stream);
		}
		Ok(())
	}

	async fn handle_merkle_block(&mut self, merkle_block: MerkleBlock) -> Result<(), WalletSyncError> {
		let known_ids = self.store.known_transaction_ids().await?;
		if !is_relevant(&merkle_block, &known_ids) {
			debug!(
				"Ignoring block {}: no known transaction among {} claimed",
				merkle_block.header.hash,
				merkle_block.hashes.len()
			);
			self.progress.record_skipped_header();
			return Ok(());
		}

		let height = self.height_resolver.resolve_height(&merkle_block.header).await?;
		self.store.import_block_header(&merkle_block.header).await?;

		if self.sync_state.advance_height(height) {
			self.store.set_last_synced_block_height(height).await?;
		} else {
			warn!(
				"Block {} at height {} is below last synced height {:?}, keeping the latter",
				merkle_block.header.hash, height, self.sync_state.last_synced_height
			);
		}

		debug!("Imported block {} at height {}", merkle_block.header.hash, height);
		self.progress.record_header(height);
		self.progress.log_progress(false);
		Ok(())
	}

	/// Consume the stream until the transport terminates it. Data arriving after a failure is
	/// dropped unprocessed.
	async fn await_terminal_event(stream: &mut dyn TransactionStream) {
		loop {
			match stream.next_event().await {
				StreamEvent::Data(_) => debug!("Dropping stream data received after failure"),
				StreamEvent::Error(e) => {
					debug!("Transaction stream ended on error after failure: {}", e);
					return;
				}
				StreamEvent::End => return,
			}
		}
	}

	/// Ask the transport to stop. Only the first request in a session reaches the stream.
	fn request_cancel(&mut self, stream: &mut dyn TransactionStream) {
		if self.state == SessionState::Active {
			stream.cancel();
			self.transition(SessionState::Cancelling);
		}
	}

	fn transition(&mut self, next: SessionState) {
		debug!("Sync session {:?} -> {:?}", self.state, next);
		self.state = next;
	}
}

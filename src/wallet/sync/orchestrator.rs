//! Stream sync orchestrator and caller facing entry point.
//!
//! This module defines the `StreamSyncOrchestrator`, which owns the collaborators of a wallet
//! context (transport, store, active stream registry) and runs sync sessions against them.
//!
//! The orchestrator is responsible for:
//! - Validating sync cursors before any stream is opened
//! - Holding the wallet's active stream slot for exactly the lifetime of a session
//! - Re-subscribing with a refreshed address set after a gap limit crossing
//! - Retrying transient transport failures with exponential backoff
//!
//! The per-stream event handling lives in [`crate::wallet::sync::session`].

use crate::config::SyncConfig;
use crate::transport::Transport;
use crate::wallet::sync::registry::StreamRegistry;
use crate::wallet::sync::session::{SessionOutcome, SyncSession};
use crate::wallet::{SyncCursor, WalletStore, WalletSyncError};

use backoff::ExponentialBackoffBuilder;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a [`StreamSyncOrchestrator::sync_to_latest`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Sessions opened, including re-subscriptions after gap limit crossings.
    pub rounds: u32,
    /// Whether the last session still crossed the gap limit.
    pub gap_limit_reached: bool,
    pub last_synced_height: Option<u32>,
}

/// Main stream sync coordinator for one wallet context.
pub struct StreamSyncOrchestrator {
    transport: Arc<dyn Transport>,
    store: Arc<dyn WalletStore>,
    registry: StreamRegistry,
    wallet_id: String,
    config: SyncConfig,
}

impl StreamSyncOrchestrator {
    /// Create an orchestrator with its own stream registry.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn WalletStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            transport,
            store,
            registry: StreamRegistry::new(),
            wallet_id: config.wallet_id.clone(),
            config,
        }
    }

    /// Share a stream registry with other orchestrators.
    pub fn with_registry(mut self, registry: StreamRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    /// Whether a stream of this wallet is still open (or still finishing after cancellation).
    pub fn is_streaming(&self) -> bool {
        self.registry.is_active(&self.wallet_id)
    }

    /// Stream from `cursor` until the stream ends, returning whether the gap limit was reached.
    ///
    /// Fails with `ConfigurationError` before opening anything when the cursor is invalid, and
    /// with `StreamAlreadyActive` when another session of this wallet holds the stream.
    pub async fn sync_up_to_the_gap_limit(
        &self,
        cursor: &SyncCursor,
    ) -> Result<bool, WalletSyncError> {
        Ok(self.run_session(cursor).await?.gap_limit_reached())
    }

    /// Run one session and return its full outcome.
    pub async fn run_session(&self, cursor: &SyncCursor) -> Result<SessionOutcome, WalletSyncError> {
        let options = cursor.to_subscription_options()?;
        // Released on every return path below, including errors.
        let _slot = self.registry.acquire(&self.wallet_id)?;

        let addresses = self.store.addresses_to_sync().await?;
        let last_synced_height = self.store.last_synced_block_height().await?;
        info!(
            "Syncing up to the gap limit from {:?} (count {}) with {} addresses",
            options.from,
            options.count,
            addresses.len()
        );

        SyncSession::new(self.transport.as_ref(), self.store.as_ref(), last_synced_height)
            .run(&addresses, &options)
            .await
    }

    /// Sync `config.block_count` blocks past the stored height, re-subscribing whenever a
    /// session ends because the gap limit was reached.
    pub async fn sync_to_latest(&self) -> Result<SyncReport, WalletSyncError> {
        let start = self
            .store
            .last_synced_block_height()
            .await?
            .unwrap_or(self.config.start_height);
        let end = start.saturating_add(self.config.block_count);

        let mut rounds = 0;
        loop {
            let from = self
                .store
                .last_synced_block_height()
                .await?
                .map_or(start, |height| height.max(start));
            let cursor = SyncCursor::from_height(from, end.saturating_sub(from).max(1));

            rounds += 1;
            let gap_limit_reached = self.sync_with_retry(&cursor).await?;
            let report = SyncReport {
                rounds,
                gap_limit_reached,
                last_synced_height: self.store.last_synced_block_height().await?,
            };

            if !gap_limit_reached {
                info!(
                    "Synced to height {:?} after {} rounds",
                    report.last_synced_height, rounds
                );
                return Ok(report);
            }
            if rounds >= self.config.max_gap_limit_rounds {
                warn!(
                    "Gap limit still reached after {} rounds, stopping at height {:?}",
                    rounds, report.last_synced_height
                );
                return Ok(report);
            }

            info!(
                "Gap limit reached, resubscribing with refreshed addresses from height {:?}",
                report.last_synced_height
            );
        }
    }

    /// Run a session, retrying transient failures until the retry budget is spent.
    async fn sync_with_retry(&self, cursor: &SyncCursor) -> Result<bool, WalletSyncError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.retry_initial_interval)
            .with_max_elapsed_time(Some(self.config.retry_max_elapsed))
            .build();

        backoff::future::retry(policy, move || async move {
            self.sync_up_to_the_gap_limit(cursor).await.map_err(|e| {
                if e.is_transient() {
                    warn!("Sync session failed, retrying: {}", e);
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }
}

//! Sync state checkpoints.
//!
//! This module provides the `StatePersistenceService`, which saves the last synced height of a
//! wallet to disk and restores it on startup so the next session can resume where the previous
//! one stopped. The repository trait keeps the file format out of the service.

use crate::wallet::WalletSyncError;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Persisted sync progress of one wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    pub wallet_id: String,
    pub last_synced_height: Option<u32>,
    /// RFC 3339 time of the save.
    pub saved_at: String,
}

/// Repository for sync checkpoints
#[async_trait::async_trait]
pub trait CheckpointRepository: Send + Sync {
    async fn save(&self, checkpoint: &SyncCheckpoint) -> Result<(), WalletSyncError>;
    async fn load(&self, wallet_id: &str) -> Result<Option<SyncCheckpoint>, WalletSyncError>;
}

/// JSON file per wallet inside a data directory.
pub struct FileCheckpointRepository {
    data_dir: PathBuf,
}

impl FileCheckpointRepository {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn checkpoint_filename(&self, wallet_id: &str) -> PathBuf {
        self.data_dir
            .join(format!("sync_state_{}.json", hex::encode(wallet_id.as_bytes())))
    }
}

#[async_trait::async_trait]
impl CheckpointRepository for FileCheckpointRepository {
    async fn save(&self, checkpoint: &SyncCheckpoint) -> Result<(), WalletSyncError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;

        let content = serde_json::to_string_pretty(checkpoint).map_err(|e| {
            WalletSyncError::ParseError(format!("Failed to serialize checkpoint: {}", e))
        })?;

        let filename = self.checkpoint_filename(&checkpoint.wallet_id);
        tokio::fs::write(&filename, content).await?;

        info!(
            "Saved sync checkpoint to {:?} at height {:?}",
            filename, checkpoint.last_synced_height
        );
        Ok(())
    }

    async fn load(&self, wallet_id: &str) -> Result<Option<SyncCheckpoint>, WalletSyncError> {
        let filename = self.checkpoint_filename(wallet_id);
        if !tokio::fs::try_exists(&filename).await? {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&filename).await?;
        let checkpoint: SyncCheckpoint = serde_json::from_str(&content).map_err(|e| {
            WalletSyncError::ParseError(format!("Failed to parse checkpoint file: {}", e))
        })?;

        info!(
            "Loaded sync checkpoint from {:?} at height {:?}",
            filename, checkpoint.last_synced_height
        );
        Ok(Some(checkpoint))
    }
}

/// Service for saving and restoring sync progress.
pub struct StatePersistenceService {
    checkpoint_repo: Box<dyn CheckpointRepository>,
}

impl StatePersistenceService {
    /// Create a new state persistence service for the given data directory.
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            checkpoint_repo: Box::new(FileCheckpointRepository::new(data_dir)),
        }
    }

    /// Save the last synced height of `wallet_id`.
    pub async fn save_height(
        &self,
        wallet_id: &str,
        last_synced_height: Option<u32>,
    ) -> Result<(), WalletSyncError> {
        let checkpoint = SyncCheckpoint {
            wallet_id: wallet_id.to_string(),
            last_synced_height,
            saved_at: chrono::Utc::now().to_rfc3339(),
        };
        self.checkpoint_repo.save(&checkpoint).await
    }

    /// Restore the last synced height of `wallet_id`, if any was saved.
    pub async fn restore_height(&self, wallet_id: &str) -> Result<Option<u32>, WalletSyncError> {
        Ok(self
            .checkpoint_repo
            .load(wallet_id)
            .await?
            .and_then(|checkpoint| checkpoint.last_synced_height))
    }
}

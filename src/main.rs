use spv_stream_sync::config::SyncConfig;
use spv_stream_sync::transport::RemoteTransportClient;
use spv_stream_sync::wallet::sync::state_persistence::StatePersistenceService;
use spv_stream_sync::wallet::{MemoryWalletStore, StreamSyncOrchestrator, WalletSyncError};

use std::sync::Arc;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting stream sync service");

	if let Err(e) = run().await {
		error!("Stream sync failed: {}", e);
		std::process::exit(1);
	}
}

async fn run() -> Result<(), WalletSyncError> {
	let config = SyncConfig::from_env()?;
	if config.addresses.is_empty() {
		return Err(WalletSyncError::ConfigurationError(
			"SYNC_ADDRESSES must name at least one address".to_string(),
		));
	}

	let transport = RemoteTransportClient::new(
		config.rpc_url.clone(),
		config.ws_url.clone(),
		config.request_timeout,
	)?;
	info!("Created transport client for {}", config.ws_url);

	let persistence = StatePersistenceService::new(config.state_dir.clone());
	let restored_height = persistence.restore_height(&config.wallet_id).await?;
	match restored_height {
		Some(height) => info!("Resuming wallet {} from height {}", config.wallet_id, height),
		None => info!(
			"No checkpoint for wallet {}, starting from height {}",
			config.wallet_id, config.start_height
		),
	}

	let store = MemoryWalletStore::new(config.addresses.clone())
		.with_last_synced_height(restored_height);
	let wallet_id = config.wallet_id.clone();
	let orchestrator =
		StreamSyncOrchestrator::new(Arc::new(transport), Arc::new(store.clone()), config);

	let report = orchestrator.sync_to_latest().await;

	// Keep whatever progress was made, even when the run failed.
	persistence
		.save_height(&wallet_id, store.last_synced_height())
		.await?;

	let report = report?;
	info!(
		"Sync finished after {} rounds at height {:?} (gap limit reached: {}), {} transactions stored",
		report.rounds,
		report.last_synced_height,
		report.gap_limit_reached,
		store.transaction_count()
	);

	Ok(())
}

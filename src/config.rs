//! Runtime configuration for the stream sync service.

use crate::wallet::WalletSyncError;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for stream synchronization
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// JSON-RPC endpoint used for block lookups.
	pub rpc_url: String,
	/// WebSocket endpoint used for transaction stream subscriptions.
	pub ws_url: String,
	/// Wallet context the active stream slot is keyed by.
	pub wallet_id: String,
	/// Initially watched addresses.
	pub addresses: Vec<String>,
	/// Height to start from when nothing has been synced yet.
	pub start_height: u32,
	/// Number of blocks covered by one sync run.
	pub block_count: u32,
	/// Directory for sync state checkpoints.
	pub state_dir: PathBuf,
	/// Timeout for HTTP requests.
	pub request_timeout: Duration,
	/// First delay between retries of transient failures.
	pub retry_initial_interval: Duration,
	/// Give up retrying after this long.
	pub retry_max_elapsed: Duration,
	/// Upper bound on consecutive re-subscriptions after gap limit crossings.
	pub max_gap_limit_rounds: u32,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			rpc_url: "http://127.0.0.1:3000".to_string(),
			ws_url: "ws://127.0.0.1:3010".to_string(),
			wallet_id: "default".to_string(),
			addresses: Vec::new(),
			start_height: 1,
			block_count: 2000,
			state_dir: PathBuf::from("./sync-state"),
			request_timeout: Duration::from_secs(30),
			retry_initial_interval: Duration::from_millis(500),
			retry_max_elapsed: Duration::from_secs(60),
			max_gap_limit_rounds: 20,
		}
	}
}

impl SyncConfig {
	/// Read the configuration from `SYNC_*` environment variables, falling back to defaults.
	pub fn from_env() -> Result<Self, WalletSyncError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Build the configuration from an arbitrary key lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, WalletSyncError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::default();

		if let Some(url) = lookup("SYNC_HTTP_URL") {
			config.rpc_url = url;
		}
		if let Some(url) = lookup("SYNC_WS_URL") {
			config.ws_url = url;
		}
		if let Some(wallet_id) = lookup("SYNC_WALLET_ID") {
			config.wallet_id = wallet_id;
		}
		if let Some(addresses) = lookup("SYNC_ADDRESSES") {
			config.addresses = addresses
				.split(',')
				.map(str::trim)
				.filter(|a| !a.is_empty())
				.map(str::to_string)
				.collect();
		}
		if let Some(dir) = lookup("SYNC_STATE_DIR") {
			config.state_dir = PathBuf::from(dir);
		}
		if let Some(height) = parse_var(&lookup, "SYNC_START_HEIGHT")? {
			config.start_height = height;
		}
		if let Some(count) = parse_var(&lookup, "SYNC_BLOCK_COUNT")? {
			config.block_count = count;
		}
		if let Some(secs) = parse_var(&lookup, "SYNC_REQUEST_TIMEOUT_SECS")? {
			config.request_timeout = Duration::from_secs(secs);
		}
		if let Some(secs) = parse_var(&lookup, "SYNC_RETRY_MAX_ELAPSED_SECS")? {
			config.retry_max_elapsed = Duration::from_secs(secs);
		}
		if let Some(rounds) = parse_var(&lookup, "SYNC_MAX_GAP_LIMIT_ROUNDS")? {
			config.max_gap_limit_rounds = rounds;
		}

		if config.block_count == 0 {
			return Err(WalletSyncError::ConfigurationError(
				"SYNC_BLOCK_COUNT must be positive".to_string(),
			));
		}

		Ok(config)
	}
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, WalletSyncError>
where
	F: Fn(&str) -> Option<String>,
	T: FromStr,
	T::Err: std::fmt::Display,
{
	lookup(key)
		.map(|raw| {
			raw.trim().parse::<T>().map_err(|e| {
				WalletSyncError::ConfigurationError(format!("Invalid {} {:?}: {}", key, raw, e))
			})
		})
		.transpose()
}

//! Single-flight registry for transaction streams.
//!
//! Each wallet context may hold at most one live stream. A slot is taken with
//! [`StreamRegistry::acquire`] and released when the returned guard is dropped, so every exit
//! path of a session (end, error, early return or panic) frees it.

use crate::wallet::WalletSyncError;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Wallet contexts that currently own a stream.
#[derive(Clone, Default)]
pub struct StreamRegistry {
	active: Arc<Mutex<HashSet<String>>>,
}

impl StreamRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Claim the stream slot of `wallet_id`.
	pub fn acquire(&self, wallet_id: &str) -> Result<ActiveStreamGuard, WalletSyncError> {
		if !self.lock().insert(wallet_id.to_string()) {
			return Err(WalletSyncError::StreamAlreadyActive(wallet_id.to_string()));
		}

		debug!("Acquired stream slot for wallet {}", wallet_id);
		Ok(ActiveStreamGuard {
			registry: self.clone(),
			wallet_id: wallet_id.to_string(),
		})
	}

	pub fn is_active(&self, wallet_id: &str) -> bool {
		self.lock().contains(wallet_id)
	}

	fn release(&self, wallet_id: &str) {
		self.lock().remove(wallet_id);
		debug!("Released stream slot for wallet {}", wallet_id);
	}

	fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
		self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

/// Ownership of one wallet's stream slot.
pub struct ActiveStreamGuard {
	registry: StreamRegistry,
	wallet_id: String,
}

impl ActiveStreamGuard {
	pub fn wallet_id(&self) -> &str {
		&self.wallet_id
	}
}

impl Drop for ActiveStreamGuard {
	fn drop(&mut self) {
		self.registry.release(&self.wallet_id);
	}
}

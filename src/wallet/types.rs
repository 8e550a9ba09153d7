use crate::transport::{BlockLocator, SubscriptionOptions, TransportError};

/// Error types for stream based wallet sync
#[allow(clippy::enum_variant_names)]
#[derive(Debug, thiserror::Error)]
pub enum WalletSyncError {
	#[error("Configuration error: {0}")]
	ConfigurationError(String),

	#[error("Stream already active for wallet {0}")]
	StreamAlreadyActive(String),

	#[error("Transport error: {0}")]
	TransportError(#[from] TransportError),

	#[error("Malformed block {block_hash}: {reason}")]
	MalformedBlockError { block_hash: String, reason: String },

	#[error("Storage error: {0}")]
	StorageError(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("Parse error: {0}")]
	ParseError(String),
}

impl WalletSyncError {
	/// Whether a caller may retry the failed session as is.
	pub fn is_transient(&self) -> bool {
		matches!(self, WalletSyncError::TransportError(_))
	}
}

/// Where a sync session starts and how many blocks it covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncCursor {
	pub from_block_hash: Option<String>,
	pub from_block_height: Option<u32>,
	pub count: u32,
}

impl SyncCursor {
	pub fn from_height(height: u32, count: u32) -> Self {
		Self {
			from_block_hash: None,
			from_block_height: Some(height),
			count,
		}
	}

	pub fn from_hash(hash: impl Into<String>, count: u32) -> Self {
		Self {
			from_block_hash: Some(hash.into()),
			from_block_height: None,
			count,
		}
	}

	/// Turn the cursor into subscription options.
	///
	/// Exactly one of hash or height must be set; both or neither is rejected.
	pub fn to_subscription_options(&self) -> Result<SubscriptionOptions, WalletSyncError> {
		let from = match (&self.from_block_hash, self.from_block_height) {
			(Some(hash), None) => BlockLocator::Hash(hash.clone()),
			(None, Some(height)) => BlockLocator::Height(height),
			(None, None) => {
				return Err(WalletSyncError::ConfigurationError(
					"fromBlockHash or fromBlockHeight should be present".to_string(),
				));
			}
			(Some(_), Some(_)) => {
				return Err(WalletSyncError::ConfigurationError(
					"fromBlockHash and fromBlockHeight are mutually exclusive".to_string(),
				));
			}
		};

		Ok(SubscriptionOptions {
			from,
			count: self.count,
		})
	}
}

/// Mutable state owned by one sync session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
	/// Height of the last relevant block imported. Only moves upwards.
	pub last_synced_height: Option<u32>,
	/// Set once an import generated new addresses. Never reset within a session.
	pub gap_limit_reached: bool,
}

impl SyncState {
	pub fn new(last_synced_height: Option<u32>) -> Self {
		Self {
			last_synced_height,
			gap_limit_reached: false,
		}
	}

	/// Record the outcome of a transaction import. Returns `true` on the false to true transition.
	pub fn record_generated_addresses(&mut self, generated: usize) -> bool {
		let was_reached = self.gap_limit_reached;
		self.gap_limit_reached = was_reached || generated > 0;
		!was_reached && self.gap_limit_reached
	}

	/// Advance the last synced height. Returns `false` when `height` would move it backwards.
	pub fn advance_height(&mut self, height: u32) -> bool {
		match self.last_synced_height {
			Some(current) if current > height => false,
			_ => {
				self.last_synced_height = Some(height);
				true
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cursor_without_start_is_configuration_error() {
		let cursor = SyncCursor {
			count: 10,
			..Default::default()
		};
		assert!(matches!(
			cursor.to_subscription_options(),
			Err(WalletSyncError::ConfigurationError(_))
		));
	}

	#[test]
	fn cursor_with_both_starts_is_rejected() {
		let cursor = SyncCursor {
			from_block_hash: Some("00aa".to_string()),
			from_block_height: Some(5),
			count: 10,
		};
		assert!(matches!(
			cursor.to_subscription_options(),
			Err(WalletSyncError::ConfigurationError(_))
		));
	}

	#[test]
	fn cursor_maps_to_single_locator() {
		let options = SyncCursor::from_height(7, 3).to_subscription_options().unwrap();
		assert_eq!(options.from, BlockLocator::Height(7));
		assert_eq!(options.count, 3);

		let options = SyncCursor::from_hash("beef", 1).to_subscription_options().unwrap();
		assert_eq!(options.from, BlockLocator::Hash("beef".to_string()));
	}

	#[test]
	fn gap_limit_flag_is_monotonic() {
		let mut state = SyncState::default();
		assert!(!state.record_generated_addresses(0));
		assert!(!state.gap_limit_reached);
		assert!(state.record_generated_addresses(2));
		assert!(state.gap_limit_reached);
		assert!(!state.record_generated_addresses(1));
		assert!(!state.record_generated_addresses(0));
		assert!(state.gap_limit_reached);
	}

	#[test]
	fn height_never_decreases() {
		let mut state = SyncState::new(Some(100));
		assert!(!state.advance_height(99));
		assert_eq!(state.last_synced_height, Some(100));
		assert!(state.advance_height(100));
		assert!(state.advance_height(150));
		assert_eq!(state.last_synced_height, Some(150));
	}

	#[test]
	fn only_transport_errors_are_transient() {
		assert!(WalletSyncError::from(TransportError::NoData).is_transient());
		assert!(!WalletSyncError::ConfigurationError("x".into()).is_transient());
		assert!(
			!WalletSyncError::MalformedBlockError {
				block_hash: "aa".into(),
				reason: "missing".into()
			}
			.is_transient()
		);
	}
}

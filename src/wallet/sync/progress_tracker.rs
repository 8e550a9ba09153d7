//! Progress tracking for stream synchronization.
//!
//! This module provides the `SyncProgressTracker`, which counts what a sync session imported and
//! skipped. Sessions log a summary when their stream terminates and periodically while headers
//! keep arriving.

use tracing::info;

const LOG_EVERY_BLOCKS: u32 = 1000;

/// Service for tracking synchronization progress
#[derive(Debug, Clone)]
pub struct SyncProgressTracker {
    /// Height the session started from, if known
    start_height: Option<u32>,
    /// Highest height imported so far
    highest_height: Option<u32>,
    /// Data frames received
    frames_received: usize,
    /// Wallet transactions handed to the import pipeline
    transactions_imported: usize,
    /// Addresses generated by transaction imports
    addresses_generated: usize,
    /// Relevant merkle block headers imported
    headers_imported: usize,
    /// Merkle block headers without any known transaction
    headers_skipped: usize,
    /// Height at which we last logged progress
    last_logged_height: Option<u32>,
}

impl SyncProgressTracker {
    /// Create a new progress tracker starting from the given height.
    pub fn new(start_height: Option<u32>) -> Self {
        Self {
            start_height,
            highest_height: start_height,
            frames_received: 0,
            transactions_imported: 0,
            addresses_generated: 0,
            headers_imported: 0,
            headers_skipped: 0,
            last_logged_height: start_height,
        }
    }

    pub fn record_frame(&mut self) {
        self.frames_received += 1;
    }

    pub fn record_transactions(&mut self, imported: usize, generated_addresses: usize) {
        self.transactions_imported += imported;
        self.addresses_generated += generated_addresses;
    }

    pub fn record_header(&mut self, height: u32) {
        self.headers_imported += 1;
        self.highest_height = Some(self.highest_height.map_or(height, |h| h.max(height)));
    }

    pub fn record_skipped_header(&mut self) {
        self.headers_skipped += 1;
    }

    /// Log progress at regular intervals or when forced
    pub fn log_progress(&mut self, force: bool) {
        let Some(highest) = self.highest_height else {
            return;
        };
        let since_last_log = highest.saturating_sub(self.last_logged_height.unwrap_or(0));

        if force || since_last_log >= LOG_EVERY_BLOCKS {
            info!(
                "Sync progress: {} transactions, {} headers imported up to height {}",
                self.transactions_imported, self.headers_imported, highest
            );
            self.last_logged_height = Some(highest);
        }
    }

    /// Get sync statistics as a SyncStats struct
    pub fn get_stats(&self) -> SyncStats {
        SyncStats {
            start_height: self.start_height,
            highest_height: self.highest_height,
            frames_received: self.frames_received,
            transactions_imported: self.transactions_imported,
            addresses_generated: self.addresses_generated,
            headers_imported: self.headers_imported,
            headers_skipped: self.headers_skipped,
        }
    }
}

/// Statistics about one sync session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStats {
    pub start_height: Option<u32>,
    pub highest_height: Option<u32>,
    pub frames_received: usize,
    pub transactions_imported: usize,
    pub addresses_generated: usize,
    pub headers_imported: usize,
    pub headers_skipped: usize,
}

impl SyncStats {
    /// Get a human-readable summary of the sync statistics
    pub fn summary(&self) -> String {
        let fmt_height = |height: Option<u32>| match height {
            Some(h) => h.to_string(),
            None => "-".to_string(),
        };
        format!(
            "Sync from {} to {}: {} frames, {} transactions, {} headers imported, {} skipped{}",
            fmt_height(self.start_height),
            fmt_height(self.highest_height),
            self.frames_received,
            self.transactions_imported,
            self.headers_imported,
            self.headers_skipped,
            if self.addresses_generated == 0 {
                String::new()
            } else {
                format!(" ({} addresses generated)", self.addresses_generated)
            }
        )
    }
}

//! Wallet Synchronization Module
//!
//! This module drives one filtered transaction stream per wallet up to the gap limit.
//! It is composed of several submodules, each responsible for a specific aspect of the sync process:
//!
//! - `orchestrator`: The caller facing entry point. Validates cursors, guards the active stream slot and re-subscribes after gap limit crossings.
//! - `session`: The per-subscription state machine consuming stream events in arrival order.
//! - `events`: Classification of raw stream frames into wallet transaction batches and merkle blocks.
//! - `relevance`: Decides whether a merkle block proves any transaction the wallet already knows.
//! - `height_resolver`: Derives the absolute height of a block from the previous block's coinbase payload.
//! - `registry`: Per-wallet single-flight registry for active streams.
//! - `progress_tracker`: Session statistics and progress logging.
//! - `state_persistence`: File checkpoint of the last synced height.

/// Classification of stream frames into sync events
pub mod events;
/// Block height derivation from special payloads
pub mod height_resolver;
/// Caller facing coordinator for stream sync
pub mod orchestrator;
/// Tracks synchronization progress and statistics
pub mod progress_tracker;
/// Active stream registry
pub mod registry;
/// Merkle block relevance checks
pub mod relevance;
/// Stream session state machine
pub mod session;
/// Sync state checkpoints on disk
pub mod state_persistence;

#[cfg(test)]
pub(crate) mod test_support;

pub use orchestrator::*;

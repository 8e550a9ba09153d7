//!
//! Utility module for the stream sync service.
//!
//! Re-exports byte-order helpers used when comparing wire hashes with stored ids.
/// Hex and byte-order helpers
pub mod index;

pub use index::{reverse_hex, reverse_hex_bytes};

//! SPV wallet synchronization over a filtered transaction stream.
//!
//! A sync session subscribes to transactions touching the wallet's watched addresses, imports
//! them, and imports the headers of merkle blocks proving them, until the stream ends or the
//! wallet crosses its address gap limit.

pub mod config;
pub mod transport;
pub mod utils;
pub mod wallet;

pub mod store;
pub mod sync;
pub mod types;

pub use store::{AddressDeriver, MemoryWalletStore, WalletStore};
pub use sync::StreamSyncOrchestrator;
pub use types::*;

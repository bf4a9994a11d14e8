pub mod block;
pub mod chain;
pub mod reward;
pub mod transaction;

// Re-export for easier access
pub use block::Block;
pub use chain::{Chain, ChainError};
pub use transaction::{Address, Amount, Transaction, COINBASE_SENDER};

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the unix epoch.
pub fn unix_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

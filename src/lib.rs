//! Single-node proof-of-work blockchain core.
//!
//! The crate exposes one synchronized entry point, [`Node`], over the chain,
//! the mempool, the derived account state and the mining engine. An HTTP
//! layer, persistence backend or P2P stack are external collaborators that
//! call into this API.

pub mod blockchain;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod mempool;
pub mod mining;
pub mod node;
pub mod state;

// Re-export the public surface.
pub use blockchain::{Address, Amount, Block, Chain, Transaction, COINBASE_SENDER};
pub use config::{CoreConfig, Profile};
pub use crypto::{Ed25519Signer, Ed25519Verifier, PermissiveVerifier, TxSigner, TxVerifier};
pub use error::CoreError;
pub use node::{Node, NodeSnapshot, NodeStatus};
pub use state::AccountEntry;

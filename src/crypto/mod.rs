pub mod hashing;
pub mod merkle;
pub mod signatures;

// Re-export for easier access
pub use hashing::sha256_hex;
pub use merkle::merkle_root;
pub use signatures::{Ed25519Signer, Ed25519Verifier, PermissiveVerifier, TxSigner, TxVerifier};

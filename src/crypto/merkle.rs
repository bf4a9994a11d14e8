//! Merkle root over an ordered list of transaction content hashes.
//!
//! - Leaves are 64-char lowercase hex SHA-256 hashes, already computed.
//! - Parents hash the concatenated *byte* forms (32 + 32 bytes), not the hex.
//! - When a level has an odd number of nodes, the last is duplicated
//!   (Bitcoin-style).
//! - A single-leaf list is its own root; an empty list hashes the empty
//!   string, so every block commits to *some* root.

use core::fmt;

use crate::crypto::hashing::sha256_hex;

#[derive(Debug)]
pub enum MerkleError {
    /// A leaf was not a valid 64-char hex hash.
    BadLeaf(String),
}

impl fmt::Display for MerkleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MerkleError::BadLeaf(leaf) => write!(f, "malformed merkle leaf: {leaf}"),
        }
    }
}

impl std::error::Error for MerkleError {}

/// Compute the merkle root of an ordered list of hex-encoded hashes.
///
/// The result is deterministic in the order of `leaves`; reordering the list
/// changes the root, which is what makes the block header tamper-evident for
/// its transaction list.
pub fn merkle_root(leaves: &[String]) -> Result<String, MerkleError> {
    if leaves.is_empty() {
        return Ok(sha256_hex(b""));
    }

    // Work buffer: start with the decoded leaves
    let mut level: Vec<[u8; 32]> = Vec::with_capacity(leaves.len());
    for leaf in leaves {
        level.push(decode_hash(leaf)?);
    }

    // Reduce until one node remains
    while level.len() > 1 {
        // If odd, duplicate last
        if level.len() % 2 == 1 {
            let last = *level.last().expect("non-empty level");
            level.push(last);
        }

        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks_exact(2) {
            let mut buf = [0u8; 64];
            buf[..32].copy_from_slice(&pair[0]);
            buf[32..].copy_from_slice(&pair[1]);

            let parent = sha256_hex(&buf);
            next.push(decode_hash(&parent).expect("sha256_hex output is valid hex"));
        }
        level = next;
    }

    Ok(hex::encode(level[0]))
}

fn decode_hash(leaf: &str) -> Result<[u8; 32], MerkleError> {
    let bytes = hex::decode(leaf).map_err(|_| MerkleError::BadLeaf(leaf.to_string()))?;
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| MerkleError::BadLeaf(leaf.to_string()))?;
    Ok(arr)
}

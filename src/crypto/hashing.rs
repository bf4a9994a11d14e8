use sha2::{Digest, Sha256};

/// SHA-256 of arbitrary bytes, returned as a 64-char lowercase hex string.
///
/// Every hash in the system (transaction content hashes, merkle nodes, block
/// header hashes) goes through this one function so the canonical encoding is
/// fixed in a single place.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex::encode(digest)
}

/// SHA-256 of arbitrary bytes as a raw 32-byte array.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

use thiserror::Error;

/// Errors produced by the proof-of-work search.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PowError {
    /// The cancellation flag fired before a solution was found.
    #[error("mining cancelled")]
    Cancelled,

    /// The nonce ceiling was reached without a solution. Transient: the next
    /// round retries with a fresh timestamp.
    #[error("nonce space exhausted")]
    NonceExhausted,

    /// The block's transaction list could not be committed to a merkle root.
    #[error("block cannot be hashed")]
    MalformedBlock,
}

/// A hash satisfies difficulty `d` iff its leading `d` hex characters are all
/// '0'. Difficulty 0 accepts every hash; a difficulty longer than the hash
/// accepts none.
pub fn meets_difficulty(hash_hex: &str, difficulty: u32) -> bool {
    let d = difficulty as usize;
    if d > hash_hex.len() {
        return false;
    }
    hash_hex.bytes().take(d).all(|b| b == b'0')
}

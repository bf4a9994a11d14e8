use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::blockchain::transaction::Transaction;
use crate::consensus::pow::{self, PowError};
use crate::crypto::hashing::sha256_hex;
use crate::crypto::merkle::{merkle_root, MerkleError};

/// A block: header fields plus the ordered transaction list.
///
/// The header hash covers `index ‖ previous_hash ‖ timestamp ‖ merkle_root ‖
/// nonce` as an ASCII byte string, so the merkle root (and through it every
/// transaction) is tamper-evident.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub merkle_root: String,
    pub nonce: u64,
    pub hash: String,
    /// Set once proof-of-work succeeds; a sealed block admits no more
    /// transactions.
    #[serde(default)]
    sealed: bool,
}

impl Block {
    /// Open a new block extending `previous_hash` with an empty transaction
    /// list. The hash is consistent from the start.
    pub fn new(index: u64, previous_hash: impl Into<String>, timestamp: u64) -> Self {
        let mut block = Block {
            index,
            previous_hash: previous_hash.into(),
            timestamp,
            transactions: Vec::new(),
            merkle_root: String::new(),
            nonce: 0,
            hash: String::new(),
            sealed: false,
        };
        block
            .recompute_hash()
            .expect("empty transaction list always has a merkle root");
        block
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Admit a transaction if the block is still open and below `limit`
    /// entries. Returns false otherwise; the caller decides what to do with
    /// the rejected transaction.
    pub fn add_transaction(&mut self, tx: Transaction, limit: usize) -> bool {
        if self.sealed || self.transactions.len() >= limit {
            return false;
        }
        self.transactions.push(tx);
        self.recompute_hash()
            .expect("transaction hashes are valid hex by construction");
        true
    }

    /// The exact bytes fed to SHA-256 for the header hash: ASCII decimal and
    /// hex fields concatenated without separators.
    pub fn header_bytes(&self) -> Vec<u8> {
        format!(
            "{}{}{}{}{}",
            self.index, self.previous_hash, self.timestamp, self.merkle_root, self.nonce
        )
        .into_bytes()
    }

    pub fn compute_merkle_root(&self) -> Result<String, MerkleError> {
        let hashes: Vec<String> = self.transactions.iter().map(|tx| tx.hash.clone()).collect();
        merkle_root(&hashes)
    }

    pub fn compute_hash(&self) -> String {
        sha256_hex(&self.header_bytes())
    }

    /// Recompute the merkle root, then the header hash.
    pub fn recompute_hash(&mut self) -> Result<(), MerkleError> {
        self.merkle_root = self.compute_merkle_root()?;
        self.hash = self.compute_hash();
        Ok(())
    }

    /// Proof-of-work search: start at nonce 0 and increment until the header
    /// hash carries `difficulty` leading zero hex digits.
    ///
    /// The cancellation flag is checked on every iteration, so a stop request
    /// is observed within O(1) hashes. Passing `max_nonce` without a solution
    /// fails the round with `NonceExhausted`; the caller retries with a fresh
    /// timestamp.
    pub fn mine(
        &mut self,
        difficulty: u32,
        max_nonce: u64,
        cancel: &AtomicBool,
    ) -> Result<(), PowError> {
        // The merkle root does not depend on the nonce; fix it once.
        self.merkle_root = self
            .compute_merkle_root()
            .map_err(|_| PowError::MalformedBlock)?;

        let mut nonce: u64 = 0;
        loop {
            if cancel.load(Ordering::Relaxed) {
                return Err(PowError::Cancelled);
            }

            self.nonce = nonce;
            self.hash = self.compute_hash();
            if pow::meets_difficulty(&self.hash, difficulty) {
                self.sealed = true;
                return Ok(());
            }

            if nonce == max_nonce {
                return Err(PowError::NonceExhausted);
            }
            nonce += 1;
        }
    }
}

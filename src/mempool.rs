//! Bounded pool of pending transactions.
//!
//! Entries are totally ordered by (fee desc, timestamp asc, content hash asc);
//! block assembly drains in that order. The pool itself is single-threaded —
//! the node facade serializes access behind the mempool lock.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::blockchain::transaction::{Amount, Transaction};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MempoolError {
    /// A transaction with the same content hash is already pending.
    #[error("transaction already pending")]
    DuplicateHash,

    /// The pool is at capacity and the submission cannot evict anything.
    #[error("mempool is full")]
    Full,

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// The sender's balance snapshot cannot cover the amount. Raised by the
    /// node facade, which owns the state snapshot; re-checked definitively at
    /// block application.
    #[error("insufficient balance for {0}")]
    InsufficientBalance(String),
}

/// Pending transaction plus the fee it was admitted with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolEntry {
    pub tx: Transaction,
    pub fee: Amount,
}

/// Total order for selection: highest fee first, then oldest, then smallest
/// hash. `Ord` on the key makes the BTreeMap iterate in drain order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PriorityKey {
    fee: Reverse<u64>,
    timestamp: u64,
    hash: String,
}

impl PriorityKey {
    fn new(tx: &Transaction, fee: Amount) -> Self {
        PriorityKey {
            fee: Reverse(fee.units()),
            timestamp: tx.timestamp,
            hash: tx.hash.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Mempool {
    capacity: usize,
    entries: BTreeMap<PriorityKey, PoolEntry>,
    by_hash: HashMap<String, PriorityKey>,
}

impl Mempool {
    pub fn new(capacity: usize) -> Self {
        Mempool {
            capacity,
            entries: BTreeMap::new(),
            by_hash: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Admit a pending transaction at the given fee.
    ///
    /// Coinbase transactions never belong in the pool. At capacity, a strictly
    /// higher fee evicts the lowest-priority entry; anything else is `Full`.
    pub fn submit(&mut self, tx: Transaction, fee: Amount) -> Result<(), MempoolError> {
        if tx.is_coinbase() {
            return Err(MempoolError::InvalidTransaction(
                "coinbase transactions are not relayed".to_string(),
            ));
        }
        if self.by_hash.contains_key(&tx.hash) {
            return Err(MempoolError::DuplicateHash);
        }

        if self.entries.len() >= self.capacity {
            let lowest_fee = self
                .entries
                .keys()
                .next_back()
                .map(|key| key.fee.0)
                .unwrap_or(0);
            if fee.units() <= lowest_fee {
                return Err(MempoolError::Full);
            }
            self.evict_lowest();
        }

        let key = PriorityKey::new(&tx, fee);
        self.by_hash.insert(tx.hash.clone(), key.clone());
        self.entries.insert(key, PoolEntry { tx, fee });
        Ok(())
    }

    fn evict_lowest(&mut self) {
        if let Some(key) = self.entries.keys().next_back().cloned() {
            if let Some(entry) = self.entries.remove(&key) {
                self.by_hash.remove(&entry.tx.hash);
            }
        }
    }

    /// Remove and return up to `limit` transactions in priority order.
    pub fn drain_for_block(&mut self, limit: usize) -> Vec<Transaction> {
        let keys: Vec<PriorityKey> = self.entries.keys().take(limit).cloned().collect();
        let mut drained = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.entries.remove(&key) {
                self.by_hash.remove(&entry.tx.hash);
                drained.push(entry.tx);
            }
        }
        drained
    }

    pub fn remove(&mut self, hash: &str) -> Option<Transaction> {
        let key = self.by_hash.remove(hash)?;
        self.entries.remove(&key).map(|entry| entry.tx)
    }

    /// Read-only copy in priority order, for observability.
    pub fn snapshot(&self) -> Vec<PoolEntry> {
        self.entries.values().cloned().collect()
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::block::Block;
use crate::blockchain::reward::coinbase_value;
use crate::config::{ChainParams, GenesisConfig};
use crate::consensus::pow;
use crate::crypto::signatures::TxVerifier;
use crate::state::{State, StateError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("block index {got} does not extend height {want}")]
    BadIndex { got: u64, want: u64 },

    #[error("previous-hash mismatch at index {0}")]
    BadPrevHash(u64),

    #[error("header hash does not match recomputation at index {0}")]
    BadHash(u64),

    #[error("merkle root does not match recomputation at index {0}")]
    BadMerkleRoot(u64),

    #[error("hash does not satisfy difficulty {0}")]
    BadDifficulty(u32),

    #[error("invalid transactions: {0}")]
    InvalidTransactions(String),

    #[error("serialized block exceeds {0} bytes")]
    BlockTooLarge(usize),

    #[error("state rejected block: {0}")]
    StateRejected(#[from] StateError),

    #[error("no block at index {0}")]
    NotFound(u64),
}

/// Full validation of `block` as the successor of `prev` under `difficulty`.
///
/// Covers linkage, hash and merkle recomputation, the difficulty predicate,
/// size bounds, and the coinbase/transaction rules. State effects are checked
/// separately by `State::apply_block`.
pub fn validate_block(
    block: &Block,
    prev: &Block,
    difficulty: u32,
    params: &ChainParams,
    verifier: &dyn TxVerifier,
) -> Result<(), ChainError> {
    if block.index != prev.index + 1 {
        return Err(ChainError::BadIndex {
            got: block.index,
            want: prev.index + 1,
        });
    }
    if block.previous_hash != prev.hash {
        return Err(ChainError::BadPrevHash(block.index));
    }

    let merkle = block
        .compute_merkle_root()
        .map_err(|e| ChainError::InvalidTransactions(e.to_string()))?;
    if merkle != block.merkle_root {
        return Err(ChainError::BadMerkleRoot(block.index));
    }
    if block.compute_hash() != block.hash {
        return Err(ChainError::BadHash(block.index));
    }

    if !pow::meets_difficulty(&block.hash, difficulty) {
        return Err(ChainError::BadDifficulty(difficulty));
    }

    if block.transactions.len() > params.max_transactions_per_block {
        return Err(ChainError::InvalidTransactions(format!(
            "{} transactions exceed the {} per-block limit",
            block.transactions.len(),
            params.max_transactions_per_block
        )));
    }

    let serialized = serde_json::to_vec(block)
        .map_err(|e| ChainError::InvalidTransactions(e.to_string()))?;
    if serialized.len() > params.max_block_bytes {
        return Err(ChainError::BlockTooLarge(params.max_block_bytes));
    }

    // Position 0 must be the coinbase paying exactly reward + flat fees;
    // everything after it must be a valid non-coinbase transaction.
    let Some(coinbase) = block.transactions.first() else {
        return Err(ChainError::InvalidTransactions(
            "non-genesis block has no coinbase".to_string(),
        ));
    };
    if !coinbase.is_coinbase() {
        return Err(ChainError::InvalidTransactions(
            "first transaction is not a coinbase".to_string(),
        ));
    }
    if coinbase.recipient.is_empty() {
        return Err(ChainError::InvalidTransactions(
            "coinbase recipient is empty".to_string(),
        ));
    }

    let tx_count = (block.transactions.len() - 1) as u64;
    let expected = coinbase_value(block.index, tx_count, params).ok_or_else(|| {
        ChainError::InvalidTransactions("coinbase value overflows".to_string())
    })?;
    if coinbase.amount != expected {
        return Err(ChainError::InvalidTransactions(format!(
            "coinbase pays {} units, reward policy expects {}",
            coinbase.amount.units(),
            expected.units()
        )));
    }

    for tx in &block.transactions[1..] {
        if tx.is_coinbase() {
            return Err(ChainError::InvalidTransactions(
                "coinbase outside position 0".to_string(),
            ));
        }
        tx.validate(verifier, params.numeric_precision)
            .map_err(|e| ChainError::InvalidTransactions(e.to_string()))?;
    }

    Ok(())
}

/// Append-only, non-empty sequence of blocks starting at the genesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// The deterministic genesis block: fixed previous-hash sentinel, fixed
    /// timestamp, no transactions, nonce 0. Exempt from the difficulty
    /// predicate but its hash is consistent like any other block's.
    pub fn genesis_block(config: &GenesisConfig) -> Block {
        Block::new(0, config.previous_hash.clone(), config.timestamp)
    }

    pub fn new(genesis: Block) -> Self {
        Chain {
            blocks: vec![genesis],
        }
    }

    /// Rebuild a chain from a stored block sequence. The sequence must be
    /// non-empty; integrity is checked separately via `verify_integrity`.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, ChainError> {
        if blocks.is_empty() {
            return Err(ChainError::NotFound(0));
        }
        Ok(Chain { blocks })
    }

    /// Current tail block.
    pub fn latest(&self) -> &Block {
        self.blocks.last().expect("chain is never empty")
    }

    /// Index of the tail block.
    pub fn height(&self) -> u64 {
        self.latest().index
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Validate and commit a block: full validation against the tail and the
    /// difficulty in force, then atomic state application, then the append.
    /// Any failure leaves both the chain and the state untouched.
    pub fn append(
        &mut self,
        block: Block,
        difficulty: u32,
        params: &ChainParams,
        state: &mut State,
        verifier: &dyn TxVerifier,
    ) -> Result<(), ChainError> {
        validate_block(&block, self.latest(), difficulty, params, verifier)?;
        state.apply_block(&block, params, verifier)?;
        self.blocks.push(block);
        Ok(())
    }

    /// Re-check every adjacency invariant over the whole sequence. Used when
    /// restoring from a snapshot; a failure here is fatal.
    pub fn verify_integrity(&self, config: &GenesisConfig) -> Result<(), ChainError> {
        let genesis = &self.blocks[0];
        if genesis.index != 0 || genesis.previous_hash != config.previous_hash {
            return Err(ChainError::BadPrevHash(0));
        }
        if genesis.transactions.iter().any(|tx| tx.is_coinbase()) {
            return Err(ChainError::InvalidTransactions(
                "genesis carries a coinbase".to_string(),
            ));
        }

        for window in self.blocks.windows(2) {
            let (prev, next) = (&window[0], &window[1]);
            if next.index != prev.index + 1 {
                return Err(ChainError::BadIndex {
                    got: next.index,
                    want: prev.index + 1,
                });
            }
            if next.previous_hash != prev.hash {
                return Err(ChainError::BadPrevHash(next.index));
            }
        }

        for block in &self.blocks {
            let merkle = block
                .compute_merkle_root()
                .map_err(|e| ChainError::InvalidTransactions(e.to_string()))?;
            if merkle != block.merkle_root {
                return Err(ChainError::BadMerkleRoot(block.index));
            }
            if block.compute_hash() != block.hash {
                return Err(ChainError::BadHash(block.index));
            }
        }

        Ok(())
    }
}

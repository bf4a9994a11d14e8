//! Account-balance state machine derived from the chain.
//!
//! State is a pure fold of `apply_block` over the block sequence: replaying
//! the same chain always produces the same balances and stakes. Entries are
//! created lazily on first credit and never deleted; balances and stakes are
//! never negative.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::blockchain::block::Block;
use crate::blockchain::transaction::{Address, Amount, Transaction};
use crate::config::ChainParams;
use crate::crypto::signatures::TxVerifier;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("insufficient balance for {address}: have {have}, need {need}")]
    InsufficientBalance {
        address: Address,
        have: u64,
        need: u64,
    },

    #[error("insufficient stake for {0}")]
    InsufficientStake(Address),

    #[error("invalid transaction {0}")]
    InvalidTransaction(String),

    #[error("coinbase outside position 0 of a non-genesis block")]
    MisplacedCoinbase,

    /// Checked arithmetic failed; the ledger would no longer balance.
    #[error("amount overflow while updating {0}")]
    Overflow(String),
}

/// Balance and stake for one address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub balance: Amount,
    pub stake: Amount,
}

/// Mapping address → (balance, stake), mutated only by applying blocks in
/// order plus explicit stake/unstake moves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    accounts: HashMap<Address, AccountEntry>,
}

impl State {
    pub fn new() -> Self {
        State::default()
    }

    /// Entry for `address`, zero if never credited.
    pub fn get(&self, address: &str) -> AccountEntry {
        self.accounts.get(address).copied().unwrap_or_default()
    }

    /// Sum of all balances and stakes. Equals total coinbase issuance.
    pub fn total_supply(&self) -> Amount {
        let mut total = Amount::ZERO;
        for entry in self.accounts.values() {
            total = total
                .checked_add(entry.balance)
                .and_then(|t| t.checked_add(entry.stake))
                .unwrap_or(Amount::from_units(u64::MAX));
        }
        total
    }

    /// Apply a block atomically: either every transaction's effects commit or
    /// none do. Validation failures of any transaction reject the whole block.
    pub fn apply_block(
        &mut self,
        block: &Block,
        params: &ChainParams,
        verifier: &dyn TxVerifier,
    ) -> Result<(), StateError> {
        // Stage on a scratch copy so a mid-block failure leaves `self`
        // untouched for concurrent readers of the swapped-in map.
        let mut staged = self.accounts.clone();

        for (position, tx) in block.transactions.iter().enumerate() {
            if tx.is_coinbase() {
                if block.index == 0 || position != 0 {
                    return Err(StateError::MisplacedCoinbase);
                }
            } else {
                tx.validate(verifier, params.numeric_precision)
                    .map_err(|e| StateError::InvalidTransaction(e.to_string()))?;
            }
            Self::apply_tx(&mut staged, tx)?;
        }

        self.accounts = staged;
        Ok(())
    }

    /// Apply one transaction's debit/credit directly, without block-level
    /// checks. Used by block assembly to simulate sequential application
    /// against a balance snapshot.
    pub fn apply_transaction(&mut self, tx: &Transaction) -> Result<(), StateError> {
        Self::apply_tx(&mut self.accounts, tx)
    }

    fn apply_tx(
        accounts: &mut HashMap<Address, AccountEntry>,
        tx: &Transaction,
    ) -> Result<(), StateError> {
        if !tx.is_coinbase() {
            let sender = accounts.entry(tx.sender.clone()).or_default();
            sender.balance =
                sender
                    .balance
                    .checked_sub(tx.amount)
                    .ok_or(StateError::InsufficientBalance {
                        address: tx.sender.clone(),
                        have: sender.balance.units(),
                        need: tx.amount.units(),
                    })?;
        }

        let recipient = accounts.entry(tx.recipient.clone()).or_default();
        recipient.balance = recipient
            .balance
            .checked_add(tx.amount)
            .ok_or_else(|| StateError::Overflow(tx.recipient.clone()))?;
        Ok(())
    }

    /// Move value from balance to stake.
    pub fn stake(&mut self, address: &str, amount: Amount) -> Result<(), StateError> {
        let entry = self.accounts.entry(address.to_string()).or_default();
        let balance =
            entry
                .balance
                .checked_sub(amount)
                .ok_or_else(|| StateError::InsufficientBalance {
                    address: address.to_string(),
                    have: entry.balance.units(),
                    need: amount.units(),
                })?;
        let stake = entry
            .stake
            .checked_add(amount)
            .ok_or_else(|| StateError::Overflow(address.to_string()))?;
        entry.balance = balance;
        entry.stake = stake;
        Ok(())
    }

    /// Move value from stake back to balance.
    pub fn unstake(&mut self, address: &str, amount: Amount) -> Result<(), StateError> {
        let entry = self.accounts.entry(address.to_string()).or_default();
        let stake = entry
            .stake
            .checked_sub(amount)
            .ok_or_else(|| StateError::InsufficientStake(address.to_string()))?;
        let balance = entry
            .balance
            .checked_add(amount)
            .ok_or_else(|| StateError::Overflow(address.to_string()))?;
        entry.stake = stake;
        entry.balance = balance;
        Ok(())
    }

    /// Can `sender` afford `amount` out of its spendable balance right now?
    pub fn can_spend(&self, sender: &str, amount: Amount) -> bool {
        self.get(sender).balance >= amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::crypto::signatures::PermissiveVerifier;

    const PRECISION: u32 = 8;

    fn params() -> ChainParams {
        CoreConfig::default().chain_params()
    }

    fn transfer(sender: &str, recipient: &str, units: u64) -> Transaction {
        let mut tx = Transaction::new(
            sender,
            recipient,
            Amount::from_units(units),
            1,
            PRECISION,
        );
        tx.signature = b"sig".to_vec();
        tx
    }

    fn block_with(index: u64, txs: Vec<Transaction>) -> Block {
        let mut block = Block::new(index, "prev", 1);
        for tx in txs {
            assert!(block.add_transaction(tx, 50));
        }
        block
    }

    #[test]
    fn coinbase_credits_recipient() {
        let mut state = State::new();
        let coinbase = Transaction::coinbase("miner", Amount::from_units(100), 1, PRECISION);
        let block = block_with(1, vec![coinbase]);

        state
            .apply_block(&block, &params(), &PermissiveVerifier)
            .unwrap();
        assert_eq!(state.get("miner").balance, Amount::from_units(100));
        assert_eq!(state.total_supply(), Amount::from_units(100));
    }

    #[test]
    fn transfer_debits_and_credits() {
        let mut state = State::new();
        let coinbase = Transaction::coinbase("miner", Amount::from_units(100), 1, PRECISION);
        state
            .apply_block(&block_with(1, vec![coinbase]), &params(), &PermissiveVerifier)
            .unwrap();

        let coinbase2 = Transaction::coinbase("other", Amount::from_units(100), 2, PRECISION);
        let payment = transfer("miner", "alice", 40);
        state
            .apply_block(
                &block_with(2, vec![coinbase2, payment]),
                &params(),
                &PermissiveVerifier,
            )
            .unwrap();

        assert_eq!(state.get("miner").balance, Amount::from_units(60));
        assert_eq!(state.get("alice").balance, Amount::from_units(40));
        // Conservation: everything issued is still accounted for.
        assert_eq!(state.total_supply(), Amount::from_units(200));
    }

    #[test]
    fn rejects_overspend_without_partial_effects() {
        let mut state = State::new();
        let coinbase = Transaction::coinbase("miner", Amount::from_units(50), 1, PRECISION);
        state
            .apply_block(&block_with(1, vec![coinbase]), &params(), &PermissiveVerifier)
            .unwrap();

        let coinbase2 = Transaction::coinbase("other", Amount::from_units(50), 2, PRECISION);
        let good = transfer("miner", "alice", 30);
        let bad = transfer("miner", "bob", 30);
        let err = state
            .apply_block(
                &block_with(2, vec![coinbase2, good, bad]),
                &params(),
                &PermissiveVerifier,
            )
            .unwrap_err();

        assert!(matches!(err, StateError::InsufficientBalance { .. }));
        // All-or-nothing: the first transfer must not have leaked through.
        assert_eq!(state.get("miner").balance, Amount::from_units(50));
        assert_eq!(state.get("alice").balance, Amount::ZERO);
        assert_eq!(state.get("other").balance, Amount::ZERO);
    }

    #[test]
    fn sequential_transfers_within_one_block() {
        let mut state = State::new();
        let coinbase = Transaction::coinbase("miner", Amount::from_units(100), 1, PRECISION);
        state
            .apply_block(&block_with(1, vec![coinbase]), &params(), &PermissiveVerifier)
            .unwrap();

        // miner → alice → bob in the same block: position order matters.
        let coinbase2 = Transaction::coinbase("other", Amount::from_units(1), 2, PRECISION);
        let first = transfer("miner", "alice", 80);
        let second = transfer("alice", "bob", 70);
        state
            .apply_block(
                &block_with(2, vec![coinbase2, first, second]),
                &params(),
                &PermissiveVerifier,
            )
            .unwrap();

        assert_eq!(state.get("alice").balance, Amount::from_units(10));
        assert_eq!(state.get("bob").balance, Amount::from_units(70));
    }

    #[test]
    fn rejects_misplaced_coinbase() {
        let mut state = State::new();
        let coinbase = Transaction::coinbase("miner", Amount::from_units(10), 1, PRECISION);

        // Coinbase inside genesis.
        let err = state
            .apply_block(
                &block_with(0, vec![coinbase.clone()]),
                &params(),
                &PermissiveVerifier,
            )
            .unwrap_err();
        assert_eq!(err, StateError::MisplacedCoinbase);

        // Coinbase after position 0.
        let lead = Transaction::coinbase("miner", Amount::from_units(10), 2, PRECISION);
        let err = state
            .apply_block(
                &block_with(1, vec![lead, coinbase]),
                &params(),
                &PermissiveVerifier,
            )
            .unwrap_err();
        assert_eq!(err, StateError::MisplacedCoinbase);
    }

    #[test]
    fn rejects_unsigned_transfer() {
        let mut state = State::new();
        let coinbase = Transaction::coinbase("miner", Amount::from_units(100), 1, PRECISION);
        state
            .apply_block(&block_with(1, vec![coinbase]), &params(), &PermissiveVerifier)
            .unwrap();

        let coinbase2 = Transaction::coinbase("other", Amount::from_units(1), 2, PRECISION);
        let mut unsigned = transfer("miner", "alice", 10);
        unsigned.signature.clear();
        let err = state
            .apply_block(
                &block_with(2, vec![coinbase2, unsigned]),
                &params(),
                &PermissiveVerifier,
            )
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidTransaction(_)));
    }

    #[test]
    fn stake_and_unstake_move_value() {
        let mut state = State::new();
        let coinbase = Transaction::coinbase("miner", Amount::from_units(100), 1, PRECISION);
        state
            .apply_block(&block_with(1, vec![coinbase]), &params(), &PermissiveVerifier)
            .unwrap();

        state.stake("miner", Amount::from_units(30)).unwrap();
        assert_eq!(state.get("miner").balance, Amount::from_units(70));
        assert_eq!(state.get("miner").stake, Amount::from_units(30));
        // Total supply is unchanged by staking.
        assert_eq!(state.total_supply(), Amount::from_units(100));

        state.unstake("miner", Amount::from_units(10)).unwrap();
        assert_eq!(state.get("miner").balance, Amount::from_units(80));
        assert_eq!(state.get("miner").stake, Amount::from_units(20));

        assert!(matches!(
            state.unstake("miner", Amount::from_units(21)),
            Err(StateError::InsufficientStake(_))
        ));
        assert!(matches!(
            state.stake("miner", Amount::from_units(81)),
            Err(StateError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn replay_is_deterministic() {
        let coinbase = Transaction::coinbase("miner", Amount::from_units(100), 1, PRECISION);
        let block = block_with(1, vec![coinbase]);

        let mut a = State::new();
        let mut b = State::new();
        a.apply_block(&block, &params(), &PermissiveVerifier).unwrap();
        b.apply_block(&block, &params(), &PermissiveVerifier).unwrap();
        assert_eq!(a.get("miner"), b.get("miner"));
    }
}

//! Halving issuance schedule.
//!
//! The block reward starts at `block_reward_base` and halves every
//! `halving_interval` blocks, truncating in base units. Flat per-transaction
//! fees are added to the coinbase on top of the reward; they are minted with
//! it rather than debited from senders, so total supply always equals total
//! coinbase issuance.

use crate::blockchain::transaction::Amount;
use crate::config::ChainParams;

/// Reward for the block at `height`: `base / 2^(height / halving_interval)`,
/// integer-truncated. Past 63 halvings the reward is zero.
pub fn block_reward(height: u64, base: Amount, halving_interval: u64) -> Amount {
    let era = height / halving_interval;
    if era >= 64 {
        return Amount::ZERO;
    }
    Amount::from_units(base.units() >> era)
}

/// Total coinbase payout for a block at `height` carrying `tx_count`
/// non-coinbase transactions: reward plus flat fees.
pub fn coinbase_value(height: u64, tx_count: u64, params: &ChainParams) -> Option<Amount> {
    let reward = block_reward(height, params.block_reward_base, params.halving_interval);
    let fees = params.fee_per_tx.checked_mul(tx_count)?;
    reward.checked_add(fees)
}

//! Mining engine: composes candidate blocks from the mempool, runs the
//! proof-of-work search, and submits the result to the chain.
//!
//! One round = snapshot → drain → filter → assemble → mine → append. The
//! long-running worker repeats rounds on a dedicated thread and observes a
//! stop flag on every nonce iteration, so `stop` returns promptly.

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use thiserror::Error;

use crate::blockchain::block::Block;
use crate::blockchain::reward::coinbase_value;
use crate::blockchain::transaction::Transaction;
use crate::blockchain::unix_time_secs;
use crate::consensus::pow::PowError;
use crate::node::CoreShared;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MiningError {
    /// Nonce ceiling hit without a solution; retried next round with a fresh
    /// timestamp.
    #[error("nonce space exhausted")]
    NonceExhausted,

    #[error("mining cancelled")]
    Cancelled,

    /// No transactions to include and empty rounds are disallowed by policy.
    #[error("no transactions for this round")]
    EmptyRound,

    #[error("mining already running")]
    AlreadyRunning,

    #[error("mining not running")]
    NotRunning,

    /// The mined block was rejected on append; drained transactions that are
    /// still valid have been returned to the mempool.
    #[error("mined block rejected: {0}")]
    StateRejected(String),

    /// The core refused the round because a fatal invariant violation halted
    /// writes.
    #[error("core is halted")]
    Halted,
}

/// Perform one mining round against the shared core.
///
/// `cancel` aborts the nonce search; everything before and after the search is
/// short and runs to completion.
pub(crate) fn mine_round(
    shared: &CoreShared,
    recipient: &str,
    cancel: &AtomicBool,
) -> Result<Block, MiningError> {
    if shared.halted.load(Ordering::SeqCst) {
        return Err(MiningError::Halted);
    }

    let params = &shared.params;

    // 1. Consistent snapshot of the chain tail, difficulty and balances.
    let (prev, difficulty, mut sim) = {
        let domain = shared.domain.read();
        (
            domain.chain.latest().clone(),
            domain.difficulty.current(),
            domain.state.clone(),
        )
    };

    // 2. Drain candidates, leaving room for the coinbase.
    let drained = shared
        .mempool
        .lock()
        .drain_for_block(params.max_transactions_per_block.saturating_sub(1));

    // 3. Filter sequentially against the balance snapshot. A transaction the
    // snapshot cannot fund is dropped here, not reinserted: its sender spent
    // the money in an earlier-priority transaction or an earlier block.
    let mut kept: Vec<Transaction> = Vec::with_capacity(drained.len());
    for tx in drained {
        if let Err(err) = tx.validate(shared.verifier.as_ref(), params.numeric_precision) {
            warn!("dropping pending transaction {}: {err}", tx.hash);
            continue;
        }
        match sim.apply_transaction(&tx) {
            Ok(()) => kept.push(tx),
            Err(err) => warn!("dropping pending transaction {}: {err}", tx.hash),
        }
    }

    if kept.is_empty() && !shared.config.mining.allow_empty_rounds {
        return Err(MiningError::EmptyRound);
    }

    // 4. Coinbase pays the height's reward plus flat fees for the included
    // transactions.
    let height = prev.index + 1;
    let reward = coinbase_value(height, kept.len() as u64, params)
        .ok_or_else(|| MiningError::StateRejected("coinbase value overflows".to_string()))?;
    let timestamp = unix_time_secs();
    let coinbase = Transaction::coinbase(recipient, reward, timestamp, params.numeric_precision);

    // 5. Assemble the candidate.
    let mut block = Block::new(height, prev.hash.clone(), timestamp);
    let mut admitted = block.add_transaction(coinbase, params.max_transactions_per_block);
    for tx in &kept {
        admitted &= block.add_transaction(tx.clone(), params.max_transactions_per_block);
    }
    if !admitted {
        requeue(shared, &kept);
        return Err(MiningError::StateRejected(
            "candidate block refused transactions".to_string(),
        ));
    }

    // 6. Proof-of-work.
    match block.mine(difficulty, shared.config.mining.max_nonce, cancel) {
        Ok(()) => {}
        Err(PowError::Cancelled) => {
            requeue(shared, &kept);
            return Err(MiningError::Cancelled);
        }
        Err(PowError::NonceExhausted) => {
            requeue(shared, &kept);
            debug!("nonce space exhausted at height {height}, difficulty {difficulty}");
            return Err(MiningError::NonceExhausted);
        }
        Err(PowError::MalformedBlock) => {
            requeue(shared, &kept);
            return Err(MiningError::StateRejected(
                "candidate block cannot be hashed".to_string(),
            ));
        }
    }

    // 7. Commit: validate → apply state → append → retarget, one critical
    // section so readers never see a block without its state effects.
    let append_result = {
        let mut guard = shared.domain.write();
        let domain = &mut *guard;
        let difficulty_now = domain.difficulty.current();
        match domain.chain.append(
            block.clone(),
            difficulty_now,
            params,
            &mut domain.state,
            shared.verifier.as_ref(),
        ) {
            Ok(()) => {
                let interval_ms = domain.last_append.elapsed().as_millis() as u64;
                domain.difficulty.record_block_time(interval_ms);
                domain.last_append = Instant::now();
                for tx in &block.transactions {
                    domain.committed_txs.insert(tx.hash.clone());
                }
                Ok(())
            }
            Err(err) => Err(err),
        }
    };

    match append_result {
        Ok(()) => {
            info!(
                "mined block {} ({} txs, difficulty {difficulty}, nonce {}): {}",
                block.index,
                block.transactions.len(),
                block.nonce,
                block.hash
            );
            Ok(block)
        }
        Err(err) => {
            warn!("mined block {} rejected on append: {err}", block.index);
            requeue_still_valid(shared, &kept);
            Err(MiningError::StateRejected(err.to_string()))
        }
    }
}

/// Return drained transactions to the mempool in their original priority
/// order. Failures (duplicate, full) drop the transaction.
fn requeue(shared: &CoreShared, txs: &[Transaction]) {
    let fee = shared.params.fee_per_tx;
    let mut mempool = shared.mempool.lock();
    for tx in txs {
        if let Err(err) = mempool.submit(tx.clone(), fee) {
            debug!("could not requeue transaction {}: {err}", tx.hash);
        }
    }
}

/// Like `requeue`, but drop transactions the current state can no longer fund.
fn requeue_still_valid(shared: &CoreShared, txs: &[Transaction]) {
    let mut sim = shared.domain.read().state.clone();
    let still_valid: Vec<Transaction> = txs
        .iter()
        .filter(|tx| sim.apply_transaction(tx).is_ok())
        .cloned()
        .collect();
    requeue(shared, &still_valid);
}

/// Worker state machine: Idle → Mining (start) → Idle (stop or fatal error).
pub(crate) struct Miner {
    running: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Miner {
    pub fn new() -> Self {
        Miner {
            running: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the mining worker. The thread loops rounds until stopped; nonce
    /// exhaustion retries with a fresh timestamp, append rejection retries
    /// with fresh mempool contents, a halted core ends the worker.
    pub(crate) fn start(
        &self,
        shared: Arc<CoreShared>,
        recipient: String,
    ) -> Result<(), MiningError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(MiningError::AlreadyRunning);
        }
        self.stop.store(false, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let stop = Arc::clone(&self.stop);

        let handle = std::thread::Builder::new()
            .name("miner".to_string())
            .spawn(move || {
                info!("mining worker started, rewards to {recipient}");
                while running.load(Ordering::SeqCst) {
                    match mine_round(&shared, &recipient, &stop) {
                        Ok(_) => {}
                        Err(MiningError::Cancelled) => break,
                        Err(MiningError::Halted) => {
                            warn!("mining worker stopping: core is halted");
                            running.store(false, Ordering::SeqCst);
                            break;
                        }
                        Err(MiningError::EmptyRound) => {
                            std::thread::sleep(std::time::Duration::from_millis(50));
                        }
                        Err(err) => {
                            debug!("mining round failed: {err}");
                        }
                    }
                }
                info!("mining worker stopped");
            })
            .expect("spawning the mining worker cannot fail");

        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Request a stop and wait for the worker to park. The in-flight nonce
    /// search observes the flag within one iteration.
    pub(crate) fn stop(&self) -> Result<(), MiningError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(MiningError::NotRunning);
        }
        self.stop.store(true, Ordering::SeqCst);

        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Default for Miner {
    fn default() -> Self {
        Miner::new()
    }
}

// Round-level behavior is exercised through the node facade in
// `node::tests`, where a full core is cheap to stand up.

//! The synchronized core facade.
//!
//! A `Node` owns everything the request threads and the mining worker share:
//! the chain, the derived state, the difficulty controller (one consistency
//! domain behind a single RwLock) and the mempool (its own Mutex). Lock order
//! is chain-write before mempool wherever both are needed. Commands are
//! linearizable; queries take one read acquisition and therefore observe a
//! consistent snapshot.

use log::error;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::blockchain::block::Block;
use crate::blockchain::chain::Chain;
use crate::blockchain::transaction::{Amount, Transaction};
use crate::config::{ChainParams, CoreConfig};
use crate::consensus::difficulty::DifficultyController;
use crate::crypto::signatures::TxVerifier;
use crate::error::CoreError;
use crate::mempool::{Mempool, MempoolError, PoolEntry};
use crate::mining::{self, Miner};
use crate::state::{AccountEntry, State};

/// Chain tail, derived state and difficulty: mutated only together, inside
/// one exclusive critical section per append.
pub(crate) struct ChainDomain {
    pub chain: Chain,
    pub state: State,
    pub difficulty: DifficultyController,
    /// Content hashes of every committed transaction, for duplicate checks.
    pub committed_txs: HashSet<String>,
    /// When the previous block landed; feeds the retarget intervals.
    pub last_append: Instant,
}

/// State shared between the facade, request threads and the mining worker.
pub(crate) struct CoreShared {
    pub config: CoreConfig,
    pub params: ChainParams,
    pub verifier: Arc<dyn TxVerifier>,
    pub domain: RwLock<ChainDomain>,
    pub mempool: Mutex<Mempool>,
    /// Set on a fatal invariant violation; writes refuse until restart.
    pub halted: AtomicBool,
}

/// One consistent observation of the core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeStatus {
    pub height: u64,
    pub mempool_size: usize,
    pub difficulty: u32,
    pub last_block_hash: String,
    pub is_mining: bool,
}

/// Restorable representation of the full core: block sequence, pending
/// transactions and difficulty state. The byte form is opaque to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub blocks: Vec<Block>,
    pub mempool: Vec<PoolEntry>,
    pub difficulty: u32,
    pub intervals: Vec<u64>,
}

impl NodeSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        bincode::serialize(self).map_err(|e| CoreError::Fatal(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        bincode::deserialize(bytes).map_err(|e| CoreError::Validation(e.to_string()))
    }
}

pub struct Node {
    shared: Arc<CoreShared>,
    miner: Miner,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node").finish_non_exhaustive()
    }
}

impl Node {
    /// Build a fresh core at genesis.
    pub fn new(config: CoreConfig, verifier: Arc<dyn TxVerifier>) -> Result<Self, CoreError> {
        config
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let params = config.chain_params();
        let genesis = Chain::genesis_block(&config.genesis);
        let domain = ChainDomain {
            chain: Chain::new(genesis),
            state: State::new(),
            difficulty: DifficultyController::new(&config.difficulty),
            committed_txs: HashSet::new(),
            last_append: Instant::now(),
        };
        let mempool = Mempool::new(config.mempool.capacity);

        Ok(Node {
            shared: Arc::new(CoreShared {
                config,
                params,
                verifier,
                domain: RwLock::new(domain),
                mempool: Mutex::new(mempool),
                halted: AtomicBool::new(false),
            }),
            miner: Miner::new(),
        })
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Validate and admit a pending transaction; returns its content hash.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<String, CoreError> {
        self.ensure_writable()?;

        if tx.is_coinbase() {
            return Err(CoreError::Validation(
                "coinbase transactions cannot be submitted".to_string(),
            ));
        }
        tx.validate(self.shared.verifier.as_ref(), self.shared.params.numeric_precision)
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        // chain-write (read) before mempool, per the lock order.
        let domain = self.shared.domain.read();
        if domain.committed_txs.contains(&tx.hash) {
            return Err(MempoolError::DuplicateHash.into());
        }
        // Admission uses the applied-state snapshot; the definitive re-check
        // happens at block application.
        if !domain.state.can_spend(&tx.sender, tx.amount) {
            return Err(MempoolError::InsufficientBalance(tx.sender.clone()).into());
        }

        let mut mempool = self.shared.mempool.lock();
        let hash = tx.hash.clone();
        mempool.submit(tx, self.shared.params.fee_per_tx)?;
        Ok(hash)
    }

    /// Run one synchronous mining round and return the committed block.
    pub fn mine_once(&self, coinbase_recipient: &str) -> Result<Block, CoreError> {
        self.ensure_writable()?;
        if coinbase_recipient.is_empty() {
            return Err(CoreError::Validation(
                "coinbase recipient is empty".to_string(),
            ));
        }
        mining::mine_round(&self.shared, coinbase_recipient, &AtomicBool::new(false))
            .map_err(CoreError::from)
    }

    /// Start the long-running mining worker.
    pub fn start_mining(&self, coinbase_recipient: &str) -> Result<(), CoreError> {
        self.ensure_writable()?;
        if coinbase_recipient.is_empty() {
            return Err(CoreError::Validation(
                "coinbase recipient is empty".to_string(),
            ));
        }
        self.miner
            .start(Arc::clone(&self.shared), coinbase_recipient.to_string())
            .map_err(CoreError::from)
    }

    /// Stop the mining worker and wait for it to park.
    pub fn stop_mining(&self) -> Result<(), CoreError> {
        self.miner.stop().map_err(CoreError::from)
    }

    /// Move value from balance to stake.
    pub fn stake(&self, address: &str, amount: Amount) -> Result<(), CoreError> {
        self.ensure_writable()?;
        let mut domain = self.shared.domain.write();
        domain
            .state
            .stake(address, amount)
            .map_err(|e| self.escalate(CoreError::from(e)))
    }

    /// Move value from stake back to balance.
    pub fn unstake(&self, address: &str, amount: Amount) -> Result<(), CoreError> {
        self.ensure_writable()?;
        let mut domain = self.shared.domain.write();
        domain
            .state
            .unstake(address, amount)
            .map_err(|e| self.escalate(CoreError::from(e)))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn get_balance(&self, address: &str) -> AccountEntry {
        self.shared.domain.read().state.get(address)
    }

    pub fn get_chain_height(&self) -> u64 {
        self.shared.domain.read().chain.height()
    }

    pub fn get_latest_block(&self) -> Block {
        self.shared.domain.read().chain.latest().clone()
    }

    pub fn get_block_by_index(&self, index: u64) -> Result<Block, CoreError> {
        self.shared
            .domain
            .read()
            .chain
            .get(index)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("block {index}")))
    }

    pub fn get_status(&self) -> NodeStatus {
        let domain = self.shared.domain.read();
        let mempool = self.shared.mempool.lock();
        NodeStatus {
            height: domain.chain.height(),
            mempool_size: mempool.len(),
            difficulty: domain.difficulty.current(),
            last_block_hash: domain.chain.latest().hash.clone(),
            is_mining: self.miner.is_running(),
        }
    }

    // ------------------------------------------------------------------
    // Snapshot / restore
    // ------------------------------------------------------------------

    /// One consistent snapshot of blocks, mempool and difficulty.
    pub fn snapshot(&self) -> NodeSnapshot {
        let domain = self.shared.domain.read();
        let mempool = self.shared.mempool.lock();
        NodeSnapshot {
            blocks: domain.chain.blocks().to_vec(),
            mempool: mempool.snapshot(),
            difficulty: domain.difficulty.current(),
            intervals: domain.difficulty.pending_intervals(),
        }
    }

    /// Rebuild a core from a snapshot: re-verify the chain, replay every
    /// block through a fresh state (state is a pure function of the chain),
    /// and refill the mempool. Any mismatch is fatal.
    pub fn restore(
        config: CoreConfig,
        verifier: Arc<dyn TxVerifier>,
        snapshot: NodeSnapshot,
    ) -> Result<Self, CoreError> {
        config
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        let params = config.chain_params();

        let chain = Chain::from_blocks(snapshot.blocks)
            .map_err(|e| CoreError::Fatal(e.to_string()))?;
        chain
            .verify_integrity(&config.genesis)
            .map_err(|e| CoreError::Fatal(format!("snapshot failed integrity check: {e}")))?;

        let mut state = State::new();
        let mut committed_txs = HashSet::new();
        for block in chain.blocks() {
            state
                .apply_block(block, &params, verifier.as_ref())
                .map_err(|e| {
                    CoreError::Fatal(format!("snapshot replay rejected block {}: {e}", block.index))
                })?;
            for tx in &block.transactions {
                if !committed_txs.insert(tx.hash.clone()) {
                    return Err(CoreError::Fatal(format!(
                        "transaction {} appears twice in the chain",
                        tx.hash
                    )));
                }
            }
        }

        let difficulty = DifficultyController::restore(
            &config.difficulty,
            snapshot.difficulty,
            snapshot.intervals,
        );

        let mut mempool = Mempool::new(config.mempool.capacity);
        for entry in snapshot.mempool {
            if committed_txs.contains(&entry.tx.hash) {
                continue;
            }
            // Capacity and duplicate rules re-apply; overflow entries drop.
            let _ = mempool.submit(entry.tx, entry.fee);
        }

        let domain = ChainDomain {
            chain,
            state,
            difficulty,
            committed_txs,
            last_append: Instant::now(),
        };

        Ok(Node {
            shared: Arc::new(CoreShared {
                config,
                params,
                verifier,
                domain: RwLock::new(domain),
                mempool: Mutex::new(mempool),
                halted: AtomicBool::new(false),
            }),
            miner: Miner::new(),
        })
    }

    // ------------------------------------------------------------------

    fn ensure_writable(&self) -> Result<(), CoreError> {
        if self.shared.halted.load(Ordering::SeqCst) {
            return Err(CoreError::Fatal("core is halted".to_string()));
        }
        Ok(())
    }

    /// Record a fatal error: halt all further writes.
    fn escalate(&self, err: CoreError) -> CoreError {
        if matches!(err, CoreError::Fatal(_)) {
            error!("halting core: {err}");
            self.shared.halted.store(true, Ordering::SeqCst);
        }
        err
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &CoreShared {
        &self.shared
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        // Best effort: never leave a detached worker hashing.
        let _ = self.miner.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::unix_time_secs;
    use crate::config::Profile;
    use crate::crypto::signatures::PermissiveVerifier;
    use std::time::Duration;

    const PRECISION: u32 = 3;

    /// Scenario configuration: precision 3, reward 100, fee 0.001,
    /// difficulty 1 so blocks mine in microseconds.
    fn test_config() -> CoreConfig {
        let mut config = CoreConfig::new(Profile::Dev);
        config.numeric_precision = PRECISION;
        config.mining.block_reward_base = 100_000; // 100
        config.mining.fee_per_tx = 1; // 0.001
        config.mining.halving_interval = 1_000_000;
        config.difficulty.initial_difficulty = 1;
        config
    }

    fn test_node(config: CoreConfig) -> Node {
        Node::new(config, Arc::new(PermissiveVerifier)).unwrap()
    }

    fn transfer(sender: &str, recipient: &str, units: u64, timestamp: u64) -> Transaction {
        let mut tx = Transaction::new(
            sender,
            recipient,
            Amount::from_units(units),
            timestamp,
            PRECISION,
        );
        tx.signature = b"sig".to_vec();
        tx
    }

    fn supply_matches_issuance(node: &Node) {
        let domain = node.shared().domain.read();
        let issued: u64 = domain
            .chain
            .blocks()
            .iter()
            .flat_map(|b| &b.transactions)
            .filter(|tx| tx.is_coinbase())
            .map(|tx| tx.amount.units())
            .sum();
        assert_eq!(domain.state.total_supply().units(), issued);
    }

    #[test]
    fn genesis_and_first_reward() {
        let node = test_node(test_config());
        assert_eq!(node.get_chain_height(), 0);

        let block = node.mine_once("miner_a").unwrap();
        assert_eq!(node.get_chain_height(), 1);
        assert_eq!(block.index, 1);
        assert!(block.hash.starts_with('0'));
        assert_eq!(
            block.previous_hash,
            node.get_block_by_index(0).unwrap().hash
        );
        assert_eq!(
            node.get_balance("miner_a").balance,
            Amount::from_units(100_000)
        );
        supply_matches_issuance(&node);
    }

    #[test]
    fn simple_transfer() {
        let node = test_node(test_config());
        node.mine_once("miner_a").unwrap();

        let tx = transfer("miner_a", "alice", 40_000, unix_time_secs());
        let hash = node.submit_transaction(tx).unwrap();
        assert_eq!(node.get_status().mempool_size, 1);

        let block = node.mine_once("miner_b").unwrap();
        assert_eq!(block.transactions.len(), 2);
        assert!(block.transactions[0].is_coinbase());
        assert_eq!(block.transactions[0].recipient, "miner_b");
        assert_eq!(
            block.transactions[0].amount,
            Amount::from_units(100_001) // 100 + 0.001 fee
        );
        assert_eq!(block.transactions[1].hash, hash);

        assert_eq!(node.get_balance("miner_a").balance, Amount::from_units(60_000));
        assert_eq!(
            node.get_balance("miner_b").balance,
            Amount::from_units(100_001)
        );
        assert_eq!(node.get_balance("alice").balance, Amount::from_units(40_000));
        assert_eq!(node.get_status().mempool_size, 0);
        supply_matches_issuance(&node);
    }

    #[test]
    fn double_spend_keeps_only_first_by_priority() {
        let node = test_node(test_config());
        node.mine_once("miner_a").unwrap();
        let t = unix_time_secs();
        let tx1 = transfer("miner_a", "bob", 60_000, t);
        let tx2 = transfer("miner_a", "carol", 60_000, t + 1);

        // Both pass the snapshot check: admission sees applied state only,
        // not mempool-adjusted balances.
        node.submit_transaction(tx1.clone()).unwrap();
        node.submit_transaction(tx2.clone()).unwrap();

        let block = node.mine_once("miner_c").unwrap();
        // Exactly one of the two made it in: the earlier timestamp wins the
        // flat-fee tie; the other was dropped during assembly, not requeued.
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[1].hash, tx1.hash);
        assert_eq!(node.get_status().mempool_size, 0);

        assert_eq!(node.get_balance("miner_a").balance, Amount::from_units(40_000));
        assert_eq!(node.get_balance("bob").balance, Amount::from_units(60_000));
        assert_eq!(node.get_balance("carol").balance, Amount::ZERO);
        supply_matches_issuance(&node);
    }

    #[test]
    fn duplicate_submission_is_accepted_then_rejected() {
        let node = test_node(test_config());
        node.mine_once("miner_a").unwrap();

        let tx = transfer("miner_a", "alice", 1_000, unix_time_secs());
        assert!(node.submit_transaction(tx.clone()).is_ok());
        let err = node.submit_transaction(tx.clone()).unwrap_err();
        assert_eq!(err.kind(), "consistency");

        // Still duplicate after the transaction commits.
        node.mine_once("miner_a").unwrap();
        let err = node.submit_transaction(tx).unwrap_err();
        assert_eq!(err.kind(), "consistency");
    }

    #[test]
    fn rejects_unfunded_submission() {
        let node = test_node(test_config());
        let tx = transfer("nobody", "alice", 1, unix_time_secs());
        let err = node.submit_transaction(tx).unwrap_err();
        assert_eq!(err.kind(), "consistency");
    }

    #[test]
    fn rejects_malformed_submission() {
        let node = test_node(test_config());
        node.mine_once("miner_a").unwrap();

        let mut tx = transfer("miner_a", "alice", 1, unix_time_secs());
        tx.signature.clear();
        assert_eq!(node.submit_transaction(tx).unwrap_err().kind(), "validation");

        let coinbase =
            Transaction::coinbase("miner_a", Amount::from_units(1), unix_time_secs(), PRECISION);
        assert_eq!(
            node.submit_transaction(coinbase).unwrap_err().kind(),
            "validation"
        );
    }

    #[test]
    fn difficulty_steps_up_under_rapid_blocks() {
        let mut config = test_config();
        config.difficulty.window = 4;
        config.difficulty.target_block_time_ms = 1_000;
        config.difficulty.initial_difficulty = 2;
        config.difficulty.min_difficulty = 1;
        config.difficulty.max_difficulty = 6;
        let node = test_node(config);

        for _ in 0..5 {
            node.mine_once("miner_d").unwrap();
        }
        assert_eq!(node.get_status().difficulty, 3);
    }

    #[test]
    fn mined_blocks_satisfy_difficulty_in_force() {
        let mut config = test_config();
        config.difficulty.initial_difficulty = 2;
        let node = test_node(config);

        for _ in 0..3 {
            let block = node.mine_once("miner").unwrap();
            assert!(block.hash.starts_with("00"));
        }
    }

    #[test]
    fn start_then_stop_leaves_no_partial_state() {
        let mut config = test_config();
        // Hard enough that no block lands while we stop immediately.
        config.difficulty.initial_difficulty = 7;
        config.difficulty.max_difficulty = 7;
        let node = test_node(config);

        let before = node.get_status();
        node.start_mining("miner_d").unwrap();
        assert!(node.get_status().is_mining);
        node.stop_mining().unwrap();

        let after = node.get_status();
        assert!(!after.is_mining);
        assert_eq!(after.height, before.height);
        assert_eq!(after.mempool_size, before.mempool_size);
    }

    #[test]
    fn background_worker_mines_blocks() {
        let node = test_node(test_config());
        node.start_mining("miner_a").unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while node.get_chain_height() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        node.stop_mining().unwrap();

        assert!(node.get_chain_height() >= 1);
        assert!(node.get_balance("miner_a").balance > Amount::ZERO);
        supply_matches_issuance(&node);
    }

    #[test]
    fn start_and_stop_report_running_state() {
        let mut config = test_config();
        config.difficulty.initial_difficulty = 7;
        config.difficulty.max_difficulty = 7;
        let node = test_node(config);

        assert_eq!(node.stop_mining().unwrap_err().kind(), "consistency");
        node.start_mining("miner").unwrap();
        assert_eq!(node.start_mining("miner").unwrap_err().kind(), "consistency");
        node.stop_mining().unwrap();
    }

    #[test]
    fn nonce_exhaustion_is_transient_and_mutation_free() {
        let mut config = test_config();
        config.difficulty.initial_difficulty = 7;
        config.difficulty.max_difficulty = 7;
        config.mining.max_nonce = 10;
        let node = test_node(config);

        let err = node.mine_once("miner").unwrap_err();
        assert_eq!(err.kind(), "transient");
        assert_eq!(node.get_chain_height(), 0);
        assert_eq!(node.get_status().mempool_size, 0);
    }

    #[test]
    fn empty_round_policy() {
        let mut config = test_config();
        config.mining.allow_empty_rounds = false;
        let node = test_node(config);

        let err = node.mine_once("miner").unwrap_err();
        assert_eq!(err.kind(), "consistency");
        assert_eq!(node.get_chain_height(), 0);
    }

    #[test]
    fn block_capacity_bounds_selection() {
        let mut config = test_config();
        config.mining.max_transactions_per_block = 3;
        let node = test_node(config);
        node.mine_once("miner_a").unwrap();

        let t = unix_time_secs();
        for i in 0..5u64 {
            let tx = transfer("miner_a", "alice", 1_000 + i, t + i);
            node.submit_transaction(tx).unwrap();
        }

        let block = node.mine_once("miner_b").unwrap();
        assert_eq!(block.transactions.len(), 3); // coinbase + 2
        assert_eq!(node.get_status().mempool_size, 3);
    }

    #[test]
    fn stake_and_unstake_through_the_api() {
        let node = test_node(test_config());
        node.mine_once("miner_a").unwrap();

        node.stake("miner_a", Amount::from_units(30_000)).unwrap();
        let entry = node.get_balance("miner_a");
        assert_eq!(entry.balance, Amount::from_units(70_000));
        assert_eq!(entry.stake, Amount::from_units(30_000));

        // Staked value cannot be spent.
        let tx = transfer("miner_a", "alice", 80_000, unix_time_secs());
        assert_eq!(node.submit_transaction(tx).unwrap_err().kind(), "consistency");

        node.unstake("miner_a", Amount::from_units(30_000)).unwrap();
        assert_eq!(
            node.get_balance("miner_a").balance,
            Amount::from_units(100_000)
        );
        assert_eq!(
            node.unstake("miner_a", Amount::from_units(1)).unwrap_err().kind(),
            "consistency"
        );
        supply_matches_issuance(&node);
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let node = test_node(test_config());
        node.mine_once("miner_a").unwrap();
        let tx = transfer("miner_a", "alice", 40_000, unix_time_secs());
        node.submit_transaction(tx).unwrap();
        node.mine_once("miner_b").unwrap();
        let pending = transfer("miner_b", "carol", 5_000, unix_time_secs());
        node.submit_transaction(pending).unwrap();

        let snapshot = node.snapshot();
        let bytes = snapshot.to_bytes().unwrap();
        let decoded = NodeSnapshot::from_bytes(&bytes).unwrap();

        let restored =
            Node::restore(test_config(), Arc::new(PermissiveVerifier), decoded).unwrap();

        assert_eq!(restored.get_chain_height(), node.get_chain_height());
        assert_eq!(restored.get_latest_block(), node.get_latest_block());
        assert_eq!(restored.get_status(), node.get_status());
        for address in ["miner_a", "miner_b", "alice", "carol"] {
            assert_eq!(restored.get_balance(address), node.get_balance(address));
        }
        supply_matches_issuance(&restored);
    }

    #[test]
    fn restore_rejects_tampered_snapshot() {
        let node = test_node(test_config());
        node.mine_once("miner_a").unwrap();

        let mut snapshot = node.snapshot();
        snapshot.blocks[1].timestamp += 1;

        let err = Node::restore(test_config(), Arc::new(PermissiveVerifier), snapshot)
            .unwrap_err();
        assert_eq!(err.kind(), "fatal");
    }

    #[test]
    fn restored_mempool_drops_committed_entries() {
        let node = test_node(test_config());
        node.mine_once("miner_a").unwrap();
        let tx = transfer("miner_a", "alice", 1_000, unix_time_secs());
        node.submit_transaction(tx.clone()).unwrap();

        let mut snapshot = node.snapshot();
        node.mine_once("miner_a").unwrap();
        // Graft the now-committed chain onto the old mempool contents.
        snapshot.blocks = node.snapshot().blocks;

        let restored =
            Node::restore(test_config(), Arc::new(PermissiveVerifier), snapshot).unwrap();
        assert_eq!(restored.get_status().mempool_size, 0);
    }

    #[test]
    fn queries_observe_committed_state_only() {
        let node = test_node(test_config());
        let genesis = node.get_latest_block();
        assert_eq!(genesis.index, 0);
        assert_eq!(node.get_block_by_index(9).unwrap_err().kind(), "not_found");
        assert_eq!(node.get_balance("unknown"), AccountEntry::default());

        let status = node.get_status();
        assert_eq!(status.height, 0);
        assert_eq!(status.last_block_hash, genesis.hash);
        assert_eq!(status.mempool_size, 0);
    }

    #[test]
    fn concurrent_submissions_and_mining_stay_consistent() {
        let node = Arc::new(test_node(test_config()));
        node.mine_once("miner_a").unwrap();

        let submitter = {
            let node = Arc::clone(&node);
            std::thread::spawn(move || {
                let t = unix_time_secs();
                for i in 0..20u64 {
                    let tx = transfer("miner_a", "alice", 100, t + i);
                    // Races with mining are expected; only the kinds matter.
                    if let Err(err) = node.submit_transaction(tx) {
                        assert_ne!(err.kind(), "fatal");
                    }
                }
            })
        };

        for _ in 0..5 {
            node.mine_once("miner_b").unwrap();
        }
        submitter.join().unwrap();

        supply_matches_issuance(&node);
        let domain = node.shared().domain.read();
        assert!(domain.chain.verify_integrity(&node.shared().config.genesis).is_ok());
    }
}

//! Demonstration of mining blocks and spending the rewards through the
//! public node API. Two ed25519 wallets are generated; the first mines a
//! few blocks, then pays the second, and the payment is confirmed by the
//! next block.
//!
//! To run this example:
//!
//! ```bash
//! cargo run --bin mine_and_send
//! ```

use std::sync::Arc;

use meridian_chain::blockchain::unix_time_secs;
use meridian_chain::{
    Amount, CoreConfig, Ed25519Signer, Ed25519Verifier, Node, Profile, Transaction, TxSigner,
};

const NUM_BLOCKS: u64 = 5;

fn mrd(amount: Amount, precision: u32) -> String {
    format!("{} MRD", amount.to_decimal(precision))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = CoreConfig::new(Profile::Dev);
    let precision = config.numeric_precision;
    let node = Node::new(config, Arc::new(Ed25519Verifier))?;

    // Wallets are just keypairs; the address is the hex verifying key.
    let miner = Ed25519Signer::generate();
    let friend = Ed25519Signer::generate();
    println!("Miner wallet:  {}", miner.address());
    println!("Friend wallet: {}", friend.address());
    println!();

    for _ in 0..NUM_BLOCKS {
        let block = node.mine_once(&miner.address())?;
        println!(
            "Mined block {} (nonce {}, {} txs): {}",
            block.index,
            block.nonce,
            block.transactions.len(),
            block.hash
        );
    }

    let balance = node.get_balance(&miner.address()).balance;
    println!();
    println!("Miner balance after {NUM_BLOCKS} blocks: {}", mrd(balance, precision));

    // Pay the friend a third of the rewards and confirm with one more block.
    let amount = Amount::from_units(balance.units() / 3);
    let mut payment = Transaction::new(
        miner.address(),
        friend.address(),
        amount,
        unix_time_secs(),
        precision,
    );
    payment.sign(&miner, precision);
    let hash = node.submit_transaction(payment)?;
    println!("Submitted payment {} ({})", hash, mrd(amount, precision));

    let block = node.mine_once(&miner.address())?;
    println!(
        "Payment confirmed in block {} ({} txs)",
        block.index,
        block.transactions.len()
    );
    println!();

    let status = node.get_status();
    println!("Final height: {}", status.height);
    println!("Tip: {}", status.last_block_hash);
    println!(
        "Miner:  {}",
        mrd(node.get_balance(&miner.address()).balance, precision)
    );
    println!(
        "Friend: {}",
        mrd(node.get_balance(&friend.address()).balance, precision)
    );

    Ok(())
}

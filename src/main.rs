//! Binary entry point for meridian-chain.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;

// ----- Crate imports -----
use meridian_chain::{CoreConfig, Ed25519Verifier, Node, Profile};

#[derive(Debug, Clone)]
struct NodeOptions {
    /// Deployment profile when no config file is given.
    profile: Profile,
    /// Optional TOML config file overriding the profile defaults.
    config_file: Option<PathBuf>,
    /// Address credited with mining rewards; mining starts when set.
    mine_to: Option<String>,
    /// How often the status line is logged, in seconds.
    status_interval_secs: u64,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            profile: Profile::Production,
            config_file: None,
            mine_to: None,
            status_interval_secs: 10,
        }
    }
}

impl NodeOptions {
    fn from_env_args() -> Self {
        let mut opts = Self::default();
        let mut args = env::args().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--profile" => match args.next().as_deref() {
                    Some("production") => opts.profile = Profile::Production,
                    Some("dev") => opts.profile = Profile::Dev,
                    other => {
                        eprintln!("Invalid --profile: {:?} (expected production|dev)", other);
                        print_help_and_exit();
                    }
                },
                "--config" => {
                    if let Some(val) = args.next() {
                        opts.config_file = Some(PathBuf::from(val));
                    } else {
                        eprintln!("Missing value after --config");
                        print_help_and_exit();
                    }
                }
                "--mine-to" => {
                    if let Some(val) = args.next() {
                        opts.mine_to = Some(val);
                    } else {
                        eprintln!("Missing value after --mine-to");
                        print_help_and_exit();
                    }
                }
                "--status-interval-secs" => {
                    if let Some(val) = args.next() {
                        match u64::from_str(&val) {
                            Ok(n) => opts.status_interval_secs = n.max(1),
                            Err(_) => eprintln!(
                                "Invalid --status-interval-secs: {} (default {})",
                                val, opts.status_interval_secs
                            ),
                        }
                    } else {
                        eprintln!(
                            "Missing value after --status-interval-secs (default {})",
                            opts.status_interval_secs
                        );
                    }
                }
                "--help" | "-h" => {
                    print_help_and_exit();
                }
                other => {
                    eprintln!("Unknown argument: {}", other);
                    print_help_and_exit();
                }
            }
        }

        opts
    }
}

fn print_help_and_exit() -> ! {
    eprintln!(
        "\
meridian-chain

USAGE:
  meridian-chain [FLAGS]

FLAGS:
  --profile <production|dev>     Built-in configuration profile (default production)
  --config <path>                Load configuration from a TOML file
  --mine-to <address>            Start mining, paying rewards to <address>
  --status-interval-secs <u64>   How often to log node status (default 10)
  -h, --help                     Show this help and exit
"
    );
    std::process::exit(0);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = NodeOptions::from_env_args();

    let config = match &opts.config_file {
        Some(path) => CoreConfig::from_file(path)?,
        None => CoreConfig::new(opts.profile.clone()),
    };
    log::info!(
        "Starting node ({:?} profile, difficulty {}, mempool capacity {})",
        config.profile,
        config.difficulty.initial_difficulty,
        config.mempool.capacity
    );

    let node = Arc::new(Node::new(config, Arc::new(Ed25519Verifier))?);

    if let Some(address) = &opts.mine_to {
        node.start_mining(address)?;
        log::info!("Mining started, rewards to {}", address);
    }

    let status_node = Arc::clone(&node);
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(opts.status_interval_secs));
        loop {
            interval.tick().await;
            let status = status_node.get_status();
            log::info!(
                "status: height={}, mempool={}, difficulty={}, mining={}, tip={}",
                status.height,
                status.mempool_size,
                status.difficulty,
                status.is_mining,
                status.last_block_hash
            );
        }
    });

    log::info!("Node running. Press Ctrl+C to stop.");
    signal::ctrl_c().await?;

    if node.get_status().is_mining {
        node.stop_mining()?;
        log::info!("Mining stopped.");
    }
    log::info!("Shutdown complete.");
    Ok(())
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::blockchain::transaction::Amount;

/// Deployment profile. `Dev` lowers the PoW difficulty so blocks arrive in
/// milliseconds on a laptop; `Production` uses the real schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Production,
    Dev,
}

impl Profile {
    pub fn default_initial_difficulty(&self) -> u32 {
        match self {
            Profile::Production => 4,
            Profile::Dev => 1,
        }
    }

    pub fn default_target_block_time_ms(&self) -> u64 {
        match self {
            Profile::Production => 10_000,
            Profile::Dev => 1_000,
        }
    }

    pub fn genesis_timestamp(&self) -> u64 {
        match self {
            // Fixed so every node derives the identical genesis block.
            Profile::Production => 1_700_000_000,
            Profile::Dev => 1_700_000_000,
        }
    }
}

/// Sentinel used as the previous-hash of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenesisConfig {
    /// Previous-hash sentinel written into block 0.
    pub previous_hash: String,
    /// Fixed creation time of block 0, seconds since epoch.
    pub timestamp: u64,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            timestamp: Profile::Production.genesis_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DifficultyConfig {
    /// Target interval between blocks, in milliseconds.
    pub target_block_time_ms: u64,
    /// Inclusive lower bound on difficulty (leading hex zeros).
    pub min_difficulty: u32,
    /// Inclusive upper bound on difficulty.
    pub max_difficulty: u32,
    /// Difficulty in force at genesis; must lie within the bounds.
    pub initial_difficulty: u32,
    /// Number of block intervals per retarget window.
    pub window: usize,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            target_block_time_ms: 10_000,
            min_difficulty: 1,
            max_difficulty: 12,
            initial_difficulty: 4,
            window: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MiningConfig {
    /// Block capacity, coinbase included.
    pub max_transactions_per_block: usize,
    /// Serialized block ceiling in bytes.
    pub max_block_bytes: usize,
    /// Initial issuance per block, in base units.
    pub block_reward_base: u64,
    /// Blocks per halving era.
    pub halving_interval: u64,
    /// Flat fee per non-coinbase transaction, in base units. Used for mempool
    /// priority and miner issuance, never debited from senders.
    pub fee_per_tx: u64,
    /// Nonce search ceiling; exceeding it fails the round as NonceExhausted.
    pub max_nonce: u64,
    /// Whether coinbase-only blocks may be mined.
    pub allow_empty_rounds: bool,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            max_transactions_per_block: 50,
            max_block_bytes: 1024 * 1024, // 1 MiB
            block_reward_base: 5_000_000_000, // 50 MRD at precision 8
            halving_interval: 210_000,
            fee_per_tx: 100_000, // 0.001 MRD at precision 8
            max_nonce: 1 << 32,
            allow_empty_rounds: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MempoolConfig {
    /// Maximum number of pending transactions held.
    pub capacity: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoreConfig {
    pub profile: Profile,
    /// Fractional digits carried by amounts; fixes the canonical decimal
    /// rendering used for content hashing.
    pub numeric_precision: u32,
    pub genesis: GenesisConfig,
    pub difficulty: DifficultyConfig,
    pub mining: MiningConfig,
    pub mempool: MempoolConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Production,
            numeric_precision: 8,
            genesis: GenesisConfig::default(),
            difficulty: DifficultyConfig::default(),
            mining: MiningConfig::default(),
            mempool: MempoolConfig::default(),
        }
    }
}

/// Validation context handed to block and state checks: the subset of the
/// configuration that consensus rules depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParams {
    pub max_transactions_per_block: usize,
    pub max_block_bytes: usize,
    pub block_reward_base: Amount,
    pub halving_interval: u64,
    pub fee_per_tx: Amount,
    pub numeric_precision: u32,
}

impl CoreConfig {
    pub fn new(profile: Profile) -> Self {
        let mut config = Self {
            profile: profile.clone(),
            ..Self::default()
        };

        config.genesis.timestamp = profile.genesis_timestamp();
        config.difficulty.initial_difficulty = profile.default_initial_difficulty();
        config.difficulty.target_block_time_ms = profile.default_target_block_time_ms();

        config
    }

    pub fn chain_params(&self) -> ChainParams {
        ChainParams {
            max_transactions_per_block: self.mining.max_transactions_per_block,
            max_block_bytes: self.mining.max_block_bytes,
            block_reward_base: Amount::from_units(self.mining.block_reward_base),
            halving_interval: self.mining.halving_interval,
            fee_per_tx: Amount::from_units(self.mining.fee_per_tx),
            numeric_precision: self.numeric_precision,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.difficulty;
        if d.min_difficulty > d.max_difficulty {
            return Err(ConfigError::ValidationError(
                "min_difficulty exceeds max_difficulty".to_string(),
            ));
        }
        if d.initial_difficulty < d.min_difficulty || d.initial_difficulty > d.max_difficulty {
            return Err(ConfigError::ValidationError(
                "initial_difficulty outside [min, max]".to_string(),
            ));
        }
        if d.window < 2 {
            return Err(ConfigError::ValidationError(
                "difficulty window must hold at least 2 intervals".to_string(),
            ));
        }
        if d.target_block_time_ms == 0 {
            return Err(ConfigError::ValidationError(
                "target_block_time_ms must be positive".to_string(),
            ));
        }
        if self.mining.max_transactions_per_block == 0 {
            return Err(ConfigError::ValidationError(
                "max_transactions_per_block must admit at least the coinbase".to_string(),
            ));
        }
        if self.mining.halving_interval == 0 {
            return Err(ConfigError::ValidationError(
                "halving_interval must be positive".to_string(),
            ));
        }
        if self.mining.max_nonce == 0 {
            return Err(ConfigError::ValidationError(
                "max_nonce must be positive".to_string(),
            ));
        }
        if self.mempool.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "mempool capacity must be positive".to_string(),
            ));
        }
        if self.numeric_precision > 12 {
            return Err(ConfigError::ValidationError(
                "numeric_precision above 12 overflows u64 amounts".to_string(),
            ));
        }
        if self.genesis.previous_hash.is_empty() {
            return Err(ConfigError::ValidationError(
                "genesis previous_hash must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: CoreConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    pub fn to_file(&self, path: &PathBuf) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Default location for the node's config file.
pub fn default_config_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("./data"))
        .join("meridian")
        .join("config.toml")
}

//! Configuration for the wallet ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Wallet ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for the RocksDB backend
    pub data_dir: PathBuf,

    /// Hex-encoded 32-byte commitment key; `None` means an ephemeral key is
    /// generated at startup (commitments then do not survive a restart)
    pub commitment_key_hex: Option<String>,

    /// RocksDB tuning
    pub rocksdb: RocksDbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/wallet-ledger"),
            commitment_key_hex: None,
            rocksdb: RocksDbConfig::default(),
        }
    }
}

/// RocksDB tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Target file size (MB)
    pub target_file_size_mb: u64,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            target_file_size_mb: 64,
            max_background_jobs: 2,
        }
    }
}

impl Config {
    /// Load from TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("WALLET_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(key) = std::env::var("WALLET_LEDGER_COMMITMENT_KEY") {
            config.commitment_key_hex = Some(key);
        }

        Ok(config)
    }

    /// Build the privacy codec this config describes
    pub fn privacy_codec(&self) -> crate::Result<crate::PrivacyCodec> {
        match &self.commitment_key_hex {
            Some(hex_key) => crate::PrivacyCodec::from_hex_key(hex_key),
            None => Ok(crate::PrivacyCodec::ephemeral()),
        }
    }
}

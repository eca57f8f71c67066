//! Configuration for the audit store

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which store backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, non-durable
    Memory,
    /// RocksDB under `data_dir`
    Rocksdb,
}

/// Audit store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection
    pub backend: StoreBackend,

    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// RocksDB tuning
    #[serde(default)]
    pub rocksdb: RocksDBConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Rocksdb,
            data_dir: PathBuf::from("./data/audit"),
            rocksdb: RocksDBConfig::default(),
        }
    }
}

impl StoreConfig {
    /// In-memory configuration (tests, simulations)
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ..Default::default()
        }
    }

    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse store config: {}", e)))
    }

    /// Apply `FTH_STORE_*` environment overrides
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Ok(backend) = std::env::var("FTH_STORE_BACKEND") {
            self.backend = match backend.trim().to_ascii_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "rocksdb" => StoreBackend::Rocksdb,
                other => {
                    return Err(crate::Error::Config(format!(
                        "Unknown store backend: {}",
                        other
                    )))
                }
            };
        }

        if let Ok(data_dir) = std::env::var("FTH_STORE_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir.trim());
        }

        Ok(())
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 16,
            max_write_buffer_number: 2,
            max_background_jobs: 2,
        }
    }
}

//! Configuration for the registry client

use crate::types::normalize_address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Registry configuration
///
/// Transactions are sent with `eth_sendTransaction` from `operator_address`;
/// the key stays with the node's signer (Clef, web3signer or a KMS proxy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Expected chain ID
    pub chain_id: u64,

    /// PoR registry contract
    pub por_registry: String,

    /// Compliance registry contract
    pub compliance_registry: String,

    /// Operator account
    pub operator_address: String,

    /// Bound on waiting for a receipt (seconds)
    pub receipt_timeout_secs: u64,

    /// Receipt poll interval (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31337,
            por_registry: String::new(),
            compliance_registry: String::new(),
            operator_address: String::new(),
            receipt_timeout_secs: 120,
            poll_interval_ms: 1000,
        }
    }
}

impl RegistryConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read registry config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse registry config: {}", e)))
    }

    /// Build from `EVM_*` environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `EVM_*` environment overrides
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Some(v) = env_var("EVM_RPC_URL") {
            self.rpc_url = v;
        }
        if let Some(v) = env_var("EVM_CHAIN_ID") {
            self.chain_id = v
                .parse()
                .map_err(|_| crate::Error::Config(format!("Invalid EVM_CHAIN_ID: {}", v)))?;
        }
        if let Some(v) = env_var("EVM_FTH_POR_REGISTRY_ADDRESS") {
            self.por_registry = v;
        }
        if let Some(v) = env_var("EVM_COMPLIANCE_REGISTRY_ADDRESS") {
            self.compliance_registry = v;
        }
        if let Some(v) = env_var("EVM_OPERATOR_ADDRESS") {
            self.operator_address = v;
        }
        if let Some(v) = env_var("EVM_RECEIPT_TIMEOUT_SECS") {
            self.receipt_timeout_secs = v.parse().map_err(|_| {
                crate::Error::Config(format!("Invalid EVM_RECEIPT_TIMEOUT_SECS: {}", v))
            })?;
        }
        Ok(())
    }

    /// Check addresses are well-formed
    pub fn validate(&self) -> crate::Result<()> {
        let addresses = [
            ("EVM_FTH_POR_REGISTRY_ADDRESS", &self.por_registry),
            ("EVM_COMPLIANCE_REGISTRY_ADDRESS", &self.compliance_registry),
            ("EVM_OPERATOR_ADDRESS", &self.operator_address),
        ];
        for (name, value) in addresses {
            normalize_address(value)
                .map_err(|_| crate::Error::Config(format!("{} is missing or malformed", name)))?;
        }
        if self.receipt_timeout_secs == 0 {
            return Err(crate::Error::Config(
                "receipt_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Receipt timeout
    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    /// Poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

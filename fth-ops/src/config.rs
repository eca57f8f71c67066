//! Operations configuration
//!
//! One TOML file with a section per component; every section is optional and
//! falls back to its defaults. Environment variables override the file.
//!
//! ```toml
//! [xrpl]
//! rpc_url = "https://s.altnet.rippletest.net:51234"
//! fthusd_issuer = "r..."
//! usdf_issuer = "r..."
//! gold_vault = "r..."
//! oracle_account = "r..."
//! submit_timeout_secs = 20
//!
//! [store]
//! backend = "rocksdb"
//! data_dir = "/var/lib/fth/audit"
//!
//! [schedule]
//! por_time = "00:00"
//! reconciliation_time = "00:30"
//! dex_scan_minute = 0
//! ```

use crate::{scheduler::ScheduleConfig, Error, Result};
use audit_ledger::StoreConfig;
use evm_registry::RegistryConfig;
use reconciliation::ReconciliationConfig;
use reserves::TreasuryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use xrpl_client::XrplConfig;

/// Metrics output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Node-exporter textfile to rewrite after every run
    pub textfile_path: Option<PathBuf>,
}

/// Aggregate configuration of the operations binary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpsConfig {
    /// XRPL client
    #[serde(default)]
    pub xrpl: XrplConfig,

    /// EVM registry
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Audit store
    #[serde(default)]
    pub store: StoreConfig,

    /// Treasury figures
    #[serde(default)]
    pub treasury: TreasuryConfig,

    /// Reconciliation thresholds
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,

    /// Job schedule
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Metrics output
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl OpsConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// File (if any) plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.schedule.validate()?;
        Ok(config)
    }

    /// Apply every component's environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        self.xrpl.apply_env()?;
        self.registry.apply_env()?;
        self.store.apply_env()?;
        self.treasury.apply_env()?;
        self.reconciliation.apply_env()?;
        self.schedule.apply_env()?;
        if let Ok(v) = std::env::var("FTH_METRICS_TEXTFILE") {
            let v = v.trim();
            self.metrics.textfile_path = (!v.is_empty()).then(|| PathBuf::from(v));
        }
        Ok(())
    }

    /// Checks needed before touching the real ledgers
    pub fn validate_live(&self) -> Result<()> {
        self.xrpl.validate()?;
        self.registry.validate()?;
        self.reconciliation.validate()?;
        self.schedule.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_ledger::StoreBackend;
    use std::io::Write;

    #[test]
    fn test_sections_are_optional() {
        let config: OpsConfig = toml::from_str(
            r#"
            [store]
            backend = "memory"
            data_dir = "/tmp/unused"

            [schedule]
            por_time = "01:15"
            reconciliation_time = "01:45"
            dex_scan_minute = 30
            lease_ttl_secs = 900
            tick_secs = 15
            "#,
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.schedule.por_time, "01:15");
        assert_eq!(config.schedule.dex_scan_minute, 30);
        assert_eq!(config.reconciliation, ReconciliationConfig::default());
        assert!(config.metrics.textfile_path.is_none());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [treasury]
            report_base_uri = "https://reports.fth.example/por"

            [metrics]
            textfile_path = "/var/lib/node_exporter/fth_ops.prom"
            "#
        )
        .unwrap();

        let config = OpsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.treasury.report_base_uri, "https://reports.fth.example/por");
        assert_eq!(
            config.metrics.textfile_path,
            Some(PathBuf::from("/var/lib/node_exporter/fth_ops.prom"))
        );
    }

    #[test]
    fn test_live_validation_requires_accounts() {
        assert!(OpsConfig::default().validate_live().is_err());
    }
}

//! Treasury configuration

use crate::sources::StaticReserveSource;
use serde::{Deserialize, Serialize};

/// Treasury configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryConfig {
    /// Base URI of the detailed PoR reports
    pub report_base_uri: String,

    /// Configured asset figures
    #[serde(default)]
    pub reserves: StaticReserveSource,

    /// Read liabilities from XRPL instead of `reserves`
    #[serde(default = "default_true")]
    pub liabilities_from_ledger: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            report_base_uri: "https://example.com/por".to_string(),
            reserves: StaticReserveSource::default(),
            liabilities_from_ledger: true,
        }
    }
}

impl TreasuryConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read treasury config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse treasury config: {}", e)))
    }

    /// Apply `TREASURY_*` environment overrides
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Ok(v) = std::env::var("TREASURY_REPORT_BASE_URI") {
            if !v.trim().is_empty() {
                self.report_base_uri = v.trim().to_string();
            }
        }
        let figures = [
            ("TREASURY_BANK_CASH_CENTS", &mut self.reserves.bank_cash_cents),
            ("TREASURY_GOLD_VALUE_CENTS", &mut self.reserves.gold_value_cents),
            ("TREASURY_OTHER_ASSETS_CENTS", &mut self.reserves.other_assets_cents),
        ];
        for (name, slot) in figures {
            if let Ok(v) = std::env::var(name) {
                *slot = v
                    .parse()
                    .map_err(|_| crate::Error::Config(format!("Invalid {}: {}", name, v)))?;
            }
        }
        Ok(())
    }
}

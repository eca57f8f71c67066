//! Reconciliation configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reconciliation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Absolute tolerance in token units; figures match when `|a - b| < tolerance`
    /// (default 0.001, a tenth of a cent)
    #[serde(with = "rust_decimal::serde::str")]
    pub tolerance: Decimal,

    /// Minimum PoR coverage (basis points)
    pub min_coverage_bps: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(1, 3),
            min_coverage_bps: 10_000,
        }
    }
}

impl ReconciliationConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("Failed to read reconciliation config: {}", e))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::Error::Config(format!("Failed to parse reconciliation config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RECONCILIATION_*` environment overrides
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Ok(v) = std::env::var("RECONCILIATION_TOLERANCE") {
            self.tolerance = v.trim().parse().map_err(|_| {
                crate::Error::Config(format!("Invalid RECONCILIATION_TOLERANCE: {}", v))
            })?;
        }
        if let Ok(v) = std::env::var("RECONCILIATION_MIN_COVERAGE_BPS") {
            self.min_coverage_bps = v.trim().parse().map_err(|_| {
                crate::Error::Config(format!("Invalid RECONCILIATION_MIN_COVERAGE_BPS: {}", v))
            })?;
        }
        self.validate()
    }

    /// Tolerance must be positive
    pub fn validate(&self) -> crate::Result<()> {
        if self.tolerance <= Decimal::ZERO {
            return Err(crate::Error::Config(
                "tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = ReconciliationConfig::default();
        assert_eq!(config.tolerance, dec!(0.001));
        assert_eq!(config.min_coverage_bps, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_and_validate() {
        let config: ReconciliationConfig = toml::from_str(
            r#"
            tolerance = "0.01"
            min_coverage_bps = 10500
            "#,
        )
        .unwrap();
        assert_eq!(config.tolerance, dec!(0.01));

        let zero = ReconciliationConfig {
            tolerance: Decimal::ZERO,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }
}

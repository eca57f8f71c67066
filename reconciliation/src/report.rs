//! Reconciliation report

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `|a - b| < tolerance`
pub fn within_tolerance(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() < tolerance
}

/// Token amount quantized to whole cents, half away from zero
///
/// PoR liabilities are attested in cents, so on-chain supply is compared
/// against them at that precision.
pub fn to_cents(units: Decimal) -> Decimal {
    units.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Overall outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Every invariant holds
    Success,
    /// At least one invariant failed, or a figure could not be read
    Failure,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Success => write!(f, "success"),
            ReportStatus::Failure => write!(f, "failure"),
        }
    }
}

/// The five reconciliation invariants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invariants {
    /// On-chain FTHUSD matches the flow history
    #[serde(rename = "onChainFTHUSDMatchesDB")]
    pub on_chain_fthusd_matches_db: bool,
    /// On-chain USDF matches the flow history
    #[serde(rename = "onChainUSDFMatchesDB")]
    pub on_chain_usdf_matches_db: bool,
    /// On-chain FTHUSD matches the attested liabilities
    #[serde(rename = "onChainFTHUSDMatchesPoRLiabilities")]
    pub on_chain_fthusd_matches_por_liabilities: bool,
    /// On-chain USDF matches the attested USDF figure
    #[serde(rename = "onChainUSDFMatchesPoRLiabilities")]
    pub on_chain_usdf_matches_por_liabilities: bool,
    /// Attested coverage at or above the minimum
    pub por_coverage_above_threshold: bool,
}

impl Invariants {
    /// Whether all five hold
    pub fn all_hold(&self) -> bool {
        self.on_chain_fthusd_matches_db
            && self.on_chain_usdf_matches_db
            && self.on_chain_fthusd_matches_por_liabilities
            && self.on_chain_usdf_matches_por_liabilities
            && self.por_coverage_above_threshold
    }

    /// Names of the failed invariants
    pub fn failed(&self) -> Vec<&'static str> {
        let checks = [
            ("onChainFTHUSDMatchesDB", self.on_chain_fthusd_matches_db),
            ("onChainUSDFMatchesDB", self.on_chain_usdf_matches_db),
            (
                "onChainFTHUSDMatchesPoRLiabilities",
                self.on_chain_fthusd_matches_por_liabilities,
            ),
            (
                "onChainUSDFMatchesPoRLiabilities",
                self.on_chain_usdf_matches_por_liabilities,
            ),
            ("porCoverageAboveThreshold", self.por_coverage_above_threshold),
        ];
        checks
            .into_iter()
            .filter(|(_, holds)| !holds)
            .map(|(name, _)| name)
            .collect()
    }
}

/// Full reconciliation report, persisted as the payload of the run's record
///
/// Figures are in token units; the PoR figures are the registry's cents / 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    /// Run instant
    pub timestamp: DateTime<Utc>,
    /// Outcome
    pub status: ReportStatus,
    /// Human-readable outcome
    pub details: String,
    /// FTHUSD per issuer trustlines
    #[serde(rename = "onChainFTHUSDSupply")]
    pub on_chain_fthusd_supply: Decimal,
    /// USDF per issuer trustlines
    #[serde(rename = "onChainUSDFSupply")]
    pub on_chain_usdf_supply: Decimal,
    /// FTHUSD per flow history
    #[serde(rename = "dbFTHUSDSupply")]
    pub db_fthusd_supply: Decimal,
    /// USDF per flow history
    #[serde(rename = "dbUSDFSupply")]
    pub db_usdf_supply: Decimal,
    /// Attested FTHUSD liabilities
    #[serde(rename = "porLiabilitiesFTHUSD")]
    pub por_liabilities_fthusd: Decimal,
    /// Attested USDF figure
    #[serde(rename = "porLiabilitiesUSDF")]
    pub por_liabilities_usdf: Decimal,
    /// Attested total assets
    pub por_total_assets: Decimal,
    /// Attested coverage (basis points)
    pub por_coverage_ratio_bps: u128,
    /// Tolerance the figures were compared with
    pub tolerance: Decimal,
    /// Invariant outcomes
    pub invariants: Invariants,
}

impl ReconciliationReport {
    /// Empty failed report, filled in as figures are read
    pub fn started(timestamp: DateTime<Utc>, tolerance: Decimal) -> Self {
        Self {
            timestamp,
            status: ReportStatus::Failure,
            details: "Reconciliation did not complete.".to_string(),
            on_chain_fthusd_supply: Decimal::ZERO,
            on_chain_usdf_supply: Decimal::ZERO,
            db_fthusd_supply: Decimal::ZERO,
            db_usdf_supply: Decimal::ZERO,
            por_liabilities_fthusd: Decimal::ZERO,
            por_liabilities_usdf: Decimal::ZERO,
            por_total_assets: Decimal::ZERO,
            por_coverage_ratio_bps: 0,
            tolerance,
            invariants: Invariants::default(),
        }
    }

    /// Compute the invariants from the figures and settle the status
    pub fn evaluate(&mut self, min_coverage_bps: u32) {
        let tol = self.tolerance;
        self.invariants = Invariants {
            on_chain_fthusd_matches_db: within_tolerance(
                self.on_chain_fthusd_supply,
                self.db_fthusd_supply,
                tol,
            ),
            on_chain_usdf_matches_db: within_tolerance(
                self.on_chain_usdf_supply,
                self.db_usdf_supply,
                tol,
            ),
            on_chain_fthusd_matches_por_liabilities: within_tolerance(
                to_cents(self.on_chain_fthusd_supply),
                self.por_liabilities_fthusd,
                tol,
            ),
            on_chain_usdf_matches_por_liabilities: within_tolerance(
                to_cents(self.on_chain_usdf_supply),
                self.por_liabilities_usdf,
                tol,
            ),
            por_coverage_above_threshold: self.por_coverage_ratio_bps
                >= u128::from(min_coverage_bps),
        };

        if self.invariants.all_hold() {
            self.status = ReportStatus::Success;
            self.details = "All supply and reserve invariants satisfied.".to_string();
        } else {
            self.status = ReportStatus::Failure;
            self.details = format!(
                "Invariants failed: {}",
                self.invariants.failed().join(", ")
            );
        }
    }

    /// Mark failed because a figure could not be read
    pub fn abort(&mut self, reason: impl fmt::Display) {
        self.status = ReportStatus::Failure;
        self.invariants = Invariants::default();
        self.details = format!("Reconciliation failed: {}", reason);
    }

    /// Whether the run succeeded
    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn balanced() -> ReconciliationReport {
        let mut report = ReconciliationReport::started(Utc::now(), dec!(0.001));
        report.on_chain_fthusd_supply = dec!(1000);
        report.db_fthusd_supply = dec!(1000);
        report.por_liabilities_fthusd = dec!(1000);
        report.por_coverage_ratio_bps = 16400;
        report
    }

    #[test]
    fn test_tolerance_boundary() {
        assert!(within_tolerance(dec!(1000.0005), dec!(1000.0000), dec!(0.001)));
        assert!(!within_tolerance(dec!(1000.01), dec!(1000.00), dec!(0.001)));
        // Strict comparison
        assert!(!within_tolerance(dec!(1000.001), dec!(1000), dec!(0.001)));
    }

    #[test]
    fn test_all_invariants_hold() {
        let mut report = balanced();
        report.evaluate(10_000);
        assert!(report.is_success());
        assert!(report.invariants.failed().is_empty());
    }

    #[test]
    fn test_one_failure_fails_report() {
        let mut report = balanced();
        report.por_coverage_ratio_bps = 9_999;
        report.evaluate(10_000);
        assert_eq!(report.status, ReportStatus::Failure);
        assert_eq!(report.invariants.failed(), vec!["porCoverageAboveThreshold"]);
        assert!(report.details.contains("porCoverageAboveThreshold"));
    }

    #[test]
    fn test_sub_cent_supply_matches_attested_cents() {
        let mut report = balanced();
        report.on_chain_usdf_supply = dec!(0.333);
        report.db_usdf_supply = dec!(0.333);
        report.por_liabilities_usdf = dec!(0.33);
        report.evaluate(10_000);
        assert!(report.is_success(), "{}", report.details);
        assert_eq!(report.on_chain_usdf_supply, dec!(0.333));

        assert_eq!(to_cents(dec!(0.335)), dec!(0.34));
        assert_eq!(to_cents(dec!(1000.004999)), dec!(1000.00));
    }

    #[test]
    fn test_attested_cents_still_catch_drift() {
        let mut report = balanced();
        report.on_chain_fthusd_supply = dec!(1000.02);
        report.db_fthusd_supply = dec!(1000.02);
        report.evaluate(10_000);
        assert_eq!(
            report.invariants.failed(),
            vec!["onChainFTHUSDMatchesPoRLiabilities"]
        );
    }

    #[test]
    fn test_coverage_beyond_u32() {
        let mut report = balanced();
        report.por_coverage_ratio_bps = 50_000_000_000;
        report.evaluate(10_000);
        assert!(report.is_success());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""porCoverageRatioBps":50000000000"#));
    }

    #[test]
    fn test_serialized_field_names() {
        let mut report = balanced();
        report.evaluate(10_000);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["onChainFTHUSDSupply"], "1000");
        assert_eq!(json["invariants"]["onChainFTHUSDMatchesDB"], true);
    }
}

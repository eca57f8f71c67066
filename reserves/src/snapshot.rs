//! SnapshotBuilder: treasury aggregation

use crate::{
    cents::Cents,
    sources::{LiabilitySource, ReserveSource},
    Error, Result,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Asset and liability aggregate at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInput {
    /// Snapshot instant
    pub as_of: DateTime<Utc>,
    /// Bank custody cash
    pub bank_usd_cents: Cents,
    /// Physical gold value
    pub gold_usd_cents: Cents,
    /// Other assets
    pub other_assets_usd_cents: Cents,
    /// Circulating FTHUSD
    pub fthusd_liabilities_cents: Cents,
    /// Circulating USDF (reported, not a liability)
    pub usdf_off_balance_cents: Cents,
    /// Detailed report URI
    pub uri: String,
}

impl SnapshotInput {
    /// bank + gold + other
    pub fn total_assets(&self) -> Result<Cents> {
        self.bank_usd_cents
            .checked_add(self.gold_usd_cents)
            .and_then(|sum| sum.checked_add(self.other_assets_usd_cents))
            .ok_or(Error::Overflow("total assets"))
    }

    /// Circulating FTHUSD
    pub fn total_liabilities(&self) -> Cents {
        self.fthusd_liabilities_cents
    }
}

/// Builds [`SnapshotInput`]s from reserve and liability sources
///
/// Read-only: never validates coverage and never writes anywhere.
pub struct SnapshotBuilder {
    reserves: Arc<dyn ReserveSource>,
    liabilities: Arc<dyn LiabilitySource>,
    report_base_uri: String,
}

impl fmt::Debug for SnapshotBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotBuilder")
            .field("report_base_uri", &self.report_base_uri)
            .finish()
    }
}

impl SnapshotBuilder {
    /// Create a builder
    pub fn new(
        reserves: Arc<dyn ReserveSource>,
        liabilities: Arc<dyn LiabilitySource>,
        report_base_uri: impl Into<String>,
    ) -> Self {
        Self {
            reserves,
            liabilities,
            report_base_uri: report_base_uri.into(),
        }
    }

    /// Report URI for the day of `as_of`
    pub fn report_uri(&self, as_of: DateTime<Utc>) -> String {
        format!(
            "{}/snapshot-{}.json",
            self.report_base_uri.trim_end_matches('/'),
            as_of.format("%Y-%m-%d")
        )
    }

    /// Aggregate every source as of `as_of`
    pub async fn build(&self, as_of: DateTime<Utc>) -> Result<SnapshotInput> {
        let input = SnapshotInput {
            as_of,
            bank_usd_cents: self.reserves.bank_cash_cents().await?,
            gold_usd_cents: self.reserves.gold_value_cents().await?,
            other_assets_usd_cents: self.reserves.other_assets_cents().await?,
            fthusd_liabilities_cents: self.liabilities.fthusd_circulating_cents().await?,
            usdf_off_balance_cents: self.liabilities.usdf_circulating_cents().await?,
            uri: self.report_uri(as_of),
        };
        debug!(
            as_of = %input.as_of,
            bank = %input.bank_usd_cents,
            gold = %input.gold_usd_cents,
            other = %input.other_assets_usd_cents,
            fthusd = %input.fthusd_liabilities_cents,
            "Snapshot input built"
        );
        Ok(input)
    }
}

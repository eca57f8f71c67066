//! Canonical PoR payload and hash
//!
//! The payload is compact JSON with a fixed key order:
//!
//! ```text
//! {"asOf":…,"bankUsdCents":…,"goldUsdCents":…,"otherAssetsUsdCents":…,
//!  "totalAssets":…,"totalLiabilities":…,"coverageRatioBps":…,"uri":…}
//! ```
//!
//! `asOf` is ISO-8601 UTC with millisecond precision, cent figures are decimal
//! strings and `coverageRatioBps` is a JSON integer. The hash is keccak256 over
//! the UTF-8 bytes, rendered `0x` + lowercase hex. Other systems verify
//! snapshots by recomputing this hash, so the byte layout must not change.

use crate::{cents::Cents, snapshot::SnapshotInput, Error, Result};
use chrono::SecondsFormat;
use serde::Serialize;
use sha3::{Digest, Keccak256};

/// Canonical hash input, fields in hashing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPayload {
    /// Snapshot instant
    pub as_of: String,
    /// Bank cash
    pub bank_usd_cents: Cents,
    /// Gold value
    pub gold_usd_cents: Cents,
    /// Other assets
    pub other_assets_usd_cents: Cents,
    /// Sum of the three asset figures
    pub total_assets: Cents,
    /// Circulating FTHUSD
    pub total_liabilities: Cents,
    /// Coverage in basis points; a JSON integer of any width
    pub coverage_ratio_bps: u128,
    /// Report URI
    pub uri: String,
}

impl CanonicalPayload {
    /// Derive the payload from a snapshot input
    ///
    /// Does not enforce coverage; see [`crate::PoRComposer`].
    pub fn from_input(input: &SnapshotInput) -> Result<Self> {
        let total_assets = input.total_assets()?;
        let total_liabilities = input.total_liabilities();
        Ok(Self {
            as_of: input.as_of.to_rfc3339_opts(SecondsFormat::Millis, true),
            bank_usd_cents: input.bank_usd_cents,
            gold_usd_cents: input.gold_usd_cents,
            other_assets_usd_cents: input.other_assets_usd_cents,
            total_assets,
            total_liabilities,
            coverage_ratio_bps: coverage_ratio_bps(total_assets, total_liabilities)?,
            uri: input.uri.clone(),
        })
    }

    /// Compact JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// keccak256 of the compact JSON
    pub fn hash(&self) -> Result<String> {
        let digest = Keccak256::digest(self.to_json()?.as_bytes());
        Ok(format!("0x{}", hex::encode(digest)))
    }
}

/// `floor(assets * 10000 / liabilities)`; zero when there are no liabilities
pub fn coverage_ratio_bps(total_assets: Cents, total_liabilities: Cents) -> Result<u128> {
    if total_liabilities.value() == 0 {
        return Ok(0);
    }
    let scaled = total_assets
        .value()
        .checked_mul(10_000)
        .ok_or(Error::Overflow("coverage ratio"))?;
    Ok(scaled / total_liabilities.value())
}

/// Canonical JSON of a snapshot input
pub fn canonical_json(input: &SnapshotInput) -> Result<String> {
    CanonicalPayload::from_input(input)?.to_json()
}

/// Canonical hash of a snapshot input
pub fn canonical_hash(input: &SnapshotInput) -> Result<String> {
    CanonicalPayload::from_input(input)?.hash()
}

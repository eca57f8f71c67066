//! PoRComposer: publish a snapshot to both ledgers
//!
//! Order of effects:
//!
//! 1. Coverage guard (nothing written on failure)
//! 2. Registry write, awaited to a mined receipt
//! 3. XRPL anchor of the same hash and timestamp
//!
//! A registry failure stops before anchoring. An anchor failure leaves the
//! registry write in place and is reported as [`Error::Anchor`] carrying the
//! registry transaction, so anchoring can be retried on its own.

use crate::{
    canonical::CanonicalPayload, cents::Cents, snapshot::SnapshotInput, Error, Result,
};
use chrono::SecondsFormat;
use evm_registry::{PorSnapshot, RegistryClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use xrpl_client::LedgerClient;

/// Outcome of a publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PorSnapshotResult {
    /// Canonical hash
    pub canonical_hash: String,
    /// Coverage in basis points
    pub coverage_ratio_bps: u128,
    /// Registry transaction
    pub evm_tx_hash: String,
    /// Anchor transaction
    pub xrpl_tx_hash: String,
}

/// PoR orchestrator
#[derive(Debug, Clone)]
pub struct PoRComposer {
    registry: Arc<RegistryClient>,
    ledger: Arc<LedgerClient>,
}

impl PoRComposer {
    /// Create a composer
    pub fn new(registry: Arc<RegistryClient>, ledger: Arc<LedgerClient>) -> Self {
        Self { registry, ledger }
    }

    /// Check coverage and derive the canonical payload without publishing
    pub fn compose(input: &SnapshotInput) -> Result<CanonicalPayload> {
        let total_assets = input.total_assets()?;
        let total_liabilities = input.total_liabilities();
        if total_assets < total_liabilities {
            return Err(Error::Undercollateralized {
                total_assets,
                total_liabilities,
            });
        }
        CanonicalPayload::from_input(input)
    }

    /// Publish a snapshot: registry write, then XRPL anchor
    pub async fn publish(&self, input: &SnapshotInput) -> Result<PorSnapshotResult> {
        let payload = match Self::compose(input) {
            Ok(payload) => payload,
            Err(e) => {
                error!(as_of = %input.as_of, error = %e, "PoR snapshot rejected");
                return Err(e);
            }
        };
        let hash = payload.hash()?;

        let snapshot = PorSnapshot {
            hash: hash.clone(),
            timestamp: u64::try_from(input.as_of.timestamp())
                .map_err(|_| Error::Overflow("timestamp"))?,
            coverage_ratio_bps: payload.coverage_ratio_bps,
            total_assets: payload.total_assets.value(),
            total_liabilities: payload.total_liabilities.value(),
            usdf_circulating: input.usdf_off_balance_cents.value(),
            uri: payload.uri.clone(),
        };
        let receipt = self.registry.record_por_snapshot(&snapshot).await?;

        let anchor = self
            .ledger
            .anchor_por(&hash, &payload.as_of)
            .await
            .map_err(|source| Error::Anchor {
                evm_tx_hash: receipt.tx_hash.clone(),
                source,
            })?;

        info!(
            por_hash = %hash,
            coverage_bps = payload.coverage_ratio_bps,
            evm_tx_hash = %receipt.tx_hash,
            xrpl_tx_hash = %anchor.tx_hash,
            "PoR snapshot published"
        );

        Ok(PorSnapshotResult {
            canonical_hash: hash,
            coverage_ratio_bps: payload.coverage_ratio_bps,
            evm_tx_hash: receipt.tx_hash,
            xrpl_tx_hash: anchor.tx_hash,
        })
    }

    /// Anchor an already registered hash again
    pub async fn retry_anchor(&self, hash: &str, as_of: chrono::DateTime<chrono::Utc>) -> Result<String> {
        let as_of = as_of.to_rfc3339_opts(SecondsFormat::Millis, true);
        let anchor = self
            .ledger
            .anchor_por(hash, &as_of)
            .await
            .map_err(|source| Error::Anchor {
                evm_tx_hash: String::new(),
                source,
            })?;
        info!(por_hash = %hash, xrpl_tx_hash = %anchor.tx_hash, "PoR anchor retried");
        Ok(anchor.tx_hash)
    }

    /// Covered liabilities ratio as a percentage string, for reports
    pub fn coverage_percent(coverage_ratio_bps: u128) -> String {
        format!("{}.{:02}%", coverage_ratio_bps / 100, coverage_ratio_bps % 100)
    }

    /// Total liabilities of the latest registered snapshot
    pub async fn latest_liabilities(&self) -> Result<Cents> {
        let latest = self.registry.get_latest_por().await?;
        Ok(Cents(latest.total_liabilities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_ledger::{AuditStore, Flow, MemoryAuditStore, RecordFilter, TxStatus};
    use chrono::{TimeZone, Utc};
    use evm_registry::SimulatedRegistry;
    use xrpl_client::{LocalSigner, OpsSigners, Signer, SimulatedLedger, XrplConfig};

    struct Harness {
        registry: Arc<SimulatedRegistry>,
        ledger: Arc<SimulatedLedger>,
        store: Arc<MemoryAuditStore>,
        composer: PoRComposer,
    }

    fn harness() -> Harness {
        let registry = Arc::new(SimulatedRegistry::new());
        let ledger = Arc::new(SimulatedLedger::new());
        let store = Arc::new(MemoryAuditStore::new());
        let address = || LocalSigner::generate().address().to_string();
        let config = XrplConfig {
            fthusd_issuer: address(),
            usdf_issuer: address(),
            gold_vault: address(),
            oracle_account: address(),
            ..Default::default()
        };
        let signers = OpsSigners {
            oracle: Some(Arc::new(LocalSigner::generate())),
            ..Default::default()
        };
        let composer = PoRComposer::new(
            Arc::new(RegistryClient::new(registry.clone(), store.clone())),
            Arc::new(LedgerClient::new(config, ledger.clone(), store.clone(), signers)),
        );
        Harness {
            registry,
            ledger,
            store,
            composer,
        }
    }

    fn input(bank: u128, liabilities: u128) -> SnapshotInput {
        SnapshotInput {
            as_of: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            bank_usd_cents: Cents(bank),
            gold_usd_cents: Cents(0),
            other_assets_usd_cents: Cents(0),
            fthusd_liabilities_cents: Cents(liabilities),
            usdf_off_balance_cents: Cents(2_500),
            uri: "https://example.com/por/snapshot-2026-01-01.json".into(),
        }
    }

    #[tokio::test]
    async fn test_guard_rejects_without_writes() {
        let h = harness();
        let err = h.composer.publish(&input(500_000, 600_000)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Undercollateralized {
                total_assets: Cents(500_000),
                total_liabilities: Cents(600_000)
            }
        ));
        assert_eq!(h.registry.write_count(), 0);
        assert!(h.ledger.submitted().is_empty());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_publish_writes_registry_then_anchor() {
        let h = harness();
        let result = h.composer.publish(&input(820_000, 500_000)).await.unwrap();
        assert_eq!(result.coverage_ratio_bps, 16400);

        let registered = h.registry.snapshots();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].hash, result.canonical_hash);
        assert_eq!(registered[0].timestamp, 1_767_225_600);
        assert_eq!(registered[0].usdf_circulating, 2_500);

        let anchors = h
            .store
            .list(&RecordFilter::all().flow(Flow::PorAnchoring))
            .await
            .unwrap();
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].status, TxStatus::Confirmed);
        let memos = &anchors[0].payload().unwrap()["memos"];
        assert_eq!(memos[0]["data"], result.canonical_hash.as_str());
        assert_eq!(memos[1]["data"], "2026-01-01T00:00:00.000Z");

        let snapshots = h
            .store
            .list(&RecordFilter::all().flow(Flow::PorSnapshot))
            .await
            .unwrap();
        assert_eq!(snapshots[0].tx_hash.as_deref(), Some(result.evm_tx_hash.as_str()));
        assert!(snapshots[0].created_at <= anchors[0].created_at);
    }

    #[tokio::test]
    async fn test_registry_failure_skips_anchor() {
        let h = harness();
        h.registry.revert_next("paused");
        let err = h.composer.publish(&input(820_000, 500_000)).await.unwrap_err();
        assert!(matches!(err, Error::Registry(_)));
        assert!(h.ledger.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_anchor_failure_keeps_registry_write() {
        let h = harness();
        h.ledger.set_offline(true);
        let err = h.composer.publish(&input(820_000, 500_000)).await.unwrap_err();
        let evm_tx_hash = match err {
            Error::Anchor { evm_tx_hash, .. } => evm_tx_hash,
            other => panic!("unexpected error: {other}"),
        };
        assert_eq!(h.registry.snapshots().len(), 1);
        assert!(!evm_tx_hash.is_empty());

        h.ledger.set_offline(false);
        let hash = &h.registry.snapshots()[0].hash;
        let as_of = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(h.composer.retry_anchor(hash, as_of).await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_liabilities_publishes_zero_coverage() {
        let h = harness();
        let result = h.composer.publish(&input(1_000, 0)).await.unwrap();
        assert_eq!(result.coverage_ratio_bps, 0);
        assert_eq!(h.composer.latest_liabilities().await.unwrap(), Cents(0));
    }

    #[tokio::test]
    async fn test_publish_coverage_beyond_u32() {
        let h = harness();
        let result = h.composer.publish(&input(500_000_000, 100)).await.unwrap();
        assert_eq!(result.coverage_ratio_bps, 50_000_000_000);
        assert_eq!(h.registry.snapshots()[0].coverage_ratio_bps, 50_000_000_000);
    }

    #[test]
    fn test_coverage_percent() {
        assert_eq!(PoRComposer::coverage_percent(16400), "164.00%");
        assert_eq!(PoRComposer::coverage_percent(10005), "100.05%");
        assert_eq!(PoRComposer::coverage_percent(50_000_000_000), "500000000.00%");
    }
}

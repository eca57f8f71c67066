//! RegistryClient: PoR and compliance writes with audit records
//!
//! Writes are awaited to a mined receipt. The outcome is then recorded:
//! `confirmed` for a mined write, `failed` for a revert. Connection errors and
//! receipt timeouts leave no record because the outcome is unknown.

use crate::{
    transport::RegistryTransport,
    types::{validate_hash, ComplianceStatus, PorSnapshot, RegistryCall, TxReceipt},
    Error, Result,
};
use audit_ledger::{
    log_ledger_event, AuditStore, Direction, LedgerEvent, LedgerKind, LedgerTransactionRecord,
};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Error code recorded for reverted registry writes
pub const REVERTED_CODE: &str = "EXECUTION_REVERTED";

/// EVM registry client
pub struct RegistryClient {
    transport: Arc<dyn RegistryTransport>,
    store: Arc<dyn AuditStore>,
    correlation_id: Option<String>,
}

impl fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryClient")
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

impl RegistryClient {
    /// Create a client
    pub fn new(transport: Arc<dyn RegistryTransport>, store: Arc<dyn AuditStore>) -> Self {
        Self {
            transport,
            store,
            correlation_id: None,
        }
    }

    /// Tag every record written by this client with `correlation_id`
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Write a PoR snapshot
    pub async fn record_por_snapshot(&self, snapshot: &PorSnapshot) -> Result<TxReceipt> {
        validate_hash(&snapshot.hash)?;
        self.write(RegistryCall::RecordSnapshot(snapshot.clone()), None)
            .await
    }

    /// Latest PoR snapshot
    pub async fn get_latest_por(&self) -> Result<PorSnapshot> {
        self.transport
            .latest_snapshot()
            .await?
            .ok_or_else(|| Error::NotFound("no PoR snapshot recorded".to_string()))
    }

    /// Write a wallet's KYC state
    pub async fn set_kyc_status(
        &self,
        wallet: &str,
        approved: bool,
        jurisdiction_code: u16,
        flags: u128,
        member: Option<&str>,
    ) -> Result<TxReceipt> {
        let call = RegistryCall::SetKycStatus {
            wallet: wallet.to_string(),
            approved,
            jurisdiction_code,
            flags,
        };
        self.write(call, member).await
    }

    /// Write a wallet's sanction flag
    pub async fn set_sanctioned(
        &self,
        wallet: &str,
        sanctioned: bool,
        member: Option<&str>,
    ) -> Result<TxReceipt> {
        let call = RegistryCall::SetSanctioned {
            wallet: wallet.to_string(),
            sanctioned,
        };
        self.write(call, member).await
    }

    /// Current compliance state of `wallet`
    pub async fn get_compliance_status(&self, wallet: &str) -> Result<ComplianceStatus> {
        self.transport.compliance_status(wallet).await
    }

    async fn write(&self, call: RegistryCall, member: Option<&str>) -> Result<TxReceipt> {
        let flow = call.flow();
        let result = self.transport.send(&call).await;

        let mut record = LedgerTransactionRecord::pending(LedgerKind::Evm, flow, Direction::Outbound)
            .with_member(member.map(str::to_string))
            .with_payload(&call.summary());
        if let Some(wallet) = call.wallet() {
            record = record.with_wallet(wallet);
        }
        if let Some(correlation_id) = &self.correlation_id {
            record = record.with_correlation_id(correlation_id.clone());
        }

        match result {
            Ok(receipt) => {
                record.confirm(Some(receipt.tx_hash.clone()))?;
                self.store.create(&record).await?;
                log_ledger_event(&LedgerEvent::from(&record));
                info!(
                    flow = %flow,
                    tx_hash = %receipt.tx_hash,
                    block = receipt.block_number,
                    "Registry write mined"
                );
                Ok(receipt)
            }
            Err(Error::Reverted { tx_hash, reason }) => {
                if !tx_hash.is_empty() {
                    record = record.with_tx_hash(tx_hash.clone());
                }
                record.fail(Some(REVERTED_CODE.to_string()), reason.clone())?;
                self.store.create(&record).await?;
                log_ledger_event(&LedgerEvent::from(&record));
                Err(Error::Reverted { tx_hash, reason })
            }
            Err(e) => {
                warn!(flow = %flow, error = %e, "Registry write outcome unknown; nothing recorded");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedRegistry;
    use audit_ledger::{Flow, MemoryAuditStore, RecordFilter, TxStatus};

    const WALLET: &str = "0x00000000000000000000000000000000000000aa";

    fn setup() -> (Arc<SimulatedRegistry>, Arc<MemoryAuditStore>, RegistryClient) {
        let registry = Arc::new(SimulatedRegistry::new());
        let store = Arc::new(MemoryAuditStore::new());
        let client = RegistryClient::new(registry.clone(), store.clone());
        (registry, store, client)
    }

    fn snapshot() -> PorSnapshot {
        PorSnapshot {
            hash: format!("0x{}", "ab".repeat(32)),
            timestamp: 1_767_225_600,
            coverage_ratio_bps: 16400,
            total_assets: 820_000,
            total_liabilities: 500_000,
            usdf_circulating: 0,
            uri: "https://reports.example/snapshot-2026-01-01.json".into(),
        }
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_and_record() {
        let (_, store, client) = setup();
        assert!(matches!(client.get_latest_por().await, Err(Error::NotFound(_))));

        let receipt = client.record_por_snapshot(&snapshot()).await.unwrap();
        assert_eq!(client.get_latest_por().await.unwrap(), snapshot());

        let records = store
            .list(&RecordFilter::all().flow(Flow::PorSnapshot))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ledger, LedgerKind::Evm);
        assert_eq!(records[0].status, TxStatus::Confirmed);
        assert_eq!(records[0].tx_hash.as_deref(), Some(receipt.tx_hash.as_str()));
        assert_eq!(records[0].payload().unwrap()["totalLiabilities"], "500000");
    }

    #[tokio::test]
    async fn test_revert_recorded_as_failed() {
        let (registry, store, client) = setup();
        registry.revert_next("Ownable: caller is not the owner");

        let err = client.set_sanctioned(WALLET, true, Some("member-1")).await.unwrap_err();
        assert!(matches!(err, Error::Reverted { .. }));

        let records = store.list(&RecordFilter::all()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].flow, Flow::SanctionUpdate);
        assert_eq!(records[0].status, TxStatus::Failed);
        assert_eq!(records[0].error_code.as_deref(), Some(REVERTED_CODE));
        assert_eq!(records[0].member_ref.as_deref(), Some("member-1"));
        assert!(!client.get_compliance_status(WALLET).await.unwrap().sanctioned);
    }

    #[tokio::test]
    async fn test_connection_error_leaves_no_record() {
        let (registry, store, client) = setup();
        registry.set_offline(true);
        let err = client.set_kyc_status(WALLET, true, 840, 0, None).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_kyc_then_sanction() {
        let (_, store, client) = setup();
        client.set_kyc_status(WALLET, true, 840, 0b10, None).await.unwrap();
        client.set_sanctioned(WALLET, true, None).await.unwrap();

        let status = client.get_compliance_status(WALLET).await.unwrap();
        assert!(status.kyc_approved);
        assert!(status.sanctioned);
        assert_eq!(status.jurisdiction_code, 840);
        assert_eq!(status.flags, 0b10);
        assert!(!status.is_cleared());

        let kyc = store
            .list(&RecordFilter::all().flow(Flow::KycUpdate))
            .await
            .unwrap();
        assert_eq!(kyc[0].wallet_address.as_deref(), Some(WALLET));
    }

    #[tokio::test]
    async fn test_malformed_hash_rejected_before_send() {
        let (registry, _, client) = setup();
        let mut bad = snapshot();
        bad.hash = "abc".into();
        assert!(matches!(
            client.record_por_snapshot(&bad).await,
            Err(Error::Validation(_))
        ));
        assert_eq!(registry.write_count(), 0);
    }
}

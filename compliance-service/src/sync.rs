//! ComplianceSync: registry first, mirror second, event last

use crate::directory::MemberDirectory;
use crate::error::{Error, Result};
use crate::types::{ComplianceEvent, KycRecord, KycStatus, Member};
use chrono::Utc;
use evm_registry::{ComplianceStatus, RegistryClient};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

const EVENT_CAPACITY: usize = 256;

/// Compliance state propagation
pub struct ComplianceSync {
    registry: Arc<RegistryClient>,
    directory: Arc<dyn MemberDirectory>,
    events: broadcast::Sender<ComplianceEvent>,
}

impl fmt::Debug for ComplianceSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplianceSync")
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

impl ComplianceSync {
    /// Create a sync service
    pub fn new(registry: Arc<RegistryClient>, directory: Arc<dyn MemberDirectory>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            registry,
            directory,
            events,
        }
    }

    /// Receive every [`ComplianceEvent`] from now on (e.g. the XRPL hook sync worker)
    pub fn subscribe(&self) -> broadcast::Receiver<ComplianceEvent> {
        self.events.subscribe()
    }

    /// Approve KYC: registry `setKYCStatus(wallet, true, jurisdiction, flags)`
    pub async fn approve_member(&self, record: &KycRecord) -> Result<ComplianceEvent> {
        self.require_member(&record.member_id).await?;
        let receipt = self
            .registry
            .set_kyc_status(
                &record.wallet_address,
                true,
                record.jurisdiction_code,
                record.flags,
                Some(&record.member_id),
            )
            .await?;
        self.mirror(
            record,
            KycStatus::Approved,
            Some(record.jurisdiction_code),
            Some(record.flags),
            receipt.tx_hash,
        )
        .await
    }

    /// Block: registry `setSanctioned(wallet, true)`
    pub async fn block_member(&self, record: &KycRecord) -> Result<ComplianceEvent> {
        self.require_member(&record.member_id).await?;
        let receipt = self
            .registry
            .set_sanctioned(&record.wallet_address, true, Some(&record.member_id))
            .await?;
        self.mirror(record, KycStatus::Blocked, None, None, receipt.tx_hash)
            .await
    }

    /// Unblock: registry `setSanctioned(wallet, false)`; the member returns to approved
    pub async fn unblock_member(&self, record: &KycRecord) -> Result<ComplianceEvent> {
        self.require_member(&record.member_id).await?;
        let receipt = self
            .registry
            .set_sanctioned(&record.wallet_address, false, Some(&record.member_id))
            .await?;
        self.mirror(record, KycStatus::Approved, None, None, receipt.tx_hash)
            .await
    }

    /// Mirrored state of a member
    pub async fn member_status(&self, member_id: &str) -> Result<Option<KycRecord>> {
        Ok(self
            .directory
            .get(member_id)
            .await?
            .map(|member| member.kyc_record()))
    }

    /// Authoritative state of a wallet
    pub async fn registry_status(&self, wallet: &str) -> Result<ComplianceStatus> {
        Ok(self.registry.get_compliance_status(wallet).await?)
    }

    async fn require_member(&self, member_id: &str) -> Result<Member> {
        self.directory
            .get(member_id)
            .await?
            .ok_or_else(|| Error::MemberNotFound(member_id.to_string()))
    }

    async fn mirror(
        &self,
        record: &KycRecord,
        status: KycStatus,
        jurisdiction: Option<u16>,
        flags: Option<u128>,
        tx_hash: String,
    ) -> Result<ComplianceEvent> {
        if let Err(e) = self
            .directory
            .set_kyc_status(&record.member_id, status, jurisdiction, flags)
            .await
        {
            error!(
                member_id = %record.member_id,
                wallet = %record.wallet_address,
                tx_hash = %tx_hash,
                error = %e,
                "Registry updated but member mirror failed"
            );
            return Err(e);
        }

        let event = ComplianceEvent {
            member_id: record.member_id.clone(),
            wallet: record.wallet_address.clone(),
            status,
            tx_hash,
            at: Utc::now(),
        };
        info!(
            target: "compliance_event",
            member_id = %event.member_id,
            wallet = %event.wallet,
            status = %event.status,
            tx_hash = %event.tx_hash,
            "Compliance status changed"
        );
        // No subscribers is fine
        let _ = self.events.send(event.clone());
        Ok(event)
    }
}

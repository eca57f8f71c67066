use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// KYC state of a member
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    /// Application open
    Pending,
    /// Cleared to hold and move program currencies
    Approved,
    /// Sanctioned or otherwise frozen
    Blocked,
    /// Vendor asked for new documents
    ResubmitRequired,
}

impl KycStatus {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "PENDING",
            KycStatus::Approved => "APPROVED",
            KycStatus::Blocked => "BLOCKED",
            KycStatus::ResubmitRequired => "RESUBMIT_REQUIRED",
        }
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compliance change request for one member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KycRecord {
    /// Internal member id
    pub member_id: String,
    /// Wallet the registry tracks (EVM address)
    pub wallet_address: String,
    /// Target status
    pub status: KycStatus,
    /// ISO-3166 numeric jurisdiction
    pub jurisdiction_code: u16,
    /// Product flags mirrored to the registry
    pub flags: u128,
}

/// Member as held in the local directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Internal member id
    pub member_id: String,
    /// Primary XRPL wallet
    pub primary_wallet: String,
    /// EVM wallet, if the member has one
    pub evm_wallet: Option<String>,
    /// Mirrored KYC status
    pub kyc_status: KycStatus,
    /// ISO-3166 numeric jurisdiction
    pub jurisdiction: u16,
    /// Product flags
    pub flags: u128,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// New pending member
    pub fn new(member_id: impl Into<String>, primary_wallet: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            primary_wallet: primary_wallet.into(),
            evm_wallet: None,
            kyc_status: KycStatus::Pending,
            jurisdiction: 0,
            flags: 0,
            updated_at: Utc::now(),
        }
    }

    /// Set the EVM wallet
    pub fn with_evm_wallet(mut self, wallet: impl Into<String>) -> Self {
        self.evm_wallet = Some(wallet.into());
        self
    }

    /// Wallet the registry tracks: EVM wallet, else the primary wallet
    pub fn registry_wallet(&self) -> &str {
        self.evm_wallet.as_deref().unwrap_or(&self.primary_wallet)
    }

    /// Current state as a [`KycRecord`]
    pub fn kyc_record(&self) -> KycRecord {
        KycRecord {
            member_id: self.member_id.clone(),
            wallet_address: self.registry_wallet().to_string(),
            status: self.kyc_status,
            jurisdiction_code: self.jurisdiction,
            flags: self.flags,
        }
    }
}

/// Announced after the registry and the mirror agree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceEvent {
    /// Member
    pub member_id: String,
    /// Wallet
    pub wallet: String,
    /// New status
    pub status: KycStatus,
    /// Registry transaction
    pub tx_hash: String,
    /// When the change was mirrored
    pub at: DateTime<Utc>,
}

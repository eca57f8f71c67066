//! Core types for the audit ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode on disk, JSON in logs)
//! - One-way status transitions (pending -> terminal)

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Ledger a record pertains to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    /// XRPL issued-currency ledger
    Xrpl,
    /// EVM compliance / PoR registry
    Evm,
    /// Internal bookkeeping (reconciliation runs)
    Internal,
}

impl LedgerKind {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Xrpl => "xrpl",
            LedgerKind::Evm => "evm",
            LedgerKind::Internal => "internal",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business flow a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flow {
    /// PoR snapshot written to the EVM registry
    #[serde(rename = "por_snapshot")]
    PorSnapshot,
    /// PoR hash anchored on XRPL
    #[serde(rename = "por_anchoring")]
    PorAnchoring,
    /// USDF rewards issuance
    #[serde(rename = "bonus_issue")]
    BonusIssue,
    /// FTHUSD credited against a bank deposit
    #[serde(rename = "fthusd_deposit")]
    FthusdDeposit,
    /// FTHUSD returned to the issuer
    #[serde(rename = "fthusd_redemption")]
    FthusdRedemption,
    /// USDF spent on a gold order
    #[serde(rename = "gold_order_create")]
    GoldOrderCreate,
    /// Gold order NFT minted
    #[serde(rename = "gold_order_nft_mint")]
    GoldOrderNftMint,
    /// Gold order bought back (NFT burn + USDF refund)
    #[serde(rename = "gold_order_buyback")]
    GoldOrderBuyback,
    /// Membership NFT minted
    #[serde(rename = "membership_nft_mint")]
    MembershipNftMint,
    /// Issuer authorization of a member FTHUSD trustline
    #[serde(rename = "member_onboarding_fthusd_auth")]
    MemberOnboardingFthusdAuth,
    /// Issuer authorization of a member USDF trustline
    #[serde(rename = "member_onboarding_usdf_auth")]
    MemberOnboardingUsdfAuth,
    /// Member trustline creation
    #[serde(rename = "member_trustline")]
    MemberTrustline,
    /// KYC status written to the compliance registry
    #[serde(rename = "kyc_update")]
    KycUpdate,
    /// Sanction flag written to the compliance registry
    #[serde(rename = "sanction_update")]
    SanctionUpdate,
    /// Unauthorized DEX offer detected
    #[serde(rename = "DEX_SCAN_ALERT")]
    DexScanAlert,
    /// Supply and reserves reconciliation run
    #[serde(rename = "SUPPLY_RECONCILIATION")]
    SupplyReconciliation,
    /// Anything else
    #[serde(rename = "other")]
    Other,
}

impl Flow {
    /// Wire name (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::PorSnapshot => "por_snapshot",
            Flow::PorAnchoring => "por_anchoring",
            Flow::BonusIssue => "bonus_issue",
            Flow::FthusdDeposit => "fthusd_deposit",
            Flow::FthusdRedemption => "fthusd_redemption",
            Flow::GoldOrderCreate => "gold_order_create",
            Flow::GoldOrderNftMint => "gold_order_nft_mint",
            Flow::GoldOrderBuyback => "gold_order_buyback",
            Flow::MembershipNftMint => "membership_nft_mint",
            Flow::MemberOnboardingFthusdAuth => "member_onboarding_fthusd_auth",
            Flow::MemberOnboardingUsdfAuth => "member_onboarding_usdf_auth",
            Flow::MemberTrustline => "member_trustline",
            Flow::KycUpdate => "kyc_update",
            Flow::SanctionUpdate => "sanction_update",
            Flow::DexScanAlert => "DEX_SCAN_ALERT",
            Flow::SupplyReconciliation => "SUPPLY_RECONCILIATION",
            Flow::Other => "other",
        }
    }

    /// All known flows
    pub const ALL: [Flow; 17] = [
        Flow::PorSnapshot,
        Flow::PorAnchoring,
        Flow::BonusIssue,
        Flow::FthusdDeposit,
        Flow::FthusdRedemption,
        Flow::GoldOrderCreate,
        Flow::GoldOrderNftMint,
        Flow::GoldOrderBuyback,
        Flow::MembershipNftMint,
        Flow::MemberOnboardingFthusdAuth,
        Flow::MemberOnboardingUsdfAuth,
        Flow::MemberTrustline,
        Flow::KycUpdate,
        Flow::SanctionUpdate,
        Flow::DexScanAlert,
        Flow::SupplyReconciliation,
        Flow::Other,
    ];
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Flow::ALL
            .iter()
            .find(|flow| flow.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::Config(format!("Unknown flow: {}", s)))
    }
}

/// Direction from the backend's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Value or state flowing into the program
    Inbound,
    /// Value or state flowing out of the program
    Outbound,
    /// Bookkeeping with no external counterparty
    Internal,
}

/// Record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Attempt started, outcome unknown
    Pending,
    /// Attempt succeeded (terminal)
    Confirmed,
    /// Attempt failed (terminal)
    Failed,
    /// Monitoring alert (terminal)
    Detected,
}

impl TxStatus {
    /// Check if status is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Confirmed => "confirmed",
            TxStatus::Failed => "failed",
            TxStatus::Detected => "detected",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(TxStatus::Pending),
            "confirmed" => Ok(TxStatus::Confirmed),
            "failed" => Ok(TxStatus::Failed),
            "detected" => Ok(TxStatus::Detected),
            other => Err(Error::Config(format!("Unknown status: {}", other))),
        }
    }
}

/// Audit record of one interaction with an external ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransactionRecord {
    /// Unique record ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Ledger the interaction targeted
    pub ledger: LedgerKind,

    /// Business flow
    pub flow: Flow,

    /// Direction from the backend's perspective
    pub direction: Direction,

    /// Correlation ID of the higher-level request or run
    pub correlation_id: Option<String>,

    /// Internal member reference
    pub member_ref: Option<String>,

    /// Wallet address involved (signer for submissions)
    pub wallet_address: Option<String>,

    /// On-chain transaction hash
    pub tx_hash: Option<String>,

    /// Current status
    pub status: TxStatus,

    /// Ledger error code (engine result, revert reason, ...)
    pub error_code: Option<String>,

    /// Detailed error message
    pub error_message: Option<String>,

    /// Serialized JSON summary of the attempted operation
    pub payload_summary: String,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl LedgerTransactionRecord {
    /// New pending record
    pub fn pending(ledger: LedgerKind, flow: Flow, direction: Direction) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            ledger,
            flow,
            direction,
            correlation_id: None,
            member_ref: None,
            wallet_address: None,
            tx_hash: None,
            status: TxStatus::Pending,
            error_code: None,
            error_message: None,
            payload_summary: "{}".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the member reference
    pub fn with_member(mut self, member: Option<String>) -> Self {
        self.member_ref = member;
        self
    }

    /// Set the wallet address
    pub fn with_wallet(mut self, wallet: impl Into<String>) -> Self {
        self.wallet_address = Some(wallet.into());
        self
    }

    /// Set the on-chain transaction hash
    pub fn with_tx_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }

    /// Set the correlation ID
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Set the payload summary from any serializable value
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_summary =
            serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
        self
    }

    /// Parsed payload summary (`None` if it is not valid JSON)
    pub fn payload(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.payload_summary).ok()
    }

    /// Mark confirmed
    pub fn confirm(&mut self, tx_hash: Option<String>) -> Result<()> {
        self.transition(TxStatus::Confirmed)?;
        if tx_hash.is_some() {
            self.tx_hash = tx_hash;
        }
        Ok(())
    }

    /// Mark failed, keeping the error code and message
    pub fn fail(&mut self, error_code: Option<String>, error_message: impl Into<String>) -> Result<()> {
        self.transition(TxStatus::Failed)?;
        self.error_code = error_code;
        self.error_message = Some(error_message.into());
        Ok(())
    }

    /// Mark detected (monitoring alerts)
    pub fn detect(&mut self) -> Result<()> {
        self.transition(TxStatus::Detected)
    }

    /// Check if record is in terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, to: TxStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::InvalidTransition {
                id: self.id.to_string(),
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

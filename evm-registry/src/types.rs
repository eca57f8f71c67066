//! Registry data types

use audit_ledger::Flow;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// PoR snapshot as stored by the registry
///
/// Monetary figures are integer USD cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PorSnapshot {
    /// Canonical hash (`0x` + 64 hex)
    pub hash: String,
    /// Unix timestamp (seconds) of the snapshot instant
    pub timestamp: u64,
    /// Coverage ratio in basis points
    pub coverage_ratio_bps: u128,
    /// Total assets (cents)
    pub total_assets: u128,
    /// Total liabilities: circulating FTHUSD (cents)
    pub total_liabilities: u128,
    /// Circulating USDF (cents), reported alongside but not counted as a liability
    pub usdf_circulating: u128,
    /// Detailed report URI
    pub uri: String,
}

impl PorSnapshot {
    /// Circulating FTHUSD (cents); the snapshot's liability figure
    pub fn fthusd_circulating(&self) -> u128 {
        self.total_liabilities
    }
}

/// Compliance state of one wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceStatus {
    /// KYC approved
    pub kyc_approved: bool,
    /// Sanctioned
    pub sanctioned: bool,
    /// Jurisdiction code
    pub jurisdiction_code: u16,
    /// Flag bitset
    pub flags: u128,
}

impl ComplianceStatus {
    /// Whether the wallet may transact: approved and not sanctioned
    pub fn is_cleared(&self) -> bool {
        self.kyc_approved && !self.sanctioned
    }
}

/// Mined transaction receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: String,
    /// Block the transaction was mined in
    pub block_number: u64,
}

/// State-changing registry call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    /// `recordSnapshot`
    RecordSnapshot(PorSnapshot),
    /// `setKYCStatus`
    SetKycStatus {
        /// Wallet
        wallet: String,
        /// Approved
        approved: bool,
        /// Jurisdiction code
        jurisdiction_code: u16,
        /// Flag bitset
        flags: u128,
    },
    /// `setSanctioned`
    SetSanctioned {
        /// Wallet
        wallet: String,
        /// Sanctioned
        sanctioned: bool,
    },
}

impl RegistryCall {
    /// Audit flow of the call
    pub fn flow(&self) -> Flow {
        match self {
            RegistryCall::RecordSnapshot(_) => Flow::PorSnapshot,
            RegistryCall::SetKycStatus { .. } => Flow::KycUpdate,
            RegistryCall::SetSanctioned { .. } => Flow::SanctionUpdate,
        }
    }

    /// Wallet the call concerns, if any
    pub fn wallet(&self) -> Option<&str> {
        match self {
            RegistryCall::RecordSnapshot(_) => None,
            RegistryCall::SetKycStatus { wallet, .. } | RegistryCall::SetSanctioned { wallet, .. } => {
                Some(wallet.as_str())
            }
        }
    }

    /// Audit payload summary; cent figures as decimal strings
    pub fn summary(&self) -> Value {
        match self {
            RegistryCall::RecordSnapshot(s) => json!({
                "hash": s.hash,
                "timestamp": s.timestamp,
                "coverageRatioBps": wide_integer(s.coverage_ratio_bps),
                "totalAssets": s.total_assets.to_string(),
                "totalLiabilities": s.total_liabilities.to_string(),
                "usdfCirculating": s.usdf_circulating.to_string(),
                "uri": s.uri,
            }),
            RegistryCall::SetKycStatus {
                wallet,
                approved,
                jurisdiction_code,
                flags,
            } => json!({
                "wallet": wallet,
                "approved": approved,
                "jurisdictionCode": jurisdiction_code,
                "flags": flags.to_string(),
            }),
            RegistryCall::SetSanctioned { wallet, sanctioned } => json!({
                "wallet": wallet,
                "sanctioned": sanctioned,
            }),
        }
    }
}

/// Normalize an EVM address to lowercase `0x` + 40 hex
pub fn normalize_address(address: &str) -> crate::Result<String> {
    let body = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(crate::Error::Validation(format!("Invalid EVM address: {}", address)));
    }
    Ok(format!("0x{}", body.to_ascii_lowercase()))
}

/// Check a 32-byte hash in `0x` + 64 hex form
pub fn validate_hash(hash: &str) -> crate::Result<()> {
    let body = hash.strip_prefix("0x").unwrap_or("");
    if body.len() != 64 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(crate::Error::Validation(format!("Invalid 32-byte hash: {}", hash)));
    }
    Ok(())
}

/// JSON integer when the value fits `u64`, decimal string beyond
fn wide_integer(value: u128) -> Value {
    u64::try_from(value).map_or_else(|_| Value::String(value.to_string()), Value::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address("0xAbCdEf0123456789abcdef0123456789ABCDEF01").unwrap(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
        assert!(normalize_address("0x1234").is_err());
        assert!(normalize_address("rMemberXrplAddress").is_err());
    }

    #[test]
    fn test_validate_hash() {
        assert!(validate_hash(&format!("0x{}", "ab".repeat(32))).is_ok());
        assert!(validate_hash(&"ab".repeat(32)).is_err());
        assert!(validate_hash("0xzz").is_err());
    }

    #[test]
    fn test_summary_uses_string_cents() {
        let call = RegistryCall::RecordSnapshot(PorSnapshot {
            hash: format!("0x{}", "00".repeat(32)),
            timestamp: 1_700_000_000,
            coverage_ratio_bps: 16400,
            total_assets: 820_000,
            total_liabilities: 500_000,
            usdf_circulating: 0,
            uri: "https://reports/snapshot.json".into(),
        });
        let summary = call.summary();
        assert_eq!(summary["totalAssets"], "820000");
        assert_eq!(summary["coverageRatioBps"], 16400);
        assert_eq!(call.flow(), Flow::PorSnapshot);
        assert!(call.wallet().is_none());
    }

    #[test]
    fn test_summary_of_wide_coverage() {
        let snapshot = |coverage_ratio_bps| PorSnapshot {
            hash: format!("0x{}", "00".repeat(32)),
            timestamp: 1_700_000_000,
            coverage_ratio_bps,
            total_assets: 500_000_000,
            total_liabilities: 100,
            usdf_circulating: 0,
            uri: "https://reports/snapshot.json".into(),
        };
        let summary = RegistryCall::RecordSnapshot(snapshot(50_000_000_000)).summary();
        assert_eq!(summary["coverageRatioBps"], 50_000_000_000u64);

        let beyond = u128::from(u64::MAX) + 1;
        let summary = RegistryCall::RecordSnapshot(snapshot(beyond)).summary();
        assert_eq!(summary["coverageRatioBps"], beyond.to_string());
    }

    #[test]
    fn test_cleared() {
        let status = ComplianceStatus {
            kyc_approved: true,
            sanctioned: true,
            ..Default::default()
        };
        assert!(!status.is_cleared());
    }
}

//! Structured ledger-event logging
//!
//! Every ledger interaction emits one event with target `ledger_event`, so log
//! pipelines can route the audit stream separately from diagnostics.

use crate::types::{Flow, LedgerKind, LedgerTransactionRecord, TxStatus};
use serde::Serialize;

/// Log target for ledger events
pub const LEDGER_EVENT_TARGET: &str = "ledger_event";

/// Flattened view of a ledger interaction for logging
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEvent {
    /// Business flow
    pub flow: Flow,
    /// Ledger touched
    pub ledger: LedgerKind,
    /// Outcome
    pub status: TxStatus,
    /// Run / request correlation ID
    pub correlation_id: Option<String>,
    /// Member reference
    pub member_ref: Option<String>,
    /// Wallet involved
    pub wallet_address: Option<String>,
    /// On-chain hash
    pub tx_hash: Option<String>,
    /// Error code on failure
    pub error_code: Option<String>,
    /// Error message on failure
    pub error_message: Option<String>,
}

impl From<&LedgerTransactionRecord> for LedgerEvent {
    fn from(record: &LedgerTransactionRecord) -> Self {
        Self {
            flow: record.flow,
            ledger: record.ledger,
            status: record.status,
            correlation_id: record.correlation_id.clone(),
            member_ref: record.member_ref.clone(),
            wallet_address: record.wallet_address.clone(),
            tx_hash: record.tx_hash.clone(),
            error_code: record.error_code.clone(),
            error_message: record.error_message.clone(),
        }
    }
}

/// Emit one structured event; failures and alerts are logged at `warn`
pub fn log_ledger_event(event: &LedgerEvent) {
    let correlation_id = event.correlation_id.as_deref().unwrap_or("-");
    let member = event.member_ref.as_deref().unwrap_or("-");
    let wallet = event.wallet_address.as_deref().unwrap_or("-");
    let tx_hash = event.tx_hash.as_deref().unwrap_or("-");

    match event.status {
        TxStatus::Failed | TxStatus::Detected => tracing::warn!(
            target: LEDGER_EVENT_TARGET,
            flow = %event.flow,
            ledger = %event.ledger,
            status = %event.status,
            correlation_id,
            member,
            wallet,
            tx_hash,
            error_code = event.error_code.as_deref().unwrap_or("-"),
            error_message = event.error_message.as_deref().unwrap_or("-"),
            "Ledger event"
        ),
        TxStatus::Pending | TxStatus::Confirmed => tracing::info!(
            target: LEDGER_EVENT_TARGET,
            flow = %event.flow,
            ledger = %event.ledger,
            status = %event.status,
            correlation_id,
            member,
            wallet,
            tx_hash,
            "Ledger event"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    #[test]
    fn test_event_from_record() {
        let mut record = LedgerTransactionRecord::pending(
            LedgerKind::Xrpl,
            Flow::PorAnchoring,
            Direction::Outbound,
        )
        .with_correlation_id("run-1")
        .with_wallet("rOracleOps");
        record.fail(Some("tecUNFUNDED".into()), "unfunded").unwrap();

        let event = LedgerEvent::from(&record);
        assert_eq!(event.flow, Flow::PorAnchoring);
        assert_eq!(event.status, TxStatus::Failed);
        assert_eq!(event.correlation_id.as_deref(), Some("run-1"));
        assert_eq!(event.error_code.as_deref(), Some("tecUNFUNDED"));

        // Must not panic without a subscriber
        log_ledger_event(&event);
    }
}

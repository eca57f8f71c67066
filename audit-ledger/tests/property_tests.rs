//! Property-based tests for audit record invariants
//!
//! - Terminal states are absorbing: no sequence of transitions leaves them
//! - Failed records always keep their error fields
//! - Stores never let a terminal record be overwritten

use audit_ledger::{
    AuditStore, Direction, Flow, LedgerKind, LedgerTransactionRecord, MemoryAuditStore,
    RecordFilter, TxStatus,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Confirm,
    Fail(String, String),
    Detect,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Confirm),
        ("tec[A-Z_]{3,12}", "[a-z ]{1,30}").prop_map(|(c, m)| Step::Fail(c, m)),
        Just(Step::Detect),
    ]
}

fn flow_strategy() -> impl Strategy<Value = Flow> {
    proptest::sample::select(Flow::ALL.to_vec())
}

fn apply(record: &mut LedgerTransactionRecord, step: &Step) -> bool {
    match step {
        Step::Confirm => record.confirm(Some("HASH".into())).is_ok(),
        Step::Fail(code, message) => record.fail(Some(code.clone()), message.clone()).is_ok(),
        Step::Detect => record.detect().is_ok(),
    }
}

proptest! {
    #[test]
    fn prop_first_transition_wins(flow in flow_strategy(), steps in prop::collection::vec(step_strategy(), 1..8)) {
        let mut record = LedgerTransactionRecord::pending(LedgerKind::Xrpl, flow, Direction::Outbound);

        prop_assert!(apply(&mut record, &steps[0]));
        let settled = record.clone();

        for step in &steps[1..] {
            prop_assert!(!apply(&mut record, step));
        }
        prop_assert_eq!(record.status, settled.status);
        prop_assert_eq!(record.error_code, settled.error_code);
        prop_assert_eq!(record.error_message, settled.error_message);
    }

    #[test]
    fn prop_failed_keeps_error(code in "tec[A-Z_]{3,12}", message in "[a-zA-Z ]{1,40}") {
        let mut record = LedgerTransactionRecord::pending(LedgerKind::Evm, Flow::KycUpdate, Direction::Outbound);
        record.fail(Some(code.clone()), message.clone()).unwrap();

        prop_assert_eq!(record.status, TxStatus::Failed);
        prop_assert_eq!(record.error_code, Some(code));
        prop_assert_eq!(record.error_message, Some(message));
    }

    #[test]
    fn prop_store_rejects_terminal_overwrite(steps in prop::collection::vec(step_strategy(), 2..5)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = MemoryAuditStore::new();
            let mut record = LedgerTransactionRecord::pending(LedgerKind::Xrpl, Flow::BonusIssue, Direction::Outbound);
            store.create(&record).await.unwrap();

            apply(&mut record, &steps[0]);
            store.update(&record).await.unwrap();

            let mut forged = record.clone();
            forged.status = TxStatus::Pending;
            apply(&mut forged, &steps[1]);
            assert!(store.update(&forged).await.is_err());

            let stored = store.list(&RecordFilter::all()).await.unwrap();
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].status, record.status);
        });
    }
}

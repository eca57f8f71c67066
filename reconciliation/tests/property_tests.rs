//! Property-based tests for reconciliation arithmetic
//!
//! - Tolerance: absolute, strict and symmetric
//! - History: deposits minus redemptions, order independent

use audit_ledger::{Direction, Flow, LedgerKind, LedgerTransactionRecord};
use proptest::prelude::*;
use reconciliation::{derive_supply, within_tolerance};
use rust_decimal::Decimal;
use serde_json::json;

/// Token amounts with up to six decimals
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000_000i64).prop_map(|micros| Decimal::new(micros, 6))
}

fn confirmed(flow: Flow, amount: Decimal) -> LedgerTransactionRecord {
    let mut record = LedgerTransactionRecord::pending(LedgerKind::Xrpl, flow, Direction::Outbound)
        .with_payload(&json!({ "amount": amount.to_string(), "currency": "FTHUSD" }));
    record.confirm(None).unwrap();
    record
}

proptest! {
    #[test]
    fn prop_tolerance_symmetric(a in amount_strategy(), b in amount_strategy()) {
        let tol = Decimal::new(1, 3);
        prop_assert_eq!(within_tolerance(a, b, tol), within_tolerance(b, a, tol));
    }

    #[test]
    fn prop_tolerance_absolute(base in amount_strategy(), micros in 0i64..2_000i64) {
        let tol = Decimal::new(1, 3);
        let drift = Decimal::new(micros, 6);
        prop_assert_eq!(within_tolerance(base + drift, base, tol), micros < 1_000);
    }

    #[test]
    fn prop_history_order_independent(
        deposits in prop::collection::vec(amount_strategy(), 0..10),
        redemptions in prop::collection::vec(amount_strategy(), 0..10),
    ) {
        let mut records: Vec<_> = deposits.iter().map(|a| confirmed(Flow::FthusdDeposit, *a)).collect();
        records.extend(redemptions.iter().map(|a| confirmed(Flow::FthusdRedemption, *a)));

        let expected: Decimal = deposits.iter().sum::<Decimal>() - redemptions.iter().sum::<Decimal>();
        prop_assert_eq!(derive_supply(&records).unwrap().fthusd, expected);

        records.reverse();
        prop_assert_eq!(derive_supply(&records).unwrap().fthusd, expected);
    }
}

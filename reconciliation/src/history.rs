//! Off-chain supply derived from the audit ledger
//!
//! - FTHUSD = confirmed deposits - confirmed redemptions
//! - USDF = confirmed bonuses - confirmed gold-order spends + confirmed buyback refunds
//!
//! Amounts come from each record's payload summary: `amount`, falling back to
//! `amountUSDF` and `usdfAmount`. Records whose payload names another currency
//! (NFT burns in a buyback, for instance) are skipped.

use crate::{Error, Result};
use audit_ledger::{Flow, LedgerTransactionRecord, TxStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use xrpl_client::{FTHUSD, USDF};

const AMOUNT_FIELDS: [&str; 3] = ["amount", "amountUSDF", "usdfAmount"];

/// Supply implied by the flow history, in token units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffChainSupply {
    /// Expected FTHUSD supply
    pub fthusd: Decimal,
    /// Expected USDF supply
    pub usdf: Decimal,
}

/// Sum confirmed flows into expected supply
pub fn derive_supply<'a>(
    records: impl IntoIterator<Item = &'a LedgerTransactionRecord>,
) -> Result<OffChainSupply> {
    let mut supply = OffChainSupply::default();
    for record in records {
        if record.status != TxStatus::Confirmed {
            continue;
        }
        let (currency, sign) = match record.flow {
            Flow::FthusdDeposit => (FTHUSD, Decimal::ONE),
            Flow::FthusdRedemption => (FTHUSD, Decimal::NEGATIVE_ONE),
            Flow::BonusIssue => (USDF, Decimal::ONE),
            Flow::GoldOrderCreate => (USDF, Decimal::NEGATIVE_ONE),
            Flow::GoldOrderBuyback => (USDF, Decimal::ONE),
            _ => continue,
        };
        let Some(amount) = record_amount(record, currency)? else {
            continue;
        };
        let slot = if currency == FTHUSD {
            &mut supply.fthusd
        } else {
            &mut supply.usdf
        };
        *slot = slot
            .checked_add(sign * amount)
            .ok_or(Error::Overflow("off-chain supply"))?;
    }
    Ok(supply)
}

fn record_amount(record: &LedgerTransactionRecord, currency: &str) -> Result<Option<Decimal>> {
    let Some(payload) = record.payload() else {
        return Ok(None);
    };
    if let Some(named) = payload.get("currency").and_then(Value::as_str) {
        if !named.is_empty() && named != currency {
            return Ok(None);
        }
    }
    let Some(raw) = AMOUNT_FIELDS.iter().find_map(|field| payload.get(*field)) else {
        return Ok(None);
    };
    let text = match raw {
        Value::String(s) if s.is_empty() => return Ok(None),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|_| Error::InvalidAmount {
            record: record.id.to_string(),
            value: text,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_ledger::{Direction, LedgerKind};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn record(flow: Flow, payload: Value, confirmed: bool) -> LedgerTransactionRecord {
        let mut record = LedgerTransactionRecord::pending(LedgerKind::Xrpl, flow, Direction::Outbound)
            .with_payload(&payload);
        if confirmed {
            record.confirm(None).unwrap();
        } else {
            record.fail(Some("tecPATH_DRY".into()), "Path could not send partial amount.").unwrap();
        }
        record
    }

    #[test]
    fn test_fthusd_deposits_minus_redemptions() {
        let records = vec![
            record(Flow::FthusdDeposit, json!({"amount": "1000", "currency": "FTHUSD"}), true),
            record(Flow::FthusdDeposit, json!({"amount": "250.5", "currency": "FTHUSD"}), true),
            record(Flow::FthusdDeposit, json!({"amount": "999", "currency": "FTHUSD"}), false),
            record(Flow::FthusdRedemption, json!({"amount": "50.5", "currency": "FTHUSD"}), true),
        ];
        let supply = derive_supply(&records).unwrap();
        assert_eq!(supply.fthusd, dec!(1200));
        assert_eq!(supply.usdf, Decimal::ZERO);
    }

    #[test]
    fn test_usdf_fallback_fields_and_skips() {
        let records = vec![
            record(Flow::BonusIssue, json!({"amountUSDF": "300"}), true),
            record(Flow::GoldOrderCreate, json!({"usdfAmount": 120}), true),
            record(Flow::GoldOrderBuyback, json!({"type": "NFTokenBurn", "amount": "", "currency": ""}), true),
            record(Flow::GoldOrderBuyback, json!({"amount": "20", "currency": "USDF"}), true),
            record(Flow::PorAnchoring, json!({"amount": "0.000001", "currency": "XRP"}), true),
        ];
        let supply = derive_supply(&records).unwrap();
        assert_eq!(supply.usdf, dec!(200));
    }

    #[test]
    fn test_malformed_amount_is_error() {
        let records = vec![record(Flow::BonusIssue, json!({"amount": "lots"}), true)];
        assert!(matches!(
            derive_supply(&records),
            Err(Error::InvalidAmount { .. })
        ));
    }
}

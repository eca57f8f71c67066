//! Transaction-shape validation
//!
//! Runs before signing. A rejected intent never reaches the network and never
//! produces an audit record.

use crate::{
    types::{flags, is_program_currency, Amount, TransactionIntent},
    Error, Result,
};
use rust_decimal::Decimal;

/// Check an intent against the program's shape rules
///
/// - Program-currency payments: no `tfPartialPayment`, no path list, positive amount
/// - Program-currency holder trustlines: `tfSetNoRipple` set
/// - NFT mints: non-empty URI
pub fn validate_intent(intent: &TransactionIntent) -> Result<()> {
    match intent {
        TransactionIntent::Payment(payment) => {
            if payment.amount.value() <= Decimal::ZERO {
                return Err(Error::Validation(format!(
                    "Payment amount must be positive, got {}",
                    payment.amount.value()
                )));
            }
            if payment.account == payment.destination {
                return Err(Error::Validation(
                    "Payment destination must differ from the sending account".to_string(),
                ));
            }
            if payment.amount.is_program_currency() {
                let currency = payment.amount.currency();
                if payment.flags & flags::TF_PARTIAL_PAYMENT != 0 {
                    return Err(Error::Validation(format!(
                        "Partial payments not allowed for {}",
                        currency
                    )));
                }
                if payment.paths.is_some() {
                    return Err(Error::Validation(format!(
                        "Pathfinding not allowed for {} - use direct payments only",
                        currency
                    )));
                }
                if let Amount::Issued(issued) = &payment.amount {
                    if issued.issuer.is_empty() {
                        return Err(Error::Validation(format!("{} amount has no issuer", currency)));
                    }
                }
            }
        }
        TransactionIntent::TrustSet(trust) => {
            if trust.limit.value < Decimal::ZERO {
                return Err(Error::Validation("Trustline limit must not be negative".to_string()));
            }
            if is_program_currency(&trust.limit.currency)
                && !trust.is_authorization()
                && !trust.has_no_ripple()
            {
                return Err(Error::Validation(format!(
                    "{} trustline must set tfSetNoRipple",
                    trust.limit.currency
                )));
            }
            if trust.flags & flags::TF_CLEAR_NO_RIPPLE != 0 && is_program_currency(&trust.limit.currency) {
                return Err(Error::Validation(format!(
                    "{} trustline must not clear NoRipple",
                    trust.limit.currency
                )));
            }
        }
        TransactionIntent::NFTokenMint(mint) => {
            if mint.uri.is_empty() {
                return Err(Error::Validation("NFT mint requires a metadata URI".to_string()));
            }
        }
        TransactionIntent::NFTokenBurn(burn) => {
            if burn.nftoken_id.is_empty() {
                return Err(Error::Validation("NFT burn requires a token ID".to_string()));
            }
        }
    }
    Ok(())
}

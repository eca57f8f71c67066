//! Property tests for transaction-shape enforcement

use audit_ledger::{AuditStore, Flow, MemoryAuditStore, RecordFilter};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use xrpl_client::{
    types::{flags, PathStep},
    validate_intent, Amount, Error, IssuedAmount, LedgerClient, LocalSigner, OpsSigners, Payment,
    SimulatedLedger, TransactionIntent, XrplConfig, FTHUSD, USDF,
};

const FTHUSD_ISSUER: &str = "r3sNTMefq5gsRumMYsNznnX6yzzxVH6dTC";
const USDF_ISSUER: &str = "rpjfAeE3DeeHPFnN2PgGFW5YxnZFAjrEyN";
const GOLD_VAULT: &str = "rPPdduC9MRTrXZP1J7MQyEKKEYiFigWZ6Q";
const ORACLE: &str = "rH9ESAdrFfDAZtCZGa7JiwNJfKnC6CmGFQ";
const MEMBER: &str = "rHhr2iRBgp3ZzzNH4YGQ59G7VAiGPEWj7f";
const MARKET_MAKER: &str = "rE8zrHvNYHxxEAhzbXzigXbrf8bDMTbipP";

fn config() -> XrplConfig {
    XrplConfig {
        fthusd_issuer: FTHUSD_ISSUER.into(),
        usdf_issuer: USDF_ISSUER.into(),
        gold_vault: GOLD_VAULT.into(),
        oracle_account: ORACLE.into(),
        ..Default::default()
    }
}

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1u64..10_000_000, 0u32..6).prop_map(|(units, scale)| Decimal::new(units as i64, scale))
}

fn currency_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(FTHUSD), Just(USDF)]
}

proptest! {
    #[test]
    fn prop_partial_payment_rejected_before_signing(
        amount in amount_strategy(),
        currency in currency_strategy(),
        extra_flags in any::<u32>(),
    ) {
        let mut payment = Payment::direct(
            FTHUSD_ISSUER,
            MEMBER,
            Amount::Issued(IssuedAmount::new(currency, FTHUSD_ISSUER, amount)),
        );
        payment.flags = extra_flags | flags::TF_PARTIAL_PAYMENT;
        let intent = TransactionIntent::Payment(payment);

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = Arc::new(SimulatedLedger::new());
            let store = Arc::new(MemoryAuditStore::new());
            let client = LedgerClient::new(config(), ledger.clone(), store.clone(), OpsSigners::default());
            let signer = LocalSigner::from_entropy(&[1; 16]);

            let err = client.submit(&signer, intent, Flow::FthusdDeposit, None).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
            assert!(store.list(&RecordFilter::all()).await.unwrap().is_empty());
            assert!(ledger.submitted().is_empty());
        });
    }

    #[test]
    fn prop_path_list_rejected(
        amount in amount_strategy(),
        currency in currency_strategy(),
        hops in 0usize..3,
    ) {
        let mut payment = Payment::direct(
            MEMBER,
            FTHUSD_ISSUER,
            Amount::Issued(IssuedAmount::new(currency, FTHUSD_ISSUER, amount)),
        );
        payment.paths = Some(vec![vec![
            PathStep {
                account: Some(MARKET_MAKER.into()),
                currency: None,
                issuer: None,
            };
            hops
        ]]);
        let result = validate_intent(&TransactionIntent::Payment(payment));
        prop_assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn prop_direct_program_payment_accepted(
        amount in amount_strategy(),
        currency in currency_strategy(),
    ) {
        let payment = Payment::direct(
            FTHUSD_ISSUER,
            MEMBER,
            Amount::Issued(IssuedAmount::new(currency, FTHUSD_ISSUER, amount)),
        );
        prop_assert!(validate_intent(&TransactionIntent::Payment(payment)).is_ok());
    }

    #[test]
    fn prop_built_trustlines_never_ripple(member in "r[1-9A-HJ-NP-Za-km-z]{24,34}") {
        let client = LedgerClient::new(
            config(),
            Arc::new(SimulatedLedger::new()),
            Arc::new(MemoryAuditStore::new()),
            OpsSigners::default(),
        );
        let intents = client.build_member_trust_set(&member);
        prop_assert_eq!(intents.len(), 2);
        for intent in intents {
            match intent {
                TransactionIntent::TrustSet(trust) => {
                    prop_assert!(trust.has_no_ripple());
                    prop_assert_eq!(trust.flags & flags::TF_CLEAR_NO_RIPPLE, 0);
                    prop_assert!(validate_intent(&TransactionIntent::TrustSet(trust)).is_ok());
                }
                other => prop_assert!(false, "unexpected intent {:?}", other),
            }
        }
    }
}

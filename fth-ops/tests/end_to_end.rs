//! End-to-end scenarios against the simulated XRPL ledger and registry
//!
//! - Deposit, publish, reconcile: every invariant holds
//! - On-ledger failure then fresh resubmission: two separate records
//! - Anchor failure then anchor-retry
//! - Sub-cent USDF bonus through PoR into reconciliation
//! - Two runs crediting the same issuer concurrently
//! - A full simulated day
//! - DEX alerts persisted in a RocksDB store

use audit_ledger::{
    open_store, AuditStore, Flow, RecordFilter, StoreBackend, StoreConfig, TxStatus,
};
use chrono::{TimeZone, Utc};
use evm_registry::SimulatedRegistry;
use fth_ops::{
    jobs, simulate_day, OpsConfig, OpsContext, SimulatedEnvironment, SimulationPlan,
};
use reserves::Cents;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use xrpl_client::{
    Amount, BookOffer, IssuedAmount, LocalSigner, OpsSigners, Signer, SimulatedLedger, FTHUSD,
};

const FTHUSD_ISSUER: &str = "r3sNTMefq5gsRumMYsNznnX6yzzxVH6dTC";
const USDF_ISSUER: &str = "rpjfAeE3DeeHPFnN2PgGFW5YxnZFAjrEyN";
const TRADER: &str = "rE8zrHvNYHxxEAhzbXzigXbrf8bDMTbipP";

fn plan(bank_cash_cents: u128) -> SimulationPlan {
    SimulationPlan {
        members: 1,
        inject_failure: false,
        bank_cash_cents: Cents(bank_cash_cents),
        gold_value_cents: Cents(0),
        ..Default::default()
    }
}

async fn onboard(env: &SimulatedEnvironment, member: &LocalSigner) {
    let client = env.ctx.ledger("onboarding");
    client.set_member_trustlines(member).await.unwrap();
    client.authorize_member_trustlines(member.address()).await.unwrap();
}

fn decimal(output: &Value, field: &str) -> Decimal {
    output[field].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_deposit_publish_reconcile() {
    let env = SimulatedEnvironment::new(&OpsConfig::default(), &plan(150_000)).unwrap();
    let member = LocalSigner::generate();
    onboard(&env, &member).await;

    env.ctx
        .ledger("deposit")
        .credit_fthusd(member.address(), dec!(1000), "dep-1")
        .await
        .unwrap();

    let por = jobs::run_por_snapshot(&env.ctx, Utc::now()).await;
    assert!(por.success, "{}", por.output);
    assert_eq!(por.exit_code(), 0);
    assert!(por.output["coverageRatioBps"].as_u64().unwrap() >= 10_000);
    assert_eq!(por.output["coverageRatioBps"], 15_000);

    let reconciliation = jobs::run_reconciliation(&env.ctx).await;
    assert!(reconciliation.success, "{}", reconciliation.output);
    let output = &reconciliation.output;
    assert_eq!(decimal(output, "onChainFTHUSDSupply"), dec!(1000));
    assert_eq!(decimal(output, "dbFTHUSDSupply"), dec!(1000));
    assert_eq!(decimal(output, "porLiabilitiesFTHUSD"), dec!(1000));
    assert_eq!(output["invariants"]["porCoverageAboveThreshold"], true);

    let records = env
        .store
        .list(&RecordFilter::all().flow(Flow::SupplyReconciliation))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, TxStatus::Confirmed);
    assert_eq!(
        records[0].correlation_id.as_deref(),
        Some(reconciliation.correlation_id.as_str())
    );
}

#[tokio::test]
async fn test_undercollateralized_snapshot_fails_run() {
    let env = SimulatedEnvironment::new(&OpsConfig::default(), &plan(50_000)).unwrap();
    let member = LocalSigner::generate();
    onboard(&env, &member).await;
    env.ctx
        .ledger("deposit")
        .credit_fthusd(member.address(), dec!(1000), "dep-1")
        .await
        .unwrap();

    let por = jobs::run_por_snapshot(&env.ctx, Utc::now()).await;
    assert!(!por.success);
    assert_eq!(por.exit_code(), 1);
    assert!(env.registry.snapshots().is_empty());
    assert!(env
        .store
        .list(&RecordFilter::all().flow(Flow::PorAnchoring))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_failure_then_fresh_resubmission() {
    let env = SimulatedEnvironment::new(&OpsConfig::default(), &plan(150_000)).unwrap();
    let member = LocalSigner::generate();
    onboard(&env, &member).await;
    let client = env.ctx.ledger("retry");

    env.ledger.fail_next("tecPATH_DRY", "Path could not send partial amount.");
    let err = client
        .credit_fthusd(member.address(), dec!(1000), "dep-1")
        .await
        .unwrap_err();
    assert!(matches!(err, xrpl_client::Error::Transaction { .. }));

    client
        .credit_fthusd(member.address(), dec!(1000), "dep-1")
        .await
        .unwrap();

    let deposits = env
        .store
        .list(&RecordFilter::all().flow(Flow::FthusdDeposit))
        .await
        .unwrap();
    assert_eq!(deposits.len(), 2);
    assert_eq!(deposits[0].status, TxStatus::Failed);
    assert_eq!(deposits[0].error_code.as_deref(), Some("tecPATH_DRY"));
    assert!(deposits[0].error_message.is_some());
    assert_eq!(deposits[1].status, TxStatus::Confirmed);
    assert_ne!(deposits[0].id, deposits[1].id);
    assert_ne!(deposits[0].tx_hash, deposits[1].tx_hash);

    // Only the confirmed deposit counts
    jobs::run_por_snapshot(&env.ctx, Utc::now()).await;
    let reconciliation = jobs::run_reconciliation(&env.ctx).await;
    assert!(reconciliation.success, "{}", reconciliation.output);
    assert_eq!(decimal(&reconciliation.output, "dbFTHUSDSupply"), dec!(1000));
}

#[tokio::test]
async fn test_anchor_failure_then_retry() {
    let env = SimulatedEnvironment::new(&OpsConfig::default(), &plan(150_000)).unwrap();
    let as_of = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    // The anchor is the run's only submission
    env.ledger.fail_next("tecNO_DST_INSUF_XRP", "Destination does not exist.");
    let por = jobs::run_por_snapshot(&env.ctx, as_of).await;
    assert!(!por.success);
    assert_eq!(env.registry.snapshots().len(), 1);
    let hash = por.output["canonicalHash"].as_str().unwrap().to_string();
    assert_eq!(hash, env.registry.snapshots()[0].hash);
    assert!(!por.output["evmTxHash"].as_str().unwrap().is_empty());

    let retry = jobs::run_anchor_retry(&env.ctx, &hash, as_of).await;
    assert!(retry.success, "{}", retry.output);

    let anchors = env
        .store
        .list(&RecordFilter::all().flow(Flow::PorAnchoring))
        .await
        .unwrap();
    assert_eq!(anchors.len(), 2);
    assert_eq!(anchors[0].status, TxStatus::Failed);
    assert_eq!(anchors[1].status, TxStatus::Confirmed);
    assert_eq!(anchors[1].correlation_id.as_deref(), Some(retry.correlation_id.as_str()));
    let memos = &anchors[1].payload().unwrap()["memos"];
    assert_eq!(memos[0]["data"], hash.as_str());
    assert_eq!(memos[1]["data"], "2026-01-01T00:00:00.000Z");
}

#[tokio::test]
async fn test_sub_cent_bonus_publishes_and_reconciles() {
    let env = SimulatedEnvironment::new(&OpsConfig::default(), &plan(150_000)).unwrap();
    let member = LocalSigner::generate();
    onboard(&env, &member).await;

    let client = env.ctx.ledger("fractional");
    client
        .credit_fthusd(member.address(), dec!(1000), "dep-1")
        .await
        .unwrap();
    client
        .issue_usdf_bonus(member.address(), dec!(0.333), "bonus-1", Utc::now().date_naive())
        .await
        .unwrap();

    let por = jobs::run_por_snapshot(&env.ctx, Utc::now()).await;
    assert!(por.success, "{}", por.output);
    // The registry holds whole cents
    assert_eq!(env.registry.snapshots()[0].usdf_circulating, 33);

    let reconciliation = jobs::run_reconciliation(&env.ctx).await;
    assert!(reconciliation.success, "{}", reconciliation.output);
    let output = &reconciliation.output;
    assert_eq!(decimal(output, "onChainUSDFSupply"), dec!(0.333));
    assert_eq!(decimal(output, "dbUSDFSupply"), dec!(0.333));
    assert_eq!(decimal(output, "porLiabilitiesUSDF"), dec!(0.33));
    assert_eq!(
        output["invariants"]["onChainUSDFMatchesPoRLiabilities"],
        true
    );
}

#[tokio::test]
async fn test_concurrent_runs_share_issuer_queue() {
    let env = SimulatedEnvironment::new(&OpsConfig::default(), &plan(500_000)).unwrap();
    let member = LocalSigner::generate();
    onboard(&env, &member).await;
    env.ledger.set_submit_delay(Some(Duration::from_millis(200)));

    let (run_a, run_b) = (env.ctx.ledger("run-a"), env.ctx.ledger("run-b"));
    let (a, b) = tokio::join!(
        run_a.credit_fthusd(member.address(), dec!(1000), "dep-a"),
        run_b.credit_fthusd(member.address(), dec!(500), "dep-b"),
    );
    assert!(a.is_ok(), "{:?}", a);
    assert!(b.is_ok(), "{:?}", b);
    env.ledger.set_submit_delay(None);

    let deposits = env
        .store
        .list(&RecordFilter::all().flow(Flow::FthusdDeposit))
        .await
        .unwrap();
    assert_eq!(deposits.len(), 2);
    assert!(deposits.iter().all(|r| r.status == TxStatus::Confirmed));
    assert_eq!(
        env.ctx.ledger("check").fthusd_supply().await.unwrap(),
        dec!(1500)
    );
}

#[tokio::test]
async fn test_simulated_day() {
    let report = simulate_day(&OpsConfig::default(), &SimulationPlan::default())
        .await
        .unwrap();
    assert!(report.success(), "{}", serde_json::to_string_pretty(&report).unwrap());
    assert_eq!(report.exit_code(), 0);
    // The scripted deposit failure
    assert_eq!(report.failed_records, 1);

    let output = &report.reconciliation.output;
    // Two deposits of 1000, 100 redeemed
    assert_eq!(decimal(output, "onChainFTHUSDSupply"), dec!(1900));
    // Bonuses of 25.5 each, 10 spent on gold
    assert_eq!(decimal(output, "onChainUSDFSupply"), dec!(41));
    assert_eq!(decimal(output, "dbUSDFSupply"), dec!(41));
    assert!(report.dex_scan.success);
}

#[tokio::test]
async fn test_dex_alerts_persist_in_rocksdb() {
    let dir = tempfile::tempdir().unwrap();
    let store_config = StoreConfig {
        backend: StoreBackend::Rocksdb,
        data_dir: dir.path().join("audit"),
        ..Default::default()
    };
    let mut config = OpsConfig::default();
    config.xrpl.fthusd_issuer = FTHUSD_ISSUER.into();
    config.xrpl.usdf_issuer = USDF_ISSUER.into();
    config.store = store_config.clone();

    let ledger = Arc::new(SimulatedLedger::new());
    ledger.place_offer(BookOffer {
        account: TRADER.into(),
        sequence: 11,
        taker_gets: Amount::Issued(IssuedAmount::new(FTHUSD, FTHUSD_ISSUER, dec!(50))),
        taker_pays: Amount::Drops(25_000_000),
    });

    let correlation_id = {
        let ctx = OpsContext::new(
            config,
            open_store(&store_config).unwrap(),
            ledger,
            OpsSigners::default(),
            Arc::new(SimulatedRegistry::new()),
        )
        .unwrap();
        let scan = jobs::run_dex_scan(&ctx).await;
        assert!(!scan.success);
        assert_eq!(scan.exit_code(), 1);
        assert_eq!(scan.output["alerts"].as_array().unwrap().len(), 1);
        scan.correlation_id
    };

    let reopened = open_store(&store_config).unwrap();
    let alerts = reopened
        .list(&RecordFilter::all().flow(Flow::DexScanAlert))
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status, TxStatus::Detected);
    assert_eq!(alerts[0].wallet_address.as_deref(), Some(TRADER));
    assert_eq!(alerts[0].correlation_id.as_deref(), Some(correlation_id.as_str()));
}

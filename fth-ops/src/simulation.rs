//! Simulated operations day
//!
//! Runs a full day of program activity against the simulated XRPL ledger and
//! the simulated registry: onboarding, deposits, a scripted failure followed by
//! a fresh resubmission, bonus issuance, a redemption, a gold order, then the
//! PoR snapshot, reconciliation and DEX scan exactly as the scheduler would.

use crate::{
    config::OpsConfig,
    context::OpsContext,
    jobs::{self, JobReport},
    Result,
};
use audit_ledger::{Flow, MemoryAuditStore, RecordFilter, StoreConfig, TxStatus};
use chrono::Utc;
use evm_registry::SimulatedRegistry;
use reserves::Cents;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use xrpl_client::{LocalSigner, OpsSigners, Signer, SimulatedLedger};

/// Parameters of a simulated day
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    /// Members to onboard, each with a fresh wallet
    pub members: usize,
    /// FTHUSD deposit per member
    pub deposit: Decimal,
    /// USDF bonus per member
    pub bonus: Decimal,
    /// FTHUSD redeemed by the first member
    pub redemption: Decimal,
    /// USDF the first member spends on a gold order
    pub gold_order_usdf: Decimal,
    /// Fail the first deposit on-ledger, then resubmit it
    pub inject_failure: bool,
    /// Bank custody figure for the snapshot
    pub bank_cash_cents: Cents,
    /// Gold custody figure for the snapshot
    pub gold_value_cents: Cents,
}

impl Default for SimulationPlan {
    fn default() -> Self {
        Self {
            members: 2,
            deposit: Decimal::from(1000u32),
            bonus: Decimal::new(255, 1),
            redemption: Decimal::from(100u32),
            gold_order_usdf: Decimal::from(10u32),
            inject_failure: true,
            bank_cash_cents: Cents(200_000),
            gold_value_cents: Cents(50_000),
        }
    }
}

/// Outcome of a simulated day
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayReport {
    /// Correlation id of the day's member activity
    pub correlation_id: String,
    /// Records written by the whole day
    pub records: usize,
    /// Records that ended `failed`
    pub failed_records: usize,
    /// PoR run
    pub por: JobReport,
    /// Reconciliation run
    pub reconciliation: JobReport,
    /// DEX scan run
    pub dex_scan: JobReport,
}

impl DayReport {
    /// Every job succeeded
    pub fn success(&self) -> bool {
        self.por.success && self.reconciliation.success && self.dex_scan.success
    }

    /// 0 if every job succeeded, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

/// Simulated ledgers plus the context running against them
#[derive(Debug)]
pub struct SimulatedEnvironment {
    /// XRPL
    pub ledger: Arc<SimulatedLedger>,
    /// EVM registry
    pub registry: Arc<SimulatedRegistry>,
    /// Audit store
    pub store: Arc<MemoryAuditStore>,
    /// Context over the three
    pub ctx: OpsContext,
}

impl SimulatedEnvironment {
    /// Fresh environment; `base` supplies thresholds and the treasury base URI
    pub fn new(base: &OpsConfig, plan: &SimulationPlan) -> Result<Self> {
        let issuer = LocalSigner::generate();
        let bonus = LocalSigner::generate();
        let gold = LocalSigner::generate();
        let oracle = LocalSigner::generate();
        let oracle_account = LocalSigner::generate();

        let mut config = base.clone();
        config.xrpl.fthusd_issuer = issuer.address().to_string();
        config.xrpl.usdf_issuer = bonus.address().to_string();
        config.xrpl.gold_vault = gold.address().to_string();
        config.xrpl.oracle_account = oracle_account.address().to_string();
        config.store = StoreConfig::memory();
        config.treasury.reserves.bank_cash_cents = plan.bank_cash_cents;
        config.treasury.reserves.gold_value_cents = plan.gold_value_cents;
        config.treasury.liabilities_from_ledger = true;
        config.metrics.textfile_path = None;

        let ledger = Arc::new(SimulatedLedger::new());
        ledger.require_auth(issuer.address());
        ledger.require_auth(bonus.address());

        let signers = OpsSigners {
            issuer: Some(Arc::new(issuer)),
            bonus: Some(Arc::new(bonus)),
            gold: Some(Arc::new(gold)),
            oracle: Some(Arc::new(oracle)),
        };
        let registry = Arc::new(SimulatedRegistry::new());
        let store = Arc::new(MemoryAuditStore::new());

        let ctx = OpsContext::new(config, store.clone(), ledger.clone(), signers, registry.clone())?;
        Ok(Self {
            ledger,
            registry,
            store,
            ctx,
        })
    }
}

/// Run one simulated day
pub async fn simulate_day(base: &OpsConfig, plan: &SimulationPlan) -> Result<DayReport> {
    let env = SimulatedEnvironment::new(base, plan)?;
    simulate_day_in(&env, plan).await
}

/// Run one simulated day in an existing environment
pub async fn simulate_day_in(env: &SimulatedEnvironment, plan: &SimulationPlan) -> Result<DayReport> {
    let correlation_id = Uuid::new_v4().to_string();
    info!(correlation_id = %correlation_id, members = plan.members, "Starting simulated day");

    let client = env.ctx.ledger(&correlation_id);
    client.set_gold_vault_trustline().await?;

    let members: Vec<LocalSigner> = (0..plan.members).map(|_| LocalSigner::generate()).collect();
    for (index, member) in members.iter().enumerate() {
        let address = member.address().to_string();
        client
            .mint_membership_nft(&address, &format!("member-{}", index + 1), "ipfs://fth/membership")
            .await?;
        client.set_member_trustlines(member).await?;
        client.authorize_member_trustlines(&address).await?;

        let deposit_id = format!("dep-{}-{}", index + 1, correlation_id);
        if plan.inject_failure && index == 0 {
            env.ledger.fail_next("tecPATH_DRY", "Path could not send partial amount.");
            if let Err(e) = client.credit_fthusd(&address, plan.deposit, &deposit_id).await {
                warn!(member = %address, error = %e, "Deposit failed; resubmitting as a fresh transaction");
            }
        }
        client.credit_fthusd(&address, plan.deposit, &deposit_id).await?;

        client
            .issue_usdf_bonus(
                &address,
                plan.bonus,
                &format!("bonus-{}", Utc::now().format("%Y%m%d")),
                Utc::now().date_naive(),
            )
            .await?;
    }

    if let Some(first) = members.first() {
        let address = first.address().to_string();
        if !plan.redemption.is_zero() {
            let intent = client.build_fthusd_redemption(&address, plan.redemption, "red-1");
            client
                .submit(first, intent, Flow::FthusdRedemption, Some(&address))
                .await?;
        }
        if !plan.gold_order_usdf.is_zero() {
            let intent = client.build_gold_order_payment(&address, plan.gold_order_usdf, "gold-1");
            client
                .submit(first, intent, Flow::GoldOrderCreate, Some(&address))
                .await?;
            client
                .mint_gold_order_nft(&address, "gold-1", "ipfs://fth/gold-order/gold-1")
                .await?;
        }
    }

    let por = jobs::run_por_snapshot(&env.ctx, Utc::now()).await;
    let reconciliation = jobs::run_reconciliation(&env.ctx).await;
    let dex_scan = jobs::run_dex_scan(&env.ctx).await;

    let store = env.ctx.store();
    let records = store.list(&RecordFilter::all()).await?.len();
    let failed_records = store
        .list(&RecordFilter::all().status(TxStatus::Failed))
        .await?
        .len();

    let report = DayReport {
        correlation_id,
        records,
        failed_records,
        por,
        reconciliation,
        dex_scan,
    };
    info!(
        correlation_id = %report.correlation_id,
        records = report.records,
        failed_records = report.failed_records,
        success = report.success(),
        "Simulated day complete"
    );
    Ok(report)
}

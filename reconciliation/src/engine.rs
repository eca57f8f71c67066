//! ReconciliationEngine: three-way supply check

use crate::{
    config::ReconciliationConfig,
    history::derive_supply,
    report::{ReconciliationReport, ReportStatus},
    Error, Result,
};
use audit_ledger::{
    log_ledger_event, AuditStore, Direction, Flow, LedgerEvent, LedgerKind,
    LedgerTransactionRecord, RecordFilter, TxStatus,
};
use chrono::Utc;
use evm_registry::RegistryClient;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};
use xrpl_client::LedgerClient;

/// Error code of failed reconciliation records
pub const RECONCILIATION_FAILED_CODE: &str = "RECONCILIATION_FAILED";

/// Supply reconciliation engine
pub struct ReconciliationEngine {
    ledger: Arc<LedgerClient>,
    registry: Arc<RegistryClient>,
    store: Arc<dyn AuditStore>,
    config: ReconciliationConfig,
    correlation_id: Option<String>,
}

impl fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("config", &self.config)
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

impl ReconciliationEngine {
    /// Create an engine
    pub fn new(
        ledger: Arc<LedgerClient>,
        registry: Arc<RegistryClient>,
        store: Arc<dyn AuditStore>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            ledger,
            registry,
            store,
            config,
            correlation_id: None,
        }
    }

    /// Tag the run's record with `correlation_id`
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Run one reconciliation and persist its report
    ///
    /// A failed invariant or an unreadable figure yields `Ok` with a
    /// [`ReportStatus::Failure`] report; `Err` means the report itself could
    /// not be persisted.
    pub async fn run(&self) -> Result<ReconciliationReport> {
        info!("Starting supply reconciliation");
        let mut report = ReconciliationReport::started(Utc::now(), self.config.tolerance);

        match self.gather(&mut report).await {
            Ok(()) => report.evaluate(self.config.min_coverage_bps),
            Err(e) => {
                error!(error = %e, "Reconciliation figures unavailable");
                report.abort(e);
            }
        }

        self.persist(&report).await?;

        if report.is_success() {
            info!(
                fthusd = %report.on_chain_fthusd_supply,
                usdf = %report.on_chain_usdf_supply,
                coverage_bps = report.por_coverage_ratio_bps,
                "All supply and reserve invariants satisfied"
            );
        } else {
            error!(
                details = %report.details,
                on_chain_fthusd = %report.on_chain_fthusd_supply,
                db_fthusd = %report.db_fthusd_supply,
                por_fthusd = %report.por_liabilities_fthusd,
                on_chain_usdf = %report.on_chain_usdf_supply,
                db_usdf = %report.db_usdf_supply,
                por_usdf = %report.por_liabilities_usdf,
                coverage_bps = report.por_coverage_ratio_bps,
                "Supply reconciliation failed"
            );
        }
        Ok(report)
    }

    async fn gather(&self, report: &mut ReconciliationReport) -> Result<()> {
        report.on_chain_fthusd_supply = self.ledger.fthusd_supply().await?;
        report.on_chain_usdf_supply = self.ledger.usdf_supply().await?;

        let confirmed = self
            .store
            .list(&RecordFilter::all().status(TxStatus::Confirmed))
            .await?;
        let supply = derive_supply(&confirmed)?;
        report.db_fthusd_supply = supply.fthusd;
        report.db_usdf_supply = supply.usdf;

        let latest = self.registry.get_latest_por().await?;
        report.por_liabilities_fthusd = cents_to_units(latest.fthusd_circulating())?;
        report.por_liabilities_usdf = cents_to_units(latest.usdf_circulating)?;
        report.por_total_assets = cents_to_units(latest.total_assets)?;
        report.por_coverage_ratio_bps = latest.coverage_ratio_bps;
        Ok(())
    }

    async fn persist(&self, report: &ReconciliationReport) -> Result<()> {
        let mut record = LedgerTransactionRecord::pending(
            LedgerKind::Internal,
            Flow::SupplyReconciliation,
            Direction::Internal,
        )
        .with_payload(report);
        if let Some(correlation_id) = &self.correlation_id {
            record = record.with_correlation_id(correlation_id.clone());
        }
        match report.status {
            ReportStatus::Success => record.confirm(None)?,
            ReportStatus::Failure => record.fail(
                Some(RECONCILIATION_FAILED_CODE.to_string()),
                report.details.clone(),
            )?,
        }
        self.store.create(&record).await?;
        log_ledger_event(&LedgerEvent::from(&record));
        Ok(())
    }
}

fn cents_to_units(cents: u128) -> Result<Decimal> {
    let cents = i128::try_from(cents).map_err(|_| Error::Overflow("PoR figure"))?;
    Decimal::try_from_i128_with_scale(cents, 2).map_err(|_| Error::Overflow("PoR figure"))
}

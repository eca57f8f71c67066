//! Job runners
//!
//! Every run gets a fresh correlation id, tags all records it writes with it,
//! and ends with one structured `ops_run` event carrying the job's flow tag,
//! status and correlation id. Runners never return `Err`: any failure becomes
//! an unsuccessful [`JobReport`] so the caller can map it to exit code 1.

use crate::context::OpsContext;
use audit_ledger::{Flow, LedgerTransactionRecord, RecordFilter};
use chrono::{DateTime, Utc};
use reconciliation::{DexMonitor, ReconciliationEngine};
use reserves::{canonical_hash, LiabilitySource, PoRComposer, SnapshotBuilder, XrplLiabilitySource};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Log target of run events
pub const OPS_RUN_TARGET: &str = "ops_run";

/// Operations job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Job {
    /// Build, publish and anchor a PoR snapshot
    PorSnapshot,
    /// Three-way supply reconciliation
    Reconciliation,
    /// Order-book scan for program currencies
    DexScan,
    /// Re-anchor an already registered snapshot
    AnchorRetry,
}

impl Job {
    /// Jobs the scheduler runs
    pub const SCHEDULED: [Job; 3] = [Job::PorSnapshot, Job::Reconciliation, Job::DexScan];

    /// Job name (lease key, metrics label)
    pub fn name(&self) -> &'static str {
        match self {
            Job::PorSnapshot => "por-snapshot",
            Job::Reconciliation => "reconciliation",
            Job::DexScan => "dex-scan",
            Job::AnchorRetry => "anchor-retry",
        }
    }

    /// Flow tag of the job's records
    pub fn flow(&self) -> Flow {
        match self {
            Job::PorSnapshot => Flow::PorSnapshot,
            Job::Reconciliation => Flow::SupplyReconciliation,
            Job::DexScan => Flow::DexScanAlert,
            Job::AnchorRetry => Flow::PorAnchoring,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    /// Job
    pub job: Job,
    /// Correlation id carried by every record of the run
    pub correlation_id: String,
    /// Whether the run met every condition of its job
    pub success: bool,
    /// Job-specific output (report, snapshot result, alerts) or the error
    pub output: Value,
}

impl JobReport {
    /// 0 on success, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.success {
            0
        } else {
            1
        }
    }
}

/// New correlation id
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Run a job with default parameters (PoR as of now)
pub async fn run(ctx: &OpsContext, job: Job) -> JobReport {
    match job {
        Job::PorSnapshot => run_por_snapshot(ctx, Utc::now()).await,
        Job::Reconciliation => run_reconciliation(ctx).await,
        Job::DexScan => run_dex_scan(ctx).await,
        Job::AnchorRetry => {
            let correlation_id = new_correlation_id();
            finish(
                ctx,
                job,
                correlation_id,
                Instant::now(),
                Err("anchor retry needs a hash and an as-of time".to_string()),
            )
        }
    }
}

/// Supply reconciliation; succeeds only if every invariant holds
pub async fn run_reconciliation(ctx: &OpsContext) -> JobReport {
    let correlation_id = new_correlation_id();
    let started = Instant::now();

    let engine = ReconciliationEngine::new(
        ctx.ledger(&correlation_id),
        ctx.registry(&correlation_id),
        ctx.store(),
        ctx.config().reconciliation.clone(),
    )
    .with_correlation_id(correlation_id.clone());

    let outcome = match engine.run().await {
        Ok(report) => to_output(&report).and_then(|output| {
            if report.is_success() {
                Ok(output)
            } else {
                Err(output)
            }
        }),
        Err(e) => Err(json!({ "error": e.to_string() })),
    };
    finish_value(ctx, Job::Reconciliation, correlation_id, started, outcome)
}

/// Build the snapshot as of `as_of`, publish it and anchor it
pub async fn run_por_snapshot(ctx: &OpsContext, as_of: DateTime<Utc>) -> JobReport {
    let correlation_id = new_correlation_id();
    let started = Instant::now();
    let ledger = ctx.ledger(&correlation_id);
    let treasury = &ctx.config().treasury;

    let figures = Arc::new(treasury.reserves.clone());
    let liabilities: Arc<dyn LiabilitySource> = if treasury.liabilities_from_ledger {
        Arc::new(XrplLiabilitySource::new(ledger.clone()))
    } else {
        figures.clone()
    };
    let builder = SnapshotBuilder::new(figures, liabilities, treasury.report_base_uri.clone());
    let composer = PoRComposer::new(ctx.registry(&correlation_id), ledger);

    let input = match builder.build(as_of).await {
        Ok(input) => input,
        Err(e) => {
            let outcome = Err(json!({ "error": e.to_string() }));
            return finish_value(ctx, Job::PorSnapshot, correlation_id, started, outcome);
        }
    };

    let outcome = match composer.publish(&input).await {
        Ok(result) => {
            ctx.metrics()
                .por_coverage_ratio_bps
                .set(i64::try_from(result.coverage_ratio_bps).unwrap_or(i64::MAX));
            info!(
                coverage = %PoRComposer::coverage_percent(result.coverage_ratio_bps),
                hash = %result.canonical_hash,
                "PoR coverage"
            );
            to_output(&result)
        }
        Err(reserves::Error::Anchor { evm_tx_hash, source }) => {
            let hash = canonical_hash(&input).unwrap_or_default();
            warn!(
                evm_tx_hash = %evm_tx_hash,
                hash = %hash,
                "Snapshot registered but not anchored; run anchor-retry with its hash"
            );
            Err(json!({
                "error": source.to_string(),
                "canonicalHash": hash,
                "asOf": input.as_of,
                "evmTxHash": evm_tx_hash,
            }))
        }
        Err(e) => Err(json!({ "error": e.to_string() })),
    };
    finish_value(ctx, Job::PorSnapshot, correlation_id, started, outcome)
}

/// Anchor an already registered snapshot hash
pub async fn run_anchor_retry(ctx: &OpsContext, hash: &str, as_of: DateTime<Utc>) -> JobReport {
    let correlation_id = new_correlation_id();
    let started = Instant::now();
    let composer = PoRComposer::new(ctx.registry(&correlation_id), ctx.ledger(&correlation_id));

    let outcome = match composer.retry_anchor(hash, as_of).await {
        Ok(xrpl_tx_hash) => Ok(json!({ "canonicalHash": hash, "xrplTxHash": xrpl_tx_hash })),
        Err(e) => Err(json!({ "canonicalHash": hash, "error": e.to_string() })),
    };
    finish_value(ctx, Job::AnchorRetry, correlation_id, started, outcome)
}

/// Order-book scan; succeeds only if no offer was found
pub async fn run_dex_scan(ctx: &OpsContext) -> JobReport {
    let correlation_id = new_correlation_id();
    let started = Instant::now();
    let monitor = DexMonitor::new(ctx.ledger(&correlation_id), ctx.store())
        .with_correlation_id(correlation_id.clone());

    let outcome = match monitor.scan().await {
        Ok(report) => {
            ctx.metrics().dex_alerts.set(report.alerts.len() as i64);
            let output = json!({
                "offersScanned": report.offers_scanned,
                "alerts": report.alerts,
            });
            if report.is_clean() {
                Ok(output)
            } else {
                Err(output)
            }
        }
        Err(e) => Err(json!({ "error": e.to_string() })),
    };
    finish_value(ctx, Job::DexScan, correlation_id, started, outcome)
}

/// Records matching `filter`, oldest first
pub async fn list_transactions(
    ctx: &OpsContext,
    filter: &RecordFilter,
) -> crate::Result<Vec<LedgerTransactionRecord>> {
    Ok(ctx.store().list(filter).await?)
}

/// Integers wider than `u64` come back as floats instead of failing
fn to_output<T: Serialize>(value: &T) -> Result<Value, Value> {
    serde_json::to_string(value)
        .and_then(|text| serde_json::from_str(&text))
        .map_err(|e| json!({ "error": e.to_string() }))
}

fn finish(
    ctx: &OpsContext,
    job: Job,
    correlation_id: String,
    started: Instant,
    outcome: Result<Value, String>,
) -> JobReport {
    finish_value(
        ctx,
        job,
        correlation_id,
        started,
        outcome.map_err(|e| json!({ "error": e })),
    )
}

fn finish_value(
    ctx: &OpsContext,
    job: Job,
    correlation_id: String,
    started: Instant,
    outcome: Result<Value, Value>,
) -> JobReport {
    let elapsed = started.elapsed();
    let success = outcome.is_ok();
    let output = match outcome {
        Ok(output) | Err(output) => output,
    };

    let flow = job.flow();
    let duration_ms = elapsed.as_millis() as u64;
    if success {
        info!(
            target: OPS_RUN_TARGET,
            job = %job,
            flow = %flow,
            status = "success",
            correlation_id = %correlation_id,
            duration_ms,
            "Job completed"
        );
    } else {
        error!(
            target: OPS_RUN_TARGET,
            job = %job,
            flow = %flow,
            status = "failure",
            correlation_id = %correlation_id,
            duration_ms,
            details = %output,
            "Job failed"
        );
    }

    ctx.metrics().record_run(job.name(), success, elapsed);
    if let Some(path) = &ctx.config().metrics.textfile_path {
        if let Err(e) = ctx.metrics().write_textfile(path) {
            warn!(path = %path.display(), error = %e, "Failed to write metrics textfile");
        }
    }

    JobReport {
        job,
        correlation_id,
        success,
        output,
    }
}

//! Prometheus metrics for operations jobs
//!
//! - `fth_ops_job_runs_total{job,outcome}`: runs by outcome (`success`, `failure`, `skipped`)
//! - `fth_ops_job_duration_seconds{job}`: run latency
//! - `fth_ops_job_last_run_timestamp_seconds{job}`: completion time of the last run
//! - `fth_ops_por_coverage_ratio_bps`: coverage of the last published snapshot
//! - `fth_ops_dex_alerts`: offending offers found by the last DEX scan
//!
//! The scheduler has no HTTP surface; metrics reach Prometheus through the
//! node-exporter textfile collector.

use crate::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Metrics collector
#[derive(Clone)]
pub struct OpsMetrics {
    registry: Registry,

    /// Runs by job and outcome
    pub job_runs_total: IntCounterVec,

    /// Run latency
    pub job_duration_seconds: HistogramVec,

    /// Last completion (unix seconds)
    pub job_last_run_timestamp: IntGaugeVec,

    /// Coverage of the last published snapshot
    pub por_coverage_ratio_bps: IntGauge,

    /// Alerts found by the last DEX scan
    pub dex_alerts: IntGauge,
}

impl fmt::Debug for OpsMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpsMetrics")
            .field("por_coverage_ratio_bps", &self.por_coverage_ratio_bps.get())
            .field("dex_alerts", &self.dex_alerts.get())
            .finish()
    }
}

impl OpsMetrics {
    /// Create and register every metric in a dedicated registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("fth_ops".to_string()), None)?;

        let job_runs_total = IntCounterVec::new(
            Opts::new("job_runs_total", "Operations job runs by outcome"),
            &["job", "outcome"],
        )?;
        registry.register(Box::new(job_runs_total.clone()))?;

        let job_duration_seconds = HistogramVec::new(
            HistogramOpts::new("job_duration_seconds", "Operations job latency")
                .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0]),
            &["job"],
        )?;
        registry.register(Box::new(job_duration_seconds.clone()))?;

        let job_last_run_timestamp = IntGaugeVec::new(
            Opts::new(
                "job_last_run_timestamp_seconds",
                "Completion time of the last run",
            ),
            &["job"],
        )?;
        registry.register(Box::new(job_last_run_timestamp.clone()))?;

        let por_coverage_ratio_bps = IntGauge::new(
            "por_coverage_ratio_bps",
            "Coverage ratio of the last published PoR snapshot",
        )?;
        registry.register(Box::new(por_coverage_ratio_bps.clone()))?;

        let dex_alerts = IntGauge::new("dex_alerts", "Offending offers found by the last DEX scan")?;
        registry.register(Box::new(dex_alerts.clone()))?;

        Ok(Self {
            registry,
            job_runs_total,
            job_duration_seconds,
            job_last_run_timestamp,
            por_coverage_ratio_bps,
            dex_alerts,
        })
    }

    /// Count a completed run
    pub fn record_run(&self, job: &str, success: bool, elapsed: Duration) {
        let outcome = if success { "success" } else { "failure" };
        self.job_runs_total.with_label_values(&[job, outcome]).inc();
        self.job_duration_seconds
            .with_label_values(&[job])
            .observe(elapsed.as_secs_f64());
        self.job_last_run_timestamp
            .with_label_values(&[job])
            .set(chrono::Utc::now().timestamp());
    }

    /// Count a run skipped because another instance held the lease
    pub fn record_skip(&self, job: &str) {
        self.job_runs_total.with_label_values(&[job, "skipped"]).inc();
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| crate::Error::Config(format!("Metrics are not UTF-8: {}", e)))
    }

    /// Write the exposition to `path` for the textfile collector
    ///
    /// Written to a sibling temp file and renamed, so the collector never
    /// reads a partial file.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, rendered)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_job_outcomes() {
        let metrics = OpsMetrics::new().unwrap();
        metrics.record_run("reconciliation", true, Duration::from_millis(250));
        metrics.record_run("reconciliation", false, Duration::from_secs(2));
        metrics.record_skip("por-snapshot");
        metrics.por_coverage_ratio_bps.set(16_400);

        let text = metrics.render().unwrap();
        assert!(text.contains(
            "fth_ops_job_runs_total{job=\"reconciliation\",outcome=\"success\"} 1"
        ));
        assert!(text.contains(
            "fth_ops_job_runs_total{job=\"reconciliation\",outcome=\"failure\"} 1"
        ));
        assert!(text.contains(
            "fth_ops_job_runs_total{job=\"por-snapshot\",outcome=\"skipped\"} 1"
        ));
        assert!(text.contains("fth_ops_por_coverage_ratio_bps 16400"));
    }

    #[test]
    fn test_write_textfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fth_ops.prom");
        let metrics = OpsMetrics::new().unwrap();
        metrics.dex_alerts.set(2);

        metrics.write_textfile(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("fth_ops_dex_alerts 2"));
        assert!(!path.with_extension("prom.tmp").exists());
    }
}

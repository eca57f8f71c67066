//! Job scheduler
//!
//! Daily PoR publish, daily reconciliation and an hourly DEX scan. Before
//! running, the scheduler takes the job's lease in the audit store; if another
//! instance holds it the run is skipped with a warning, so two schedulers
//! sharing a store never interleave writes for the same job.

use crate::{
    context::OpsContext,
    jobs::{self, Job, JobReport},
    Error, Result,
};
use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Schedule configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Daily PoR publish time (UTC, `HH:MM`)
    pub por_time: String,

    /// Daily reconciliation time (UTC, `HH:MM`)
    pub reconciliation_time: String,

    /// Minute past each hour of the DEX scan
    pub dex_scan_minute: u32,

    /// Job lease TTL (seconds); bounds how long a crashed holder blocks a job
    pub lease_ttl_secs: u64,

    /// Schedule check interval (seconds)
    pub tick_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            por_time: "00:00".to_string(),
            reconciliation_time: "00:30".to_string(),
            dex_scan_minute: 0,
            lease_ttl_secs: 3600,
            tick_secs: 30,
        }
    }
}

impl ScheduleConfig {
    /// Apply `FTH_SCHEDULE_*` environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("FTH_SCHEDULE_POR_TIME") {
            self.por_time = v.trim().to_string();
        }
        if let Ok(v) = std::env::var("FTH_SCHEDULE_RECONCILIATION_TIME") {
            self.reconciliation_time = v.trim().to_string();
        }
        if let Ok(v) = std::env::var("FTH_SCHEDULE_DEX_SCAN_MINUTE") {
            self.dex_scan_minute = v.trim().parse().map_err(|_| {
                Error::Config(format!("Invalid FTH_SCHEDULE_DEX_SCAN_MINUTE: {}", v))
            })?;
        }
        if let Ok(v) = std::env::var("FTH_SCHEDULE_LEASE_TTL_SECS") {
            self.lease_ttl_secs = v.trim().parse().map_err(|_| {
                Error::Config(format!("Invalid FTH_SCHEDULE_LEASE_TTL_SECS: {}", v))
            })?;
        }
        Ok(())
    }

    /// Times parse, minute is in range, intervals are positive
    pub fn validate(&self) -> Result<()> {
        parse_time(&self.por_time)?;
        parse_time(&self.reconciliation_time)?;
        if self.dex_scan_minute > 59 {
            return Err(Error::Config(format!(
                "dex_scan_minute out of range: {}",
                self.dex_scan_minute
            )));
        }
        if self.lease_ttl_secs == 0 || self.tick_secs == 0 {
            return Err(Error::Config(
                "lease_ttl_secs and tick_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// First run of `job` strictly after `now`
    pub fn next_run(&self, job: Job, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match job {
            Job::PorSnapshot => next_daily(parse_time(&self.por_time)?, now),
            Job::Reconciliation => next_daily(parse_time(&self.reconciliation_time)?, now),
            Job::DexScan => next_hourly(self.dex_scan_minute, now),
            Job::AnchorRetry => Err(Error::Config(format!("{} is not scheduled", job))),
        }
    }

    /// Lease TTL
    pub fn lease_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.lease_ttl_secs)
    }
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| Error::Config(format!("Invalid time format '{}': {}", value, e)))
}

fn at_utc(date: chrono::NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>> {
    date.and_time(time)
        .and_local_timezone(Utc)
        .single()
        .ok_or_else(|| Error::Config("Invalid timezone conversion".to_string()))
}

fn next_daily(time: NaiveTime, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let today = at_utc(now.date_naive(), time)?;
    if today > now {
        Ok(today)
    } else {
        Ok(today + Duration::days(1))
    }
}

fn next_hourly(minute: u32, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(now.hour(), minute, 0)
        .ok_or_else(|| Error::Config(format!("Invalid minute: {}", minute)))?;
    let this_hour = at_utc(now.date_naive(), time)?;
    if this_hour > now {
        Ok(this_hour)
    } else {
        Ok(this_hour + Duration::hours(1))
    }
}

/// Lease-guarded job scheduler
pub struct JobScheduler {
    ctx: Arc<OpsContext>,
    config: ScheduleConfig,
    holder: String,
    next_due: Mutex<HashMap<Job, DateTime<Utc>>>,
}

impl fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobScheduler")
            .field("config", &self.config)
            .field("holder", &self.holder)
            .finish()
    }
}

impl JobScheduler {
    /// Scheduler whose first runs are the next occurrences after `now`
    pub fn new(ctx: Arc<OpsContext>, holder: impl Into<String>, now: DateTime<Utc>) -> Result<Self> {
        let config = ctx.config().schedule.clone();
        config.validate()?;

        let mut next_due = HashMap::new();
        for job in Job::SCHEDULED {
            next_due.insert(job, config.next_run(job, now)?);
        }
        Ok(Self {
            ctx,
            config,
            holder: holder.into(),
            next_due: Mutex::new(next_due),
        })
    }

    /// Lease holder identity
    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Next due time of `job`
    pub async fn next_due(&self, job: Job) -> Option<DateTime<Utc>> {
        self.next_due.lock().await.get(&job).copied()
    }

    /// Run `job` under its lease; `None` if another holder owns the lease
    pub async fn run_once(&self, job: Job) -> Result<Option<JobReport>> {
        let store = self.ctx.store();
        if !store
            .try_acquire_lease(job.name(), &self.holder, self.config.lease_ttl())
            .await?
        {
            warn!(job = %job, holder = %self.holder, "Job lease held by another instance; skipping run");
            self.ctx.metrics().record_skip(job.name());
            return Ok(None);
        }

        let report = jobs::run(&self.ctx, job).await;

        if let Err(e) = store.release_lease(job.name(), &self.holder).await {
            warn!(job = %job, error = %e, "Failed to release job lease; it will expire");
        }
        Ok(Some(report))
    }

    /// Run every job due at `now` and reschedule it
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Vec<JobReport>> {
        let mut next_due = self.next_due.lock().await;
        let mut reports = Vec::new();

        for job in Job::SCHEDULED {
            let due = match next_due.get(&job) {
                Some(due) => *due,
                None => continue,
            };
            if now < due {
                continue;
            }

            debug!(job = %job, due = %due, "Job due");
            if let Some(report) = self.run_once(job).await? {
                reports.push(report);
            }
            next_due.insert(job, self.config.next_run(job, now)?);
        }
        Ok(reports)
    }

    /// Check the schedule every `tick_secs` until `shutdown` resolves
    pub async fn start(self: Arc<Self>, shutdown: impl Future<Output = ()>) {
        info!(
            holder = %self.holder,
            por_time = %self.config.por_time,
            reconciliation_time = %self.config.reconciliation_time,
            dex_scan_minute = self.config.dex_scan_minute,
            "Starting job scheduler"
        );

        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.config.tick_secs));
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping job scheduler");
                    return;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick(Utc::now()).await {
                        warn!(error = %e, "Scheduler check failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::OpsConfig, context::OpsContext};
    use audit_ledger::{AuditStore, Flow, MemoryAuditStore, RecordFilter};
    use chrono::TimeZone;
    use evm_registry::SimulatedRegistry;
    use xrpl_client::{OpsSigners, SimulatedLedger, XrplConfig};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_next_daily_run() {
        let config = ScheduleConfig::default();
        assert_eq!(
            config.next_run(Job::Reconciliation, at(0, 10, 0)).unwrap(),
            at(0, 30, 0)
        );
        // Exactly on time: next occurrence is tomorrow
        assert_eq!(
            config.next_run(Job::PorSnapshot, at(0, 0, 0)).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_hourly_run() {
        let config = ScheduleConfig {
            dex_scan_minute: 15,
            ..Default::default()
        };
        assert_eq!(config.next_run(Job::DexScan, at(9, 10, 0)).unwrap(), at(9, 15, 0));
        assert_eq!(config.next_run(Job::DexScan, at(9, 15, 0)).unwrap(), at(10, 15, 0));
        assert_eq!(
            config.next_run(Job::DexScan, at(23, 59, 0)).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 15, 0, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_validate() {
        assert!(ScheduleConfig::default().validate().is_ok());
        let bad_time = ScheduleConfig {
            por_time: "25:00".into(),
            ..Default::default()
        };
        assert!(bad_time.validate().is_err());
        let bad_minute = ScheduleConfig {
            dex_scan_minute: 60,
            ..Default::default()
        };
        assert!(bad_minute.validate().is_err());
    }

    fn context(store: Arc<MemoryAuditStore>) -> Arc<OpsContext> {
        let config = OpsConfig {
            xrpl: XrplConfig {
                fthusd_issuer: "r3sNTMefq5gsRumMYsNznnX6yzzxVH6dTC".into(),
                usdf_issuer: "rpjfAeE3DeeHPFnN2PgGFW5YxnZFAjrEyN".into(),
                gold_vault: "rPPdduC9MRTrXZP1J7MQyEKKEYiFigWZ6Q".into(),
                oracle_account: "rH9ESAdrFfDAZtCZGa7JiwNJfKnC6CmGFQ".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        Arc::new(
            OpsContext::new(
                config,
                store,
                Arc::new(SimulatedLedger::new()),
                OpsSigners::default(),
                Arc::new(SimulatedRegistry::new()),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_run_skipped_when_lease_held() {
        let store = Arc::new(MemoryAuditStore::new());
        let scheduler = JobScheduler::new(context(store.clone()), "instance-a", at(0, 0, 0)).unwrap();

        assert!(store
            .try_acquire_lease(Job::DexScan.name(), "instance-b", std::time::Duration::from_secs(60))
            .await
            .unwrap());
        assert!(scheduler.run_once(Job::DexScan).await.unwrap().is_none());

        store.release_lease(Job::DexScan.name(), "instance-b").await.unwrap();
        let report = scheduler.run_once(Job::DexScan).await.unwrap().unwrap();
        assert!(report.success);

        // Released after the run
        assert!(store
            .try_acquire_lease(Job::DexScan.name(), "instance-b", std::time::Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_tick_runs_due_jobs_once() {
        let store = Arc::new(MemoryAuditStore::new());
        let scheduler = JobScheduler::new(context(store.clone()), "instance-a", at(0, 20, 0)).unwrap();
        assert_eq!(scheduler.next_due(Job::Reconciliation).await, Some(at(0, 30, 0)));

        let reports = scheduler.tick(at(0, 30, 5)).await.unwrap();
        let jobs: Vec<Job> = reports.iter().map(|r| r.job).collect();
        assert_eq!(jobs, vec![Job::Reconciliation]);

        // No registry snapshot yet: the run fails but is recorded
        assert!(!reports[0].success);
        let records = store
            .list(&RecordFilter::all().flow(Flow::SupplyReconciliation))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].correlation_id.as_deref(),
            Some(reports[0].correlation_id.as_str())
        );

        assert!(scheduler.tick(at(0, 31, 0)).await.unwrap().is_empty());
        assert_eq!(
            scheduler.next_due(Job::Reconciliation).await,
            Some(Utc.with_ymd_and_hms(2026, 3, 15, 0, 30, 0).unwrap())
        );
    }
}

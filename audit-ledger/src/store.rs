//! Audit store abstraction
//!
//! The store is the only shared mutable resource of the reserves core. Each
//! logical operation owns a unique record id, so callers never need to lock
//! around `create`/`update`; the store itself guarantees atomicity of the
//! update-by-id path and of lease acquisition.

use crate::{
    config::{StoreBackend, StoreConfig},
    types::{Flow, LedgerKind, LedgerTransactionRecord, TxStatus},
    MemoryAuditStore, Result, RocksAuditStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Filter for [`AuditStore::list`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Only records of this flow
    pub flow: Option<Flow>,
    /// Only records in this status
    pub status: Option<TxStatus>,
    /// Only records for this ledger
    pub ledger: Option<LedgerKind>,
}

impl RecordFilter {
    /// Match every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to one flow
    pub fn flow(mut self, flow: Flow) -> Self {
        self.flow = Some(flow);
        self
    }

    /// Restrict to one status
    pub fn status(mut self, status: TxStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to one ledger
    pub fn ledger(mut self, ledger: LedgerKind) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Check a record against the filter
    pub fn matches(&self, record: &LedgerTransactionRecord) -> bool {
        self.flow.map_or(true, |f| record.flow == f)
            && self.status.map_or(true, |s| record.status == s)
            && self.ledger.map_or(true, |l| record.ledger == l)
    }
}

/// Run-lock held by one scheduler instance for one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLease {
    /// Job name
    pub job: String,
    /// Holder identity (process / instance id)
    pub holder: String,
    /// Lease expiry
    pub expires_at: DateTime<Utc>,
}

impl JobLease {
    /// New lease expiring `ttl` from now
    pub fn new(job: &str, holder: &str, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(24));
        Self {
            job: job.to_string(),
            holder: holder.to_string(),
            expires_at: Utc::now() + ttl,
        }
    }

    /// Whether the lease may be taken by `holder` right now
    pub fn is_available_to(&self, holder: &str) -> bool {
        self.holder == holder || self.expires_at <= Utc::now()
    }
}

/// Persistence for [`LedgerTransactionRecord`]s and job leases
///
/// Implementations must give read-your-writes consistency: a record passed to
/// `create`/`update` is visible to the next `list` on the same store.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Insert a new record; fails if the id already exists
    async fn create(&self, record: &LedgerTransactionRecord) -> Result<()>;

    /// Replace a record by id; fails if it does not exist or is already terminal
    async fn update(&self, record: &LedgerTransactionRecord) -> Result<()>;

    /// Fetch a record by id
    async fn get(&self, id: Uuid) -> Result<LedgerTransactionRecord>;

    /// List records matching `filter`, oldest first
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<LedgerTransactionRecord>>;

    /// Acquire (or renew) the lease for `job`; `false` if another holder owns it
    async fn try_acquire_lease(&self, job: &str, holder: &str, ttl: Duration) -> Result<bool>;

    /// Release the lease for `job` if `holder` owns it
    async fn release_lease(&self, job: &str, holder: &str) -> Result<()>;
}

/// Open the store selected by configuration
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn AuditStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryAuditStore::new())),
        StoreBackend::Rocksdb => Ok(Arc::new(RocksAuditStore::open(config)?)),
    }
}

/// Shared update-by-id check: the stored copy must not be terminal
pub(crate) fn check_updatable(stored: &LedgerTransactionRecord, next: &LedgerTransactionRecord) -> Result<()> {
    if stored.status.is_terminal() {
        return Err(crate::Error::InvalidTransition {
            id: stored.id.to_string(),
            from: stored.status.to_string(),
            to: next.status.to_string(),
        });
    }
    Ok(())
}

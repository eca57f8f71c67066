//! In-memory audit store
//!
//! Used by tests, the `simulate-day` runner and single-shot CLI runs that do
//! not need durability.

use crate::{
    error::{Error, Result},
    store::{check_updatable, AuditStore, JobLease, RecordFilter},
    types::LedgerTransactionRecord,
};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use uuid::Uuid;

/// DashMap-backed store
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: DashMap<Uuid, LedgerTransactionRecord>,
    leases: DashMap<String, JobLease>,
}

impl MemoryAuditStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn create(&self, record: &LedgerTransactionRecord) -> Result<()> {
        match self.records.entry(record.id) {
            Entry::Occupied(_) => Err(Error::DuplicateRecord(record.id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, record: &LedgerTransactionRecord) -> Result<()> {
        let mut stored = self
            .records
            .get_mut(&record.id)
            .ok_or_else(|| Error::RecordNotFound(record.id.to_string()))?;
        check_updatable(&stored, record)?;
        *stored = record.clone();
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<LedgerTransactionRecord> {
        self.records
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<LedgerTransactionRecord>> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn try_acquire_lease(&self, job: &str, holder: &str, ttl: Duration) -> Result<bool> {
        match self.leases.entry(job.to_string()) {
            Entry::Occupied(mut current) => {
                if current.get().is_available_to(holder) {
                    current.insert(JobLease::new(job, holder, ttl));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(JobLease::new(job, holder, ttl));
                Ok(true)
            }
        }
    }

    async fn release_lease(&self, job: &str, holder: &str) -> Result<()> {
        self.leases.remove_if(job, |_, lease| lease.holder == holder);
        Ok(())
    }
}

//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `records` - Audit records (key: record id, UUIDv7 so keys sort by creation)
//! - `leases` - Job run-locks (key: job name)

use crate::{
    config::StoreConfig,
    error::{Error, Result},
    store::{check_updatable, AuditStore, JobLease, RecordFilter},
    types::LedgerTransactionRecord,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, DB};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Column family names
const CF_RECORDS: &str = "records";
const CF_LEASES: &str = "leases";

/// Durable audit store
pub struct RocksAuditStore {
    db: Arc<DB>,
    // Serializes read-check-write sequences (update, lease acquisition)
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for RocksAuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksAuditStore")
            .field("path", &self.db.path())
            .finish()
    }
}

impl RocksAuditStore {
    /// Open or create database
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = &config.data_dir;
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_RECORDS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_LEASES, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened audit store");

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    fn cf_options_records() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn read_record(&self, id: Uuid) -> Result<Option<LedgerTransactionRecord>> {
        let cf = self.cf_handle(CF_RECORDS)?;
        match self.db.get_cf(cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_record(&self, record: &LedgerTransactionRecord) -> Result<()> {
        let cf = self.cf_handle(CF_RECORDS)?;
        let value = bincode::serialize(record)?;
        self.db.put_cf(cf, record.id.as_bytes(), value)?;
        Ok(())
    }

    fn read_lease(&self, job: &str) -> Result<Option<JobLease>> {
        let cf = self.cf_handle(CF_LEASES)?;
        match self.db.get_cf(cf, job.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AuditStore for RocksAuditStore {
    async fn create(&self, record: &LedgerTransactionRecord) -> Result<()> {
        let _guard = self.write_lock.lock();
        if self.read_record(record.id)?.is_some() {
            return Err(Error::DuplicateRecord(record.id.to_string()));
        }
        self.write_record(record)?;

        tracing::debug!(
            record_id = %record.id,
            flow = %record.flow,
            status = %record.status,
            "Audit record created"
        );
        Ok(())
    }

    async fn update(&self, record: &LedgerTransactionRecord) -> Result<()> {
        let _guard = self.write_lock.lock();
        let stored = self
            .read_record(record.id)?
            .ok_or_else(|| Error::RecordNotFound(record.id.to_string()))?;
        check_updatable(&stored, record)?;
        self.write_record(record)?;

        tracing::debug!(
            record_id = %record.id,
            status = %record.status,
            "Audit record updated"
        );
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<LedgerTransactionRecord> {
        self.read_record(id)?
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<LedgerTransactionRecord>> {
        let cf = self.cf_handle(CF_RECORDS)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let record: LedgerTransactionRecord = bincode::deserialize(&value)?;
            if filter.matches(&record) {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn try_acquire_lease(&self, job: &str, holder: &str, ttl: Duration) -> Result<bool> {
        let _guard = self.write_lock.lock();
        if let Some(current) = self.read_lease(job)? {
            if !current.is_available_to(holder) {
                return Ok(false);
            }
        }
        let cf = self.cf_handle(CF_LEASES)?;
        let lease = JobLease::new(job, holder, ttl);
        self.db.put_cf(cf, job.as_bytes(), bincode::serialize(&lease)?)?;
        Ok(true)
    }

    async fn release_lease(&self, job: &str, holder: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        if let Some(current) = self.read_lease(job)? {
            if current.holder == holder {
                let cf = self.cf_handle(CF_LEASES)?;
                self.db.delete_cf(cf, job.as_bytes())?;
            }
        }
        Ok(())
    }
}

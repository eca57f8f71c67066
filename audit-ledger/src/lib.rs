//! FTH Audit Ledger
//!
//! Append/update-by-id audit trail of every interaction the program has with an
//! external ledger (XRPL, the EVM registry) or with itself (reconciliation runs,
//! monitoring alerts).
//!
//! # Invariants
//!
//! - A record is created `pending` before the outcome of the attempt is known
//! - A record reaches `confirmed`, `failed` or `detected` at most once and
//!   never leaves that state
//! - Failed records keep their error code and message

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod event;
pub mod memory;
pub mod secret;
pub mod storage;
pub mod store;
pub mod types;

// Re-exports
pub use config::{StoreBackend, StoreConfig};
pub use error::{Error, Result};
pub use event::{log_ledger_event, LedgerEvent};
pub use memory::MemoryAuditStore;
pub use secret::SecretString;
pub use storage::RocksAuditStore;
pub use store::{open_store, AuditStore, JobLease, RecordFilter};
pub use types::{Direction, Flow, LedgerKind, LedgerTransactionRecord, TxStatus};

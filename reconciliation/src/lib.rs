//! FTH Supply Reconciliation
//!
//! Compares three independently derived views of token supply and backing:
//!
//! - On-chain: the issuers' trustline balances on XRPL
//! - Off-chain: the confirmed flows in the audit ledger
//! - Attested: the latest PoR snapshot in the EVM registry
//!
//! Every run leaves a `SUPPLY_RECONCILIATION` record, whatever its outcome.
//! The DEX monitor flags order-book offers in program currencies.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod dex;
pub mod engine;
pub mod error;
pub mod history;
pub mod report;

// Re-exports
pub use config::ReconciliationConfig;
pub use dex::{DexAlert, DexMonitor, DexScanReport};
pub use engine::{ReconciliationEngine, RECONCILIATION_FAILED_CODE};
pub use error::{Error, Result};
pub use history::{derive_supply, OffChainSupply};
pub use report::{within_tolerance, Invariants, ReconciliationReport, ReportStatus};

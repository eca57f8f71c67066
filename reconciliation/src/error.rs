//! Error types for reconciliation

use thiserror::Error;

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciliation errors
///
/// A failed invariant is not an error: it is reported through
/// [`crate::ReconciliationReport::status`].
#[derive(Error, Debug)]
pub enum Error {
    /// XRPL query failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] xrpl_client::Error),

    /// Registry query failed
    #[error("Registry error: {0}")]
    Registry(#[from] evm_registry::Error),

    /// Audit store error
    #[error("Audit store error: {0}")]
    Audit(#[from] audit_ledger::Error),

    /// Malformed figure in a payload summary
    #[error("Invalid amount in record {record}: {value}")]
    InvalidAmount {
        /// Record id
        record: String,
        /// Offending value
        value: String,
    },

    /// Arithmetic overflow
    #[error("Overflow computing {0}")]
    Overflow(&'static str),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

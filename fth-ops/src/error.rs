//! Error types for the operations layer

use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, Error>;

/// Operations errors
#[derive(Error, Debug)]
pub enum Error {
    /// Audit store error
    #[error("Audit store error: {0}")]
    Audit(#[from] audit_ledger::Error),

    /// XRPL error
    #[error("XRPL error: {0}")]
    Ledger(#[from] xrpl_client::Error),

    /// Registry error
    #[error("Registry error: {0}")]
    Registry(#[from] evm_registry::Error),

    /// PoR error
    #[error("PoR error: {0}")]
    Reserves(#[from] reserves::Error),

    /// Reconciliation error
    #[error("Reconciliation error: {0}")]
    Reconciliation(#[from] reconciliation::Error),

    /// Compliance error
    #[error("Compliance error: {0}")]
    Compliance(#[from] compliance_service::Error),

    /// Metrics error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

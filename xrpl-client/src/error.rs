//! Error types for the XRPL client

use thiserror::Error;

/// Result type for XRPL operations
pub type Result<T> = std::result::Result<T, Error>;

/// XRPL client errors
#[derive(Error, Debug)]
pub enum Error {
    /// Could not reach the ledger (connect, autofill, queries); nothing was recorded
    #[error("XRPL connection error: {0}")]
    Connection(String),

    /// Transaction rejected or failed on-ledger; the audit record is already `failed`
    #[error("XRPL transaction failed: {code} - {message} (tx {tx_hash})")]
    Transaction {
        /// Engine result code (e.g. `tecPATH_DRY`)
        code: String,
        /// Engine result message
        message: String,
        /// Hash of the signed transaction
        tx_hash: String,
    },

    /// Transaction shape violates a safety rule; raised before any network I/O
    #[error("Invalid transaction: {0}")]
    Validation(String),

    /// No validation result within the submission timeout; the record stays `pending`
    #[error("Timed out waiting for validation of {tx_hash}")]
    Timeout {
        /// Hash of the signed transaction
        tx_hash: String,
    },

    /// The transport failed after the signed blob was handed over: the
    /// transaction may still validate, so the record stays `pending` and the
    /// operation must not be resubmitted blindly
    #[error("Outcome of {tx_hash} unknown: {reason}")]
    OutcomeUnknown {
        /// Hash of the signed transaction
        tx_hash: String,
        /// Transport failure
        reason: String,
    },

    /// Signing failed (bad seed, signer unavailable)
    #[error("Signing error: {0}")]
    Signing(String),

    /// Audit store error
    #[error("Audit store error: {0}")]
    Audit(#[from] audit_ledger::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether retrying the whole operation with a fresh transaction is safe
    ///
    /// Never true once a blob may have reached the ledger without a final result.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Transaction { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Connection(err.to_string())
    }
}
